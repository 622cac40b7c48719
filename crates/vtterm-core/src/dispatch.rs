//! Subscriber registries for resize/key/mouse fan-out (spec.md §4.7
//! "Subscriber registry").
//!
//! `register` idempotently appends a subscriber's channel, then spawns
//! a task that removes the entry once the subscriber's own death
//! channel closes — the core's contract for never leaking a dropped
//! client's subscription (spec.md §7 "Subscriber death": non-error,
//! triggers deregistration).

use std::sync::Mutex;

use tokio::sync::{mpsc, oneshot};
use tracing::trace;

struct Subscriber<T> {
    id: u64,
    sender: mpsc::Sender<T>,
}

/// A broadcast-to-all registry for one event type. Dispatch blocks on
/// a slow subscriber's channel (spec.md §5 "intentional backpressure");
/// subscribers are expected to drain promptly.
pub struct Dispatcher<T> {
    subscribers: Mutex<Vec<Subscriber<T>>>,
    next_id: Mutex<u64>,
}

impl<T: Clone + Send + 'static> Default for Dispatcher<T> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
        }
    }
}

impl<T: Clone + Send + 'static> Dispatcher<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sender` as a subscriber. `died` is the subscriber's
    /// own death channel: once it resolves (closes or fires), this
    /// dispatcher removes the subscription. Registering the exact same
    /// `sender` twice is treated as idempotent (spec.md §9 open
    /// question, resolved in `DESIGN.md`): the second registration is
    /// a no-op rather than a duplicate entry.
    #[tracing::instrument(skip_all)]
    pub fn register(self: &std::sync::Arc<Self>, sender: mpsc::Sender<T>, died: oneshot::Receiver<()>)
    where
        T: 'static,
    {
        let id = {
            let mut next_id = self.next_id.lock().unwrap();
            let id = *next_id;
            *next_id += 1;
            id
        };

        {
            let mut subs = self.subscribers.lock().unwrap();
            if subs.iter().any(|s| s.sender.same_channel(&sender)) {
                trace!("duplicate subscriber registration ignored");
                return;
            }
            subs.push(Subscriber { id, sender });
        }

        let this = std::sync::Arc::clone(self);
        tokio::spawn(async move {
            let _ = died.await;
            this.remove(id);
        });
    }

    fn remove(&self, id: u64) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|s| s.id != id);
    }

    /// Broadcast `event` to every live subscriber, in registration
    /// order. No cross-subscriber ordering guarantee is implied by
    /// this loop (spec.md §5): a slow subscriber only delays its own
    /// delivery relative to the others serially, not their relative
    /// order with respect to each other's channels.
    #[tracing::instrument(skip_all)]
    pub async fn dispatch(&self, event: T) {
        let senders: Vec<mpsc::Sender<T>> =
            self.subscribers.lock().unwrap().iter().map(|s| s.sender.clone()).collect();
        for sender in senders {
            let _ = sender.send(event.clone()).await;
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}
