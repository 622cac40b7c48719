//! The addressable character cell (spec.md §3 "Pixel").
//!
//! Each [`Pixel`] is a cheaply-cloned handle over shared state. Every
//! setter that changes observable state emits exactly one change
//! notification; setting a field to its current value emits none
//! (change-suppression, spec.md §3, tested in §8 property 7).
//!
//! The naive design spawns one listener task and one kill-switch task
//! per active pixel (spec.md §9 "Per-pixel task explosion"). For a
//! 200x50 grid that is 20,000 mostly-idle tasks; this crate instead
//! has a pixel's change notification carry its own identity (a cloned
//! `Pixel` handle) onto a single shared channel that one drain task
//! services. See `DESIGN.md`.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use vtterm_info::{Position, Style};

#[derive(Debug, Clone)]
struct PixelState {
    position: Position,
    style: Style,
    rune: char,
    extension: Vec<char>,
    width: u8,
}

/// One addressable screen cell: position, style, primary rune, any
/// combining/extension runes, and a display width in columns.
#[derive(Clone)]
pub struct Pixel {
    state: Arc<Mutex<PixelState>>,
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<Pixel>>>>,
}

impl Pixel {
    #[must_use]
    pub fn new(position: Position, style: Style, rune: char) -> Self {
        Self {
            state: Arc::new(Mutex::new(PixelState {
                position,
                style,
                rune,
                extension: Vec::new(),
                width: 1,
            })),
            sender: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.state.lock().unwrap().position
    }

    #[must_use]
    pub fn style(&self) -> Style {
        self.state.lock().unwrap().style
    }

    #[must_use]
    pub fn rune(&self) -> char {
        self.state.lock().unwrap().rune
    }

    #[must_use]
    pub fn extension(&self) -> Vec<char> {
        self.state.lock().unwrap().extension.clone()
    }

    #[must_use]
    pub fn width(&self) -> u8 {
        self.state.lock().unwrap().width
    }

    pub fn set_position(&self, position: Position) {
        let changed = {
            let mut s = self.state.lock().unwrap();
            if s.position == position {
                false
            } else {
                s.position = position;
                true
            }
        };
        if changed {
            self.notify();
        }
    }

    pub fn set_style(&self, style: Style) {
        let changed = {
            let mut s = self.state.lock().unwrap();
            if s.style == style {
                false
            } else {
                s.style = style;
                true
            }
        };
        if changed {
            self.notify();
        }
    }

    pub fn set_rune(&self, rune: char) {
        let changed = {
            let mut s = self.state.lock().unwrap();
            if s.rune == rune {
                false
            } else {
                s.rune = rune;
                true
            }
        };
        if changed {
            self.notify();
        }
    }

    pub fn set_extension(&self, extension: Vec<char>) {
        let changed = {
            let mut s = self.state.lock().unwrap();
            if s.extension == extension {
                false
            } else {
                s.extension = extension;
                true
            }
        };
        if changed {
            self.notify();
        }
    }

    pub fn set_width(&self, width: u8) {
        let changed = {
            let mut s = self.state.lock().unwrap();
            if s.width == width {
                false
            } else {
                s.width = width;
                true
            }
        };
        if changed {
            self.notify();
        }
    }

    /// Installed by `Engine::activate` so each pixel knows which
    /// activation's drain channel to notify. A pixel not currently
    /// active (no sender installed) silently drops its notifications.
    pub(crate) fn install_sender(&self, sender: mpsc::UnboundedSender<Pixel>) {
        *self.sender.lock().unwrap() = Some(sender);
    }

    pub(crate) fn clear_sender(&self) {
        *self.sender.lock().unwrap() = None;
    }

    fn notify(&self) {
        let sender = self.sender.lock().unwrap().clone();
        if let Some(sender) = sender {
            let _ = sender.send(self.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtterm_info::{AttributeMask, Color};

    #[test]
    fn setting_identical_value_emits_no_notification() {
        let pixel = Pixel::new(Position::new(0, 0), Style::default(), 'a');
        let (tx, mut rx) = mpsc::unbounded_channel();
        pixel.install_sender(tx);
        pixel.set_rune('a');
        drop(pixel.clone());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn setting_a_new_value_emits_exactly_one_notification() {
        let pixel = Pixel::new(Position::new(0, 0), Style::default(), 'a');
        let (tx, mut rx) = mpsc::unbounded_channel();
        pixel.install_sender(tx);
        pixel.set_rune('b');
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn style_change_suppression() {
        let style = Style::new(Color::palette(1), Color::palette(2), AttributeMask::BOLD);
        let pixel = Pixel::new(Position::new(0, 0), style, ' ');
        let (tx, mut rx) = mpsc::unbounded_channel();
        pixel.install_sender(tx);
        pixel.set_style(style);
        assert!(rx.try_recv().is_err());
        pixel.set_style(Style::default());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn clearing_sender_drops_future_notifications() {
        let pixel = Pixel::new(Position::new(0, 0), Style::default(), 'a');
        let (tx, mut rx) = mpsc::unbounded_channel();
        pixel.install_sender(tx);
        pixel.clear_sender();
        pixel.set_rune('z');
        assert!(rx.try_recv().is_err());
    }
}
