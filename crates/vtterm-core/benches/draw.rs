use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use tokio::sync::{mpsc, oneshot};
use vtterm_core::{Dispatcher, Pixel};
use vtterm_info::{Position, Style};

fn pixel_mutation_with_change_suppression(c: &mut Criterion) {
    let pixel = Pixel::new(Position::new(0, 0), Style::default(), 'x');

    c.bench_function("pixel set_rune same value (suppressed)", |b| {
        b.iter(|| pixel.set_rune('x'));
    });

    c.bench_function("pixel set_rune alternating (notifies)", |b| {
        let mut next = 'a';
        b.iter(|| {
            pixel.set_rune(next);
            next = if next == 'z' { 'a' } else { (next as u8 + 1) as char };
        });
    });
}

fn dispatch_to_subscribers(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dispatcher = Arc::new(Dispatcher::<u32>::new());
    let mut receivers = Vec::new();
    for _ in 0..8 {
        let (tx, rx) = mpsc::channel(64);
        let (_death, died) = oneshot::channel();
        dispatcher.register(tx, died);
        receivers.push(rx);
    }

    c.bench_function("dispatch to 8 subscribers", |b| {
        b.iter(|| rt.block_on(dispatcher.dispatch(1)));
    });

    rt.block_on(async {
        for rx in &mut receivers {
            while rx.try_recv().is_ok() {}
        }
    });
}

criterion_group!(benches, pixel_mutation_with_change_suppression, dispatch_to_subscribers);
criterion_main!(benches);
