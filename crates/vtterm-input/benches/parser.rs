use std::time::Instant;

use criterion::{criterion_group, criterion_main, Criterion};
use vtterm_info::TerminfoRegistry;
use vtterm_input::{KeyParser, DEFAULT_KEY_TIMEOUT};

fn arrow_key_scan(c: &mut Criterion) {
    let reg = TerminfoRegistry::with_defaults();
    let terminfo = reg.lookup("xterm", None).unwrap();
    c.bench_function("key parser arrow sequence", |b| {
        b.iter(|| {
            let mut parser = KeyParser::new(&terminfo, DEFAULT_KEY_TIMEOUT);
            parser.feed(b"\x1b[1;2A");
            parser.poll(Instant::now())
        });
    });
}

criterion_group!(benches, arrow_key_scan);
criterion_main!(benches);
