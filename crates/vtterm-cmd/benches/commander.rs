use criterion::{criterion_group, criterion_main, Criterion};
use vtterm_cmd::Commander;
use vtterm_info::{Position, TerminfoRegistry};

fn goto_cache_hit(c: &mut Criterion) {
    let reg = TerminfoRegistry::with_defaults();
    let cmd = Commander::new(reg.lookup("xterm", None).unwrap());
    let hash = Position::new(10, 20).hash();
    let mut buf = Vec::new();
    cmd.goto(&mut buf, hash).unwrap();
    c.bench_function("goto cache hit", |b| {
        b.iter(|| {
            buf.clear();
            cmd.goto(&mut buf, hash).unwrap();
        });
    });
}

criterion_group!(benches, goto_cache_hit);
criterion_main!(benches);
