use criterion::{black_box, criterion_group, criterion_main, Criterion};
use taskrune::handlers::builtin_registry;
use taskrune::{Agent, AgentConfig, TaskText};
use tokio::runtime::Runtime;

fn bench_predicate_scan(c: &mut Criterion) {
    let registry = builtin_registry().unwrap();
    let first = TaskText::new("delete notes.txt");
    let last = TaskText::new("extract top 5 words from notes.txt");
    let none = TaskText::new("dance the tango with a partner in the evening");

    c.bench_function("first_match_head", |b| {
        b.iter(|| black_box(registry.first_match(black_box(&first)).is_some()));
    });
    c.bench_function("first_match_tail", |b| {
        b.iter(|| black_box(registry.first_match(black_box(&last)).is_some()));
    });
    c.bench_function("first_match_miss", |b| {
        b.iter(|| black_box(registry.first_match(black_box(&none)).is_some()));
    });
}

fn bench_route(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let agent = Agent::new(&AgentConfig::with_root(dir.path())).unwrap();
    std::fs::write(agent.sandbox().root().join("notes.txt"), "alpha beta beta gamma\n".repeat(200)).unwrap();

    c.bench_function("route_unknown", |b| {
        b.to_async(&rt).iter(|| async { black_box(agent.invoke("dance the tango").await) });
    });

    c.bench_function("route_top_words", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(agent.invoke("extract top 3 words from notes.txt").await) });
    });
}

criterion_group!(benches, bench_predicate_scan, bench_route);
criterion_main!(benches);
