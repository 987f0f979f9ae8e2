use criterion::{black_box, criterion_group, criterion_main, Criterion};
use taskrune::sandbox::Sandbox;

fn bench_check_path(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("docs/nested")).unwrap();
    let sandbox = Sandbox::new(dir.path()).unwrap();

    c.bench_function("check_path_existing", |b| {
        b.iter(|| black_box(sandbox.check_path(black_box("docs/nested"))));
    });

    c.bench_function("check_path_new_file", |b| {
        b.iter(|| black_box(sandbox.check_path(black_box("docs/nested/out/report.json"))));
    });

    c.bench_function("check_path_traversal", |b| {
        b.iter(|| black_box(sandbox.check_path(black_box("docs/../../../etc/passwd"))));
    });

    c.bench_function("check_path_fullwidth", |b| {
        b.iter(|| black_box(sandbox.check_path(black_box("\u{FF44}\u{FF4F}\u{FF43}\u{FF53}/a.md"))));
    });
}

criterion_group!(benches, bench_check_path);
criterion_main!(benches);
