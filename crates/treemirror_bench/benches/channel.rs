//! End-to-end capture/drain benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use treemirror_core::sync_tree;
use treemirror_model::{Value, ROOT};
use treemirror_testkit::fixtures::sample_project;

/// Benchmark one captured mutation replayed onto the shadow.
fn bench_single_edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_edit");

    group.bench_function("set_property", |b| {
        let (source, mut reconciler) = sync_tree(sample_project(), 1024).unwrap();

        b.iter(|| {
            source
                .edit(|tracked| tracked.set_property(ROOT, "counter", Value::Int(1)))
                .unwrap();
            black_box(reconciler.drain().unwrap());
        });
    });

    group.bench_function("insert_remove_child", |b| {
        let (source, mut reconciler) = sync_tree(sample_project(), 1024).unwrap();

        b.iter(|| {
            source
                .edit(|tracked| {
                    tracked.insert_child(ROOT, 0, treemirror_model::Tree::new("clip"))?;
                    tracked.remove_child(ROOT, 0)
                })
                .unwrap();
            black_box(reconciler.drain().unwrap());
        });
    });

    group.finish();
}

/// Benchmark draining a burst of buffered records.
fn bench_burst_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("burst_drain");

    for burst in [16, 128, 1024].iter() {
        group.throughput(Throughput::Elements(*burst as u64));
        group.bench_with_input(BenchmarkId::from_parameter(burst), burst, |b, &burst| {
            let (source, mut reconciler) = sync_tree(sample_project(), burst).unwrap();

            b.iter(|| {
                source
                    .edit(|tracked| {
                        for i in 0..burst {
                            tracked.set_property(ROOT, "counter", Value::Int(i as i64))?;
                        }
                        Ok(())
                    })
                    .unwrap();
                black_box(reconciler.drain().unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark overflow recovery via full resynchronization.
fn bench_overflow_resync(c: &mut Criterion) {
    c.bench_function("overflow_resync", |b| {
        let (source, mut reconciler) = sync_tree(sample_project(), 8).unwrap();

        b.iter(|| {
            source
                .edit(|tracked| {
                    // Twice the capacity, so the tail half is dropped.
                    for i in 0..16 {
                        tracked.set_property(ROOT, "counter", Value::Int(i))?;
                    }
                    Ok(())
                })
                .unwrap();
            black_box(reconciler.drain().unwrap());
        });
    });
}

criterion_group!(benches, bench_single_edit, bench_burst_drain, bench_overflow_resync);
criterion_main!(benches);
