//! Benchmarks for the batch scheduler.
//!
//! Benchmarks cover:
//! - Dispatch overhead for batches of no-op tasks
//! - Scaling with worker count
//! - Cancellation token creation and checks

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;

use batch_scheduler::core::{CancellationToken, FnTask, Scheduler};

fn run_batch(workers: usize, tasks: usize) -> usize {
    let scheduler = Scheduler::new(workers, Duration::from_secs(60)).expect("valid config");
    for i in 0..tasks {
        scheduler
            .submit(FnTask::new(format!("noop-{i}"), |token: &CancellationToken| {
                black_box(token.is_cancelled());
                Ok(())
            }))
            .expect("submit before run");
    }
    scheduler.run().expect("single run").len()
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    for tasks in [10_usize, 100, 1_000] {
        group.throughput(Throughput::Elements(tasks as u64));
        group.bench_with_input(BenchmarkId::new("noop_tasks", tasks), &tasks, |b, &tasks| {
            b.iter(|| run_batch(4, black_box(tasks)));
        });
    }
    group.finish();
}

fn bench_worker_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("worker_scaling");
    for workers in [1_usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, &workers| {
            b.iter(|| run_batch(workers, 500));
        });
    }
    group.finish();
}

fn bench_tokens(c: &mut Criterion) {
    let root = CancellationToken::with_timeout(Duration::from_secs(60));
    c.bench_function("token_child_and_check", |b| {
        b.iter(|| {
            let child = root.child_with_timeout(Some(Duration::from_secs(1)));
            black_box(child.is_cancelled())
        });
    });
}

criterion_group!(benches, bench_dispatch, bench_worker_scaling, bench_tokens);
criterion_main!(benches);
