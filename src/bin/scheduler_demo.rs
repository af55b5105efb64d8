//! Demo driver: runs a mixed batch of bounded and multi-step tasks on three
//! workers with a four second budget and prints each outcome.

use std::time::{Duration, Instant};

use anyhow::Context;
use batch_scheduler::core::{AppResult, BoundedTask, MultiStepTask, Scheduler};
use batch_scheduler::util::init_tracing;

fn main() -> AppResult<()> {
    init_tracing();
    println!("=== batch scheduler demo ===");

    let scheduler = Scheduler::new(3, Duration::from_secs(4)).context("building scheduler")?;
    scheduler.submit(BoundedTask::jittered("task-1", Duration::from_secs(2)))?;
    // Needs 5s; the 4s run budget cancels it.
    scheduler.submit(MultiStepTask::new("long-task-1", 50).with_timeout(Duration::from_secs(5)))?;
    // Same id as above: whichever finishes last keeps the entry.
    scheduler.submit(MultiStepTask::new("long-task-1", 40).with_timeout(Duration::from_secs(4)))?;
    // Needs 2s with a 1s budget of its own.
    scheduler.submit(MultiStepTask::new("long-task-2", 20).with_timeout(Duration::from_secs(1)))?;
    scheduler.submit(BoundedTask::jittered("task-3", Duration::from_millis(500)))?;

    let started = Instant::now();
    let results = scheduler.run().context("running batch")?;
    let elapsed = started.elapsed();

    println!("\n=== results (total {elapsed:?}) ===");
    for line in results.summary().tasks {
        match line.detail {
            Some(detail) => println!("{}: {} - {detail}", line.task_id, line.status),
            None => println!("{}: {}", line.task_id, line.status),
        }
    }

    let stats = scheduler.stats();
    println!(
        "\nsubmitted={} dequeued={} abandoned={}",
        stats.submitted, stats.dequeued, stats.abandoned
    );
    Ok(())
}
