//! Tests for the tokio adapter

use std::sync::Arc;
use std::time::Duration;

use batch_scheduler::core::{BoundedTask, Scheduler, SchedulerError, WorkDuration};
use batch_scheduler::runtime::run_async;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_async() {
    let scheduler = Arc::new(Scheduler::new(2, Duration::from_secs(2)).unwrap());
    scheduler
        .submit(BoundedTask::new(
            "async",
            Duration::from_secs(1),
            WorkDuration::Fixed(Duration::from_millis(20)),
        ))
        .unwrap();

    let results = run_async(Arc::clone(&scheduler)).await.unwrap();
    assert_eq!(results.get("async"), Some(&Ok(())));

    let second = run_async(scheduler).await;
    assert!(matches!(second, Err(SchedulerError::AlreadyRun)));
}
