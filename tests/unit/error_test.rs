//! Tests for error types

use std::time::Duration;

use batch_scheduler::core::{SchedulerError, TaskError};

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("worker_count must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: worker_count must be greater than 0"
    );
}

#[test]
fn test_already_run_error() {
    let err = SchedulerError::AlreadyRun;
    assert_eq!(format!("{}", err), "scheduler has already been run");
}

#[test]
fn test_submit_after_run_error() {
    let err = SchedulerError::SubmitAfterRun("late".to_string());
    assert_eq!(format!("{}", err), "cannot submit task `late`: run already started");
}

#[test]
fn test_timeout_error() {
    let err = TaskError::Timeout {
        task_id: "long-task-2".to_string(),
        budget: Duration::from_secs(1),
        completed_steps: 9,
        total_steps: 20,
    };
    assert_eq!(err.kind(), "timeout");
    assert_eq!(
        format!("{}", err),
        "task `long-task-2` timed out after 1s (9/20 steps done)"
    );
}
