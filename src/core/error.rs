//! Error types for scheduler and task operations.

use std::time::Duration;

use thiserror::Error;

/// Terminal failure of a single task.
///
/// Task errors never cross the scheduler boundary: workers record them in the
/// [`ResultSet`](crate::core::ResultSet) and move on to the next task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task's own operation budget elapsed before it completed.
    #[error("task `{task_id}` timed out after {budget:?} ({completed_steps}/{total_steps} steps done)")]
    Timeout {
        /// Identifier of the task.
        task_id: String,
        /// The task-local budget that elapsed.
        budget: Duration,
        /// Steps finished before the budget elapsed.
        completed_steps: u32,
        /// Steps the task declared.
        total_steps: u32,
    },
    /// The run's global budget elapsed before the task finished.
    #[error("task `{task_id}` cancelled after {completed_steps}/{total_steps} steps")]
    Cancelled {
        /// Identifier of the task.
        task_id: String,
        /// Steps finished before cancellation was observed.
        completed_steps: u32,
        /// Steps the task declared.
        total_steps: u32,
    },
    /// Task-specific failure unrelated to timing.
    #[error("task `{task_id}` failed: {reason}")]
    Failure {
        /// Identifier of the task.
        task_id: String,
        /// Human-readable cause.
        reason: String,
    },
}

impl TaskError {
    /// Identifier of the task this error belongs to.
    #[must_use]
    pub fn task_id(&self) -> &str {
        match self {
            Self::Timeout { task_id, .. }
            | Self::Cancelled { task_id, .. }
            | Self::Failure { task_id, .. } => task_id,
        }
    }

    /// Short classification label used in logs and summaries.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
            Self::Failure { .. } => "failure",
        }
    }
}

/// Errors produced by the scheduler itself.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Construction parameters are invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// `run` was called more than once on the same scheduler.
    #[error("scheduler has already been run")]
    AlreadyRun,
    /// A task was submitted after `run` began.
    #[error("cannot submit task `{0}`: run already started")]
    SubmitAfterRun(String),
    /// Not a single worker thread could be started.
    #[error("failed to spawn worker threads: {0}")]
    WorkerSpawn(String),
    /// Internal failure (runtime join error, etc.).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_accessors() {
        let err = TaskError::Cancelled {
            task_id: "long".into(),
            completed_steps: 3,
            total_steps: 10,
        };
        assert_eq!(err.task_id(), "long");
        assert_eq!(err.kind(), "cancelled");
        assert_eq!(err.to_string(), "task `long` cancelled after 3/10 steps");
    }

    #[test]
    fn test_failure_display() {
        let err = TaskError::Failure {
            task_id: "io".into(),
            reason: "disk full".into(),
        };
        assert_eq!(err.kind(), "failure");
        assert_eq!(err.to_string(), "task `io` failed: disk full");
    }
}
