//! Tokio adapter: runs a scheduler on tokio's blocking pool so async callers
//! are not stalled while workers join.

use std::sync::Arc;

use crate::core::{ResultSet, Scheduler, SchedulerError};

/// Run `scheduler` on a blocking thread and await its results.
///
/// # Errors
///
/// Returns the scheduler's own errors, or `SchedulerError::Internal` if the
/// blocking task could not be joined.
pub async fn run_async(scheduler: Arc<Scheduler>) -> Result<ResultSet, SchedulerError> {
    tokio::task::spawn_blocking(move || scheduler.run())
        .await
        .map_err(|e| SchedulerError::Internal(format!("blocking run failed: {e}")))?
}
