//! Core scheduling abstractions: tasks, cancellation, results and the scheduler.

pub mod cancel;
pub mod error;
pub mod results;
pub mod scheduler;
pub mod task;

pub use cancel::{CancelOrigin, CancelSignal, CancellationToken};
pub use error::{AppResult, SchedulerError, TaskError};
pub use results::{Outcome, ResultSet, RunSummary, TaskSummary};
pub use scheduler::{RunStats, Scheduler};
pub use task::{BoundedTask, FnTask, MultiStepTask, Task, WorkDuration};
