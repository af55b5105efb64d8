//! # Batch Scheduler
//!
//! A bounded worker-pool scheduler that runs one fixed batch of heterogeneous
//! tasks under two layered time budgets, with cooperative cancellation and a
//! race-free result set.
//!
//! ## Model
//!
//! - **Tasks** implement [`core::Task`]: an identifier plus `execute(&token)`.
//!   Built-in variants are a single bounded operation ([`core::BoundedTask`]),
//!   a multi-step long-running operation ([`core::MultiStepTask`]) and caller
//!   closures ([`core::FnTask`]).
//! - **Budgets**: the run has a global budget; a task may carry its own. Each
//!   task derives a child [`core::CancellationToken`] from the run token, so
//!   whichever deadline comes first ends it. Its own budget yields
//!   `TaskError::Timeout`, the run budget `TaskError::Cancelled`.
//! - **Workers** are dedicated OS threads pulling from a sealed queue. `run`
//!   joins them all before returning.
//! - **Results**: a [`core::ResultSet`] keyed by task id. Tasks never started
//!   before the run budget fired have no entry. Duplicate ids keep whichever
//!   outcome was recorded last.
//!
//! Cancellation is cooperative: a task that ignores its token runs to its
//! natural end and `run` waits for it.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use batch_scheduler::core::{BoundedTask, MultiStepTask, Scheduler, WorkDuration};
//!
//! let scheduler = Scheduler::new(3, Duration::from_secs(4))?;
//! scheduler.submit(BoundedTask::new("a", Duration::from_secs(2), WorkDuration::Fixed(Duration::from_millis(300))))?;
//! scheduler.submit(MultiStepTask::new("b", 50).with_timeout(Duration::from_secs(5)))?;
//!
//! let results = scheduler.run()?;
//! for (id, outcome) in &results {
//!     println!("{id}: {outcome:?}");
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Tasks, cancellation tokens, result aggregation and the scheduler.
pub mod core;
/// Scheduler configuration.
pub mod config;
/// Async runtime adapters.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;
