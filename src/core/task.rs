//! Task abstraction and the built-in task variants.
//!
//! Every task receives the run's [`CancellationToken`] and derives its own
//! task-local token from it, so whichever of the two budgets fires first ends
//! the task. Which one fired decides the outcome: the task's own budget yields
//! [`TaskError::Timeout`], the run budget yields [`TaskError::Cancelled`].
//!
//! Cancellation is cooperative. A task that never looks at its token runs to
//! its natural end regardless of either deadline; the scheduler cannot preempt it.

use std::fmt;
use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, trace};

use super::cancel::{CancelOrigin, CancelSignal, CancellationToken};
use super::error::TaskError;
use super::results::Outcome;

/// A unit of work the scheduler can run.
///
/// Implementations must observe `token` at bounded intervals and return promptly
/// once it fires.
pub trait Task: Send + 'static {
    /// Caller-assigned identifier. Uniqueness is not enforced.
    fn id(&self) -> &str;

    /// Run the task to a terminal state.
    ///
    /// # Errors
    ///
    /// Returns the [`TaskError`] describing why the task did not succeed.
    fn execute(&self, token: &CancellationToken) -> Outcome;
}

impl fmt::Debug for dyn Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("id", &self.id()).finish()
    }
}

/// Classify a fired signal for a task that had finished `completed` of `total` steps.
fn classify(
    signal: CancelSignal,
    task_id: &str,
    budget: Option<Duration>,
    completed: u32,
    total: u32,
) -> TaskError {
    match (signal.origin, budget) {
        (CancelOrigin::Local, Some(budget)) => TaskError::Timeout {
            task_id: task_id.to_owned(),
            budget,
            completed_steps: completed,
            total_steps: total,
        },
        _ => TaskError::Cancelled {
            task_id: task_id.to_owned(),
            completed_steps: completed,
            total_steps: total,
        },
    }
}

/// How long a simulated unit of work takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkDuration {
    /// Always the same duration.
    Fixed(Duration),
    /// Uniformly drawn from `min..=max` on each execution.
    Random {
        /// Lower bound.
        min: Duration,
        /// Upper bound (inclusive).
        max: Duration,
    },
}

impl WorkDuration {
    /// Concrete duration for one execution.
    #[must_use]
    pub fn sample(&self) -> Duration {
        match *self {
            Self::Fixed(d) => d,
            Self::Random { min, max } if max > min => rand::rng().random_range(min..=max),
            Self::Random { min, .. } => min,
        }
    }
}

/// A single bounded operation raced against its own timeout.
#[derive(Debug, Clone)]
pub struct BoundedTask {
    id: String,
    timeout: Duration,
    work: WorkDuration,
}

impl BoundedTask {
    /// Work range used by [`BoundedTask::jittered`].
    pub const JITTER_MIN: Duration = Duration::from_millis(300);
    /// Upper bound of the [`BoundedTask::jittered`] range.
    pub const JITTER_MAX: Duration = Duration::from_millis(400);

    /// Create a bounded task that takes `work` and may use at most `timeout`.
    pub fn new(id: impl Into<String>, timeout: Duration, work: WorkDuration) -> Self {
        Self {
            id: id.into(),
            timeout,
            work,
        }
    }

    /// Bounded task whose work takes a random 300-400ms.
    pub fn jittered(id: impl Into<String>, timeout: Duration) -> Self {
        Self::new(
            id,
            timeout,
            WorkDuration::Random {
                min: Self::JITTER_MIN,
                max: Self::JITTER_MAX,
            },
        )
    }

    /// The task-local budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Task for BoundedTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn execute(&self, token: &CancellationToken) -> Outcome {
        let token = token.child_with_timeout(Some(self.timeout));
        let work = self.work.sample();
        debug!(task_id = %self.id, work = ?work, "Bounded task started");

        token
            .sleep(work)
            .map_err(|signal| classify(signal, &self.id, Some(self.timeout), 0, 1))?;

        debug!(task_id = %self.id, work = ?work, "Bounded task finished");
        Ok(())
    }
}

/// A long-running task made of discrete steps, checking its token before each one.
///
/// Cancellation is observed at step boundaries only, so a task may overrun a
/// deadline by at most one step interval.
#[derive(Debug, Clone)]
pub struct MultiStepTask {
    id: String,
    steps: u32,
    step_interval: Duration,
    timeout: Option<Duration>,
}

impl MultiStepTask {
    /// Pause between steps unless overridden.
    pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_millis(100);

    /// Create a task with `steps` steps, no own budget and the default interval.
    pub fn new(id: impl Into<String>, steps: u32) -> Self {
        Self {
            id: id.into(),
            steps,
            step_interval: Self::DEFAULT_STEP_INTERVAL,
            timeout: None,
        }
    }

    /// Set the pause taken by each step.
    #[must_use]
    pub const fn with_step_interval(mut self, interval: Duration) -> Self {
        self.step_interval = interval;
        self
    }

    /// Give the task its own budget.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Declared number of steps.
    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.steps
    }
}

impl Task for MultiStepTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn execute(&self, token: &CancellationToken) -> Outcome {
        let token = token.child_with_timeout(self.timeout);
        debug!(task_id = %self.id, steps = self.steps, "Multi-step task started");

        for step in 0..self.steps {
            if let Some(signal) = token.signal() {
                debug!(task_id = %self.id, completed = step, "Multi-step task interrupted");
                return Err(classify(signal, &self.id, self.timeout, step, self.steps));
            }
            // A started step always runs to its end; the token is only observed between steps.
            thread::sleep(self.step_interval);
            trace!(task_id = %self.id, progress = step + 1, total = self.steps, "Step done");
        }

        debug!(task_id = %self.id, "Multi-step task finished");
        Ok(())
    }
}

/// Caller-supplied work. The closure gets the task's token and reports failure as a string.
///
/// An `Err` returned after the token fired is classified by the deadline that
/// fired (`Timeout` or `Cancelled`); any other `Err` is a `Failure`.
pub struct FnTask<F> {
    id: String,
    timeout: Option<Duration>,
    work: F,
}

impl<F> FnTask<F>
where
    F: Fn(&CancellationToken) -> Result<(), String> + Send + 'static,
{
    /// Wrap `work` as a task named `id`.
    pub fn new(id: impl Into<String>, work: F) -> Self {
        Self {
            id: id.into(),
            timeout: None,
            work,
        }
    }

    /// Give the task its own budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl<F> Task for FnTask<F>
where
    F: Fn(&CancellationToken) -> Result<(), String> + Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn execute(&self, token: &CancellationToken) -> Outcome {
        let token = token.child_with_timeout(self.timeout);
        (self.work)(&token).map_err(|reason| match token.signal() {
            Some(signal) => {
                debug!(task_id = %self.id, reason = %reason, "Closure stopped after its token fired");
                classify(signal, &self.id, self.timeout, 0, 1)
            }
            None => TaskError::Failure {
                task_id: self.id.clone(),
                reason,
            },
        })
    }
}
