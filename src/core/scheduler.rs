//! Batch scheduler running a fixed set of tasks on dedicated OS threads.
//!
//! A run seals the submitted batch into a closed `crossbeam` channel, derives one
//! [`CancellationToken`] from the global budget and starts `worker_count` threads.
//! Each worker loops: stop if the run token fired, otherwise take the next task,
//! execute it under the run token and record its outcome. `run` joins every worker
//! before reading outcomes, so every task that started has reached a terminal state
//! by the time the caller sees the [`ResultSet`].
//!
//! Tasks still queued when the run budget fires are never started and get no entry.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;

use super::cancel::CancellationToken;
use super::error::{SchedulerError, TaskError};
use super::results::{Outcome, ResultSet, ResultSink};
use super::task::Task;

type BoxedTask = Box<dyn Task>;

/// Snapshot of a scheduler's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Tasks accepted by `submit`.
    pub submitted: u64,
    /// Tasks taken off the queue by a worker.
    pub dequeued: u64,
    /// Tasks that finished successfully.
    pub succeeded: u64,
    /// Tasks whose own budget elapsed.
    pub timed_out: u64,
    /// Tasks stopped by the run budget.
    pub cancelled: u64,
    /// Tasks that failed for other reasons, including panics.
    pub failed: u64,
    /// Tasks never started because the run budget fired first.
    pub abandoned: u64,
    /// Wall-clock duration of the run, once finished.
    pub elapsed: Option<Duration>,
}

/// Counters behind [`RunStats`]: atomics for task counts, plus the run's
/// elapsed time, written once under a lock after workers join.
#[derive(Debug, Default)]
struct RunCounters {
    submitted: AtomicU64,
    dequeued: AtomicU64,
    succeeded: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
    failed: AtomicU64,
    abandoned: AtomicU64,
    elapsed: Mutex<Option<Duration>>,
}

impl RunCounters {
    fn record(&self, outcome: &Outcome) {
        let counter = match outcome {
            Ok(()) => &self.succeeded,
            Err(TaskError::Timeout { .. }) => &self.timed_out,
            Err(TaskError::Cancelled { .. }) => &self.cancelled,
            Err(TaskError::Failure { .. }) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RunStats {
        RunStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            dequeued: self.dequeued.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            elapsed: *self.elapsed.lock(),
        }
    }
}

/// Runs one fixed batch of tasks on a bounded worker pool under a global budget.
///
/// Tasks are accepted until [`run`](Self::run) starts; the scheduler runs at most once.
///
/// ```rust,ignore
/// use std::time::Duration;
/// use batch_scheduler::core::{BoundedTask, MultiStepTask, Scheduler, WorkDuration};
///
/// let scheduler = Scheduler::new(3, Duration::from_secs(4))?;
/// scheduler.submit(BoundedTask::new("a", Duration::from_secs(2), WorkDuration::Fixed(Duration::from_millis(300))))?;
/// scheduler.submit(MultiStepTask::new("b", 50).with_timeout(Duration::from_secs(5)))?;
/// let results = scheduler.run()?;
/// ```
pub struct Scheduler {
    config: SchedulerConfig,
    pending: Mutex<Vec<BoxedTask>>,
    started: AtomicBool,
    counters: Arc<RunCounters>,
}

impl Scheduler {
    /// Create a scheduler with `worker_count` workers and a run budget of `global_budget`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if `worker_count` is 0 or the budget is zero.
    pub fn new(worker_count: usize, global_budget: Duration) -> Result<Self, SchedulerError> {
        Self::with_config(
            SchedulerConfig::new()
                .with_worker_count(worker_count)
                .with_global_budget(global_budget),
        )
    }

    /// Create a scheduler from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if the configuration is invalid.
    pub fn with_config(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        debug!(
            worker_count = config.worker_count,
            global_budget = ?config.global_budget,
            "Scheduler created"
        );
        Ok(Self {
            config,
            pending: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            counters: Arc::new(RunCounters::default()),
        })
    }

    /// The configuration this scheduler was built with.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Add a task to the batch.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::SubmitAfterRun` once `run` has started.
    pub fn submit(&self, task: impl Task) -> Result<(), SchedulerError> {
        self.submit_boxed(Box::new(task))
    }

    /// Add an already boxed task to the batch.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::SubmitAfterRun` once `run` has started.
    pub fn submit_boxed(&self, task: Box<dyn Task>) -> Result<(), SchedulerError> {
        let mut pending = self.pending.lock();
        if self.started.load(Ordering::Acquire) {
            warn!(task_id = task.id(), "Rejected submission after run started");
            return Err(SchedulerError::SubmitAfterRun(task.id().to_owned()));
        }
        debug!(task_id = task.id(), "Task submitted");
        pending.push(task);
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of tasks waiting for `run`.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Current counters. Final once `run` has returned.
    #[must_use]
    pub fn stats(&self) -> RunStats {
        self.counters.snapshot()
    }

    /// Run the batch and block until every worker has exited.
    ///
    /// Task failures, timeouts and cancellations are reported in the returned
    /// [`ResultSet`], never as an error here.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::AlreadyRun` on a second call
    /// - `SchedulerError::WorkerSpawn` if no worker thread could be started
    pub fn run(&self) -> Result<ResultSet, SchedulerError> {
        let tasks = {
            let mut pending = self.pending.lock();
            if self.started.swap(true, Ordering::AcqRel) {
                return Err(SchedulerError::AlreadyRun);
            }
            std::mem::take(&mut *pending)
        };

        let run_id = Uuid::new_v4();
        let span = info_span!("scheduler_run", run_id = %run_id);
        let _enter = span.enter();

        let started_at = Instant::now();
        let task_count = tasks.len();

        // Seal the batch: every task is queued and the sender dropped before any worker starts.
        let (task_tx, task_rx) = bounded::<BoxedTask>(task_count.max(1));
        for task in tasks {
            if task_tx.send(task).is_err() {
                return Err(SchedulerError::Internal("task queue closed while sealing".into()));
            }
        }
        drop(task_tx);

        let run_token = CancellationToken::with_timeout(self.config.global_budget());
        let sink = Arc::new(ResultSink::new());

        info!(
            task_count = task_count,
            worker_count = self.config.worker_count,
            global_budget = ?self.config.global_budget,
            "Scheduler run started"
        );

        let mut workers = Vec::with_capacity(self.config.worker_count);
        let mut spawn_errors = Vec::new();
        for worker_id in 0..self.config.worker_count {
            match spawn_worker(
                worker_id,
                task_rx.clone(),
                run_token.clone(),
                Arc::clone(&sink),
                Arc::clone(&self.counters),
                self.config.thread_stack_size,
                span.clone(),
            ) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(worker_id = worker_id, error = %e, "Failed to spawn worker thread");
                    spawn_errors.push(e.to_string());
                }
            }
        }

        if workers.is_empty() {
            return Err(SchedulerError::WorkerSpawn(spawn_errors.join("; ")));
        }

        for (worker_id, worker) in workers.into_iter().enumerate() {
            if worker.join().is_err() {
                error!(worker_id = worker_id, "Worker thread panicked outside task execution");
            }
        }

        for task in task_rx.try_iter() {
            warn!(task_id = task.id(), "Task abandoned: run budget elapsed before it started");
            self.counters.abandoned.fetch_add(1, Ordering::Relaxed);
        }

        let elapsed = started_at.elapsed();
        *self.counters.elapsed.lock() = Some(elapsed);
        let results = sink.take();
        let stats = self.counters.snapshot();

        info!(
            elapsed = ?elapsed,
            recorded = results.len(),
            succeeded = stats.succeeded,
            timed_out = stats.timed_out,
            cancelled = stats.cancelled,
            failed = stats.failed,
            abandoned = stats.abandoned,
            "Scheduler run complete"
        );

        Ok(results)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("pending", &self.pending_len())
            .field("started", &self.started.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Execute a task, turning a panic into a `Failure` outcome.
fn execute_guarded(task: &dyn Task, token: &CancellationToken) -> Outcome {
    panic::catch_unwind(AssertUnwindSafe(|| task.execute(token))).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_owned());
        Err(TaskError::Failure {
            task_id: task.id().to_owned(),
            reason: format!("panicked: {reason}"),
        })
    })
}

/// Spawn a worker thread.
fn spawn_worker(
    worker_id: usize,
    task_rx: Receiver<BoxedTask>,
    run_token: CancellationToken,
    sink: Arc<ResultSink>,
    counters: Arc<RunCounters>,
    stack_size: usize,
    span: tracing::Span,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("sched-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            let _enter = span.enter();
            debug!(worker_id = worker_id, "Worker thread started");

            loop {
                if let Some(signal) = run_token.signal() {
                    debug!(
                        worker_id = worker_id,
                        origin = ?signal.origin,
                        "Run budget elapsed, worker stopping"
                    );
                    break;
                }

                // The queue is sealed, so an error here means it is drained.
                let Ok(task) = task_rx.recv() else {
                    debug!(worker_id = worker_id, "Queue drained, worker exiting");
                    break;
                };
                counters.dequeued.fetch_add(1, Ordering::Relaxed);

                debug!(worker_id = worker_id, task_id = task.id(), "Worker executing task");
                let outcome = execute_guarded(&*task, &run_token);

                match &outcome {
                    Ok(()) => info!(worker_id = worker_id, task_id = task.id(), "Task succeeded"),
                    Err(e) => warn!(
                        worker_id = worker_id,
                        task_id = task.id(),
                        kind = e.kind(),
                        error = %e,
                        "Task did not succeed"
                    ),
                }

                counters.record(&outcome);
                sink.record(task.id(), outcome);
            }

            debug!(worker_id = worker_id, "Worker thread exiting");
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::{BoundedTask, FnTask, WorkDuration};

    fn quick(id: &str) -> BoundedTask {
        BoundedTask::new(id, Duration::from_secs(1), WorkDuration::Fixed(Duration::from_millis(5)))
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = Scheduler::new(0, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let err = Scheduler::new(2, Duration::ZERO).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidConfig(_)));
    }

    #[test]
    fn test_sub_millisecond_budget_accepted() {
        let scheduler = Scheduler::new(1, Duration::from_micros(500)).unwrap();
        assert_eq!(scheduler.config().global_budget(), Duration::from_micros(500));

        let scheduler = Scheduler::new(1, Duration::from_micros(1500)).unwrap();
        assert_eq!(scheduler.config().global_budget(), Duration::from_micros(1500));
    }

    #[test]
    fn test_empty_batch_returns_immediately() {
        let scheduler = Scheduler::new(4, Duration::from_secs(10)).unwrap();
        let started = Instant::now();
        let results = scheduler.run().unwrap();
        assert!(results.is_empty());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_second_run_fails_fast() {
        let scheduler = Scheduler::new(1, Duration::from_secs(1)).unwrap();
        scheduler.submit(quick("a")).unwrap();
        assert_eq!(scheduler.run().unwrap().len(), 1);
        assert!(matches!(scheduler.run(), Err(SchedulerError::AlreadyRun)));
    }

    #[test]
    fn test_submit_after_run_rejected() {
        let scheduler = Scheduler::new(1, Duration::from_secs(1)).unwrap();
        scheduler.run().unwrap();
        let err = scheduler.submit(quick("late")).unwrap_err();
        assert!(matches!(err, SchedulerError::SubmitAfterRun(id) if id == "late"));
        assert_eq!(scheduler.stats().submitted, 0);
    }

    #[test]
    fn test_panicking_task_becomes_failure() {
        let scheduler = Scheduler::new(1, Duration::from_secs(2)).unwrap();
        scheduler
            .submit(FnTask::new("bad", |_token: &CancellationToken| -> Result<(), String> {
                panic!("exploded")
            }))
            .unwrap();
        scheduler.submit(quick("good")).unwrap();

        let results = scheduler.run().unwrap();
        assert_eq!(results.get("good"), Some(&Ok(())));
        match results.get("bad") {
            Some(Err(TaskError::Failure { reason, .. })) => assert!(reason.contains("exploded")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(scheduler.stats().failed, 1);
    }

    #[test]
    fn test_stats_after_run() {
        let scheduler = Scheduler::new(2, Duration::from_secs(2)).unwrap();
        for i in 0..4 {
            scheduler.submit(quick(&format!("t{i}"))).unwrap();
        }
        assert_eq!(scheduler.pending_len(), 4);
        scheduler.run().unwrap();

        let stats = scheduler.stats();
        assert_eq!(stats.submitted, 4);
        assert_eq!(stats.dequeued, 4);
        assert_eq!(stats.succeeded, 4);
        assert_eq!(stats.abandoned, 0);
        assert!(stats.elapsed.is_some());
        assert_eq!(scheduler.pending_len(), 0);
    }
}
