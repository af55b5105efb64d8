//! Result aggregation: the lock-guarded sink workers write into, and the
//! [`ResultSet`] handed back to the caller once every worker has joined.

use std::collections::hash_map::{self, HashMap};
use std::mem;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::TaskError;

/// Terminal outcome of one task: `Ok(())` on success.
pub type Outcome = Result<(), TaskError>;

/// Shared, insert-only map used during a run.
///
/// The lock is held for a single insert only, never across task execution.
#[derive(Debug, Default)]
pub(crate) struct ResultSink {
    entries: Mutex<HashMap<String, Outcome>>,
}

impl ResultSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record an outcome. A later record for the same id replaces the earlier one.
    pub(crate) fn record(&self, task_id: &str, outcome: Outcome) {
        let previous = self.entries.lock().insert(task_id.to_owned(), outcome);
        if previous.is_some() {
            warn!(task_id = task_id, "Duplicate task id; earlier outcome overwritten");
        }
    }

    /// Move the collected outcomes out. Only called after all writers have joined.
    pub(crate) fn take(&self) -> ResultSet {
        ResultSet {
            entries: mem::take(&mut *self.entries.lock()),
        }
    }
}

/// Mapping from task identifier to outcome, the sole output of a run.
///
/// Tasks still queued when the run budget fired have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    entries: HashMap<String, Outcome>,
}

impl ResultSet {
    /// Number of recorded outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outcome of the task with `task_id`, if it ran.
    #[must_use]
    pub fn get(&self, task_id: &str) -> Option<&Outcome> {
        self.entries.get(task_id)
    }

    /// Whether the task with `task_id` ran.
    #[must_use]
    pub fn contains(&self, task_id: &str) -> bool {
        self.entries.contains_key(task_id)
    }

    /// Iterate over `(task_id, outcome)` pairs in arbitrary order.
    pub fn iter(&self) -> hash_map::Iter<'_, String, Outcome> {
        self.entries.iter()
    }

    /// Identifiers of tasks that succeeded.
    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, outcome)| outcome.is_ok())
            .map(|(id, _)| id.as_str())
    }

    /// Errors of tasks that did not succeed.
    pub fn failed(&self) -> impl Iterator<Item = &TaskError> {
        self.entries.values().filter_map(|outcome| outcome.as_ref().err())
    }

    /// Consume into the underlying map.
    #[must_use]
    pub fn into_map(self) -> HashMap<String, Outcome> {
        self.entries
    }

    /// Serialisable per-task view, sorted by identifier.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut tasks: Vec<TaskSummary> = self
            .entries
            .iter()
            .map(|(id, outcome)| TaskSummary {
                task_id: id.clone(),
                status: outcome
                    .as_ref()
                    .map_or_else(|e| e.kind().to_owned(), |_| "success".to_owned()),
                detail: outcome.as_ref().err().map(ToString::to_string),
            })
            .collect();
        tasks.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        RunSummary { tasks }
    }
}

impl IntoIterator for ResultSet {
    type Item = (String, Outcome);
    type IntoIter = hash_map::IntoIter<String, Outcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = (&'a String, &'a Outcome);
    type IntoIter = hash_map::Iter<'a, String, Outcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// One task's line in a [`RunSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    /// Task identifier.
    pub task_id: String,
    /// `success`, `timeout`, `cancelled` or `failure`.
    pub status: String,
    /// Error message for unsuccessful tasks.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

/// Serialisable report of a run's outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Outcomes sorted by task identifier.
    pub tasks: Vec<TaskSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout(id: &str) -> Outcome {
        Err(TaskError::Timeout {
            task_id: id.into(),
            budget: std::time::Duration::from_secs(1),
            completed_steps: 0,
            total_steps: 1,
        })
    }

    #[test]
    fn test_sink_overwrites_duplicate_ids() {
        let sink = ResultSink::new();
        sink.record("dup", Ok(()));
        sink.record("dup", timeout("dup"));
        let results = sink.take();
        assert_eq!(results.len(), 1);
        assert!(results.get("dup").unwrap().is_err());
    }

    #[test]
    fn test_take_leaves_sink_empty() {
        let sink = ResultSink::new();
        sink.record("a", Ok(()));
        assert_eq!(sink.take().len(), 1);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_succeeded_and_failed_partition() {
        let sink = ResultSink::new();
        sink.record("ok", Ok(()));
        sink.record("late", timeout("late"));
        let results = sink.take();

        assert_eq!(results.succeeded().collect::<Vec<_>>(), vec!["ok"]);
        let failed: Vec<_> = results.failed().map(TaskError::task_id).collect();
        assert_eq!(failed, vec!["late"]);
    }

    #[test]
    fn test_summary_sorted_and_serialisable() {
        let sink = ResultSink::new();
        sink.record("b", timeout("b"));
        sink.record("a", Ok(()));
        let summary = sink.take().summary();

        assert_eq!(summary.tasks[0].task_id, "a");
        assert_eq!(summary.tasks[0].status, "success");
        assert_eq!(summary.tasks[1].status, "timeout");

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"status\":\"timeout\""));
        assert!(!json.contains("\"detail\":null"));
    }
}
