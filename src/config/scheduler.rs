//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable holding the worker count.
pub const ENV_WORKER_COUNT: &str = "SCHEDULER_WORKER_COUNT";
/// Environment variable holding the global budget in milliseconds.
pub const ENV_GLOBAL_BUDGET_MS: &str = "SCHEDULER_GLOBAL_BUDGET_MS";
/// Environment variable holding the worker thread stack size in bytes.
pub const ENV_THREAD_STACK_SIZE: &str = "SCHEDULER_THREAD_STACK_SIZE";

const DEFAULT_GLOBAL_BUDGET: Duration = Duration::from_secs(30);
const DEFAULT_THREAD_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Settings fixed for the life of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads; must be at least 1.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Wall-clock budget for a whole run. Serialised as whole milliseconds
    /// under `global_budget_ms`; the builder keeps full precision.
    #[serde(
        rename = "global_budget_ms",
        with = "duration_ms",
        default = "default_global_budget"
    )]
    pub global_budget: Duration,
    /// Stack size for each worker thread, in bytes.
    #[serde(default = "default_thread_stack_size")]
    pub thread_stack_size: usize,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

const fn default_global_budget() -> Duration {
    DEFAULT_GLOBAL_BUDGET
}

/// `Duration` as an integer number of milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

const fn default_thread_stack_size() -> usize {
    DEFAULT_THREAD_STACK_SIZE
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            global_budget: DEFAULT_GLOBAL_BUDGET,
            thread_stack_size: DEFAULT_THREAD_STACK_SIZE,
        }
    }
}

impl SchedulerConfig {
    /// Defaults: one worker per CPU, 30 second budget, 2 MiB stacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the global budget.
    #[must_use]
    pub const fn with_global_budget(mut self, budget: Duration) -> Self {
        self.global_budget = budget;
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// The global budget.
    #[must_use]
    pub const fn global_budget(&self) -> Duration {
        self.global_budget
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.global_budget.is_zero() {
            return Err("global_budget must be greater than 0".into());
        }
        if self.thread_stack_size == 0 {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the process environment, loading `.env` first if present.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a message if a variable is not a valid number or the result fails validation.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, String> {
            raw.trim()
                .parse()
                .map_err(|_| format!("{key} is not a valid number: `{raw}`"))
        }

        let mut cfg = Self::default();
        if let Some(raw) = lookup(ENV_WORKER_COUNT) {
            cfg.worker_count = parse(ENV_WORKER_COUNT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_GLOBAL_BUDGET_MS) {
            cfg.global_budget = Duration::from_millis(parse(ENV_GLOBAL_BUDGET_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_THREAD_STACK_SIZE) {
            cfg.thread_stack_size = parse(ENV_THREAD_STACK_SIZE, &raw)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
