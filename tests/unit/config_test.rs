//! Tests for configuration validation

use std::time::Duration;

use batch_scheduler::config::SchedulerConfig;
use batch_scheduler::core::{Scheduler, SchedulerError};

#[test]
fn test_default_config_is_valid() {
    let config = SchedulerConfig::new();
    assert!(config.worker_count >= 1);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_invalid_worker_count() {
    let invalid = SchedulerConfig::new().with_worker_count(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_invalid_budget() {
    let invalid = SchedulerConfig::new().with_global_budget(Duration::ZERO);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_invalid_stack_size() {
    let invalid = SchedulerConfig::new().with_thread_stack_size(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "worker_count": 3,
        "global_budget_ms": 4000,
        "thread_stack_size": 1048576
    }"#;

    let config = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(config.worker_count, 3);
    assert_eq!(config.global_budget(), Duration::from_secs(4));
    assert_eq!(config.thread_stack_size, 1_048_576);
}

#[test]
fn test_config_from_json_fills_defaults() {
    let config = SchedulerConfig::from_json_str(r#"{ "worker_count": 2 }"#).unwrap();
    assert_eq!(config.worker_count, 2);
    assert_eq!(config.global_budget(), SchedulerConfig::new().global_budget());
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{ "worker_count": 0 }"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_scheduler_with_config() {
    let config = SchedulerConfig::new()
        .with_worker_count(2)
        .with_global_budget(Duration::from_secs(1));
    let scheduler = Scheduler::with_config(config.clone()).unwrap();
    assert_eq!(scheduler.config(), &config);
}

#[test]
fn test_scheduler_rejects_invalid_config() {
    let config = SchedulerConfig::new().with_worker_count(0);
    assert!(matches!(
        Scheduler::with_config(config),
        Err(SchedulerError::InvalidConfig(_))
    ));
}
