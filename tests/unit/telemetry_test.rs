//! Tests for telemetry setup

use batch_scheduler::util::{init_tracing, init_tracing_with_default};

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing_with_default("debug");
    tracing::info!("still logging after repeated init");
}
