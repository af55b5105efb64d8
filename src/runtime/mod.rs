//! Runtime adapters for driving a blocking run from async code.

pub mod tokio_adapter;

pub use tokio_adapter::run_async;
