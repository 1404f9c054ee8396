// Readiness phase: TCP dependency polling under a bounded retry budget.

pub mod probe;
pub mod types;

pub use probe::{await_all, run_readiness, wait_for};
pub use types::{RetryPolicy, WaitOutcome};
