// Mode dispatch: map the first CLI token to a plan and run it.

pub mod commands;
pub mod runner;
pub mod types;

pub use runner::{dispatch, plan_for};
pub use types::{Mode, Plan, RunReport, Step, StepRecord};
