//! Container entrypoint: wait for declared service dependencies to accept
//! TCP connections, then hand the process over to exactly one run mode.

pub mod config;
pub mod dispatch;
pub mod exec;
pub mod wait;
