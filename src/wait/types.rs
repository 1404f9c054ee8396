use std::time::Duration;

use crate::config::Config;

/// Retry budget for a single dependency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Pause between consecutive attempts.
    pub interval: Duration,
    /// Total connection attempts before giving up.
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            interval: Duration::from_secs_f64(cfg.sleep),
            max_attempts: cfg.tries,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 60,
        }
    }
}

/// Result of waiting on one dependency.
///
/// The attempt count is observable so callers and tests can see how much of
/// the budget was spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The endpoint accepted a connection on the given attempt.
    Reachable { attempts: u32 },
    /// Every attempt in the budget failed.
    TimedOut { attempts: u32 },
}

impl WaitOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, WaitOutcome::Reachable { .. })
    }
}
