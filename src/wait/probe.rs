use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use super::types::{RetryPolicy, WaitOutcome};
use crate::config::{Config, Endpoint, OnTimeout, WaitStrategy};

/// Upper bound on a single connect attempt, independent of the retry interval.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Block until `endpoint` accepts a TCP connection or the budget is spent.
///
/// Makes at most `policy.max_attempts` attempts with `policy.interval`
/// between consecutive ones. Success returns immediately: no sleep ever
/// follows the attempt that connected.
pub fn wait_for(endpoint: &Endpoint, policy: &RetryPolicy) -> WaitOutcome {
    // One progress line per dependency, not per attempt.
    info!("waiting for {endpoint} to accept connections");

    for attempt in 1..=policy.max_attempts {
        if try_connect(endpoint) {
            debug!("{endpoint} reachable after {attempt} attempt(s)");
            return WaitOutcome::Reachable { attempts: attempt };
        }
        if attempt < policy.max_attempts {
            std::thread::sleep(policy.interval);
        }
    }

    WaitOutcome::TimedOut {
        attempts: policy.max_attempts,
    }
}

/// One connect attempt. Resolution failure counts as an ordinary failure:
/// in a composed environment the peer's name may not resolve until its
/// container is up.
fn try_connect(endpoint: &Endpoint) -> bool {
    let addrs = match (endpoint.host.as_str(), endpoint.port).to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(_) => return false,
    };
    for addr in addrs {
        if TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok() {
            return true;
        }
    }
    false
}

/// Wait for every endpoint, each under its own copy of `policy`.
///
/// `Sequential` polls one at a time in declaration order, so the worst case
/// is the sum of the individual budgets. `Parallel` spawns a thread per
/// endpoint and joins them all, bounding the worst case by the slowest
/// dependency. Outcomes come back in declaration order either way.
pub fn await_all(
    endpoints: &[Endpoint],
    policy: &RetryPolicy,
    strategy: WaitStrategy,
) -> Vec<(Endpoint, WaitOutcome)> {
    match strategy {
        WaitStrategy::Sequential => endpoints
            .iter()
            .map(|ep| (ep.clone(), wait_for(ep, policy)))
            .collect(),
        WaitStrategy::Parallel => {
            let handles: Vec<_> = endpoints
                .iter()
                .map(|ep| {
                    let ep = ep.clone();
                    let policy = *policy;
                    std::thread::spawn(move || {
                        let outcome = wait_for(&ep, &policy);
                        (ep, outcome)
                    })
                })
                .collect();

            handles
                .into_iter()
                .filter_map(|handle| handle.join().ok())
                .collect()
        }
    }
}

/// Run the readiness phase described by `cfg`.
///
/// Skipped entirely unless the development signal is set; all dependencies
/// are then assumed ready. Timeouts are advisory under `continue` (logged,
/// startup proceeds) and fatal under `abort`.
pub fn run_readiness(cfg: &Config) -> Result<()> {
    if !cfg.development {
        debug!("development signal absent, skipping readiness checks");
        return Ok(());
    }

    let policy = RetryPolicy::from_config(cfg);
    let mut unreachable = Vec::new();
    for (endpoint, outcome) in await_all(&cfg.wait_for, &policy, cfg.wait_strategy) {
        if let WaitOutcome::TimedOut { attempts } = outcome {
            warn!("{endpoint} still unreachable after {attempts} attempt(s)");
            unreachable.push(endpoint.to_string());
        }
    }

    if !unreachable.is_empty() && cfg.on_timeout == OnTimeout::Abort {
        bail!("dependencies unreachable: {}", unreachable.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::Instant;

    use super::*;

    /// Listener kept alive for the duration of a test.
    fn open_port() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    /// A loopback port with nothing listening: bind, read the port, drop.
    fn closed_port() -> u16 {
        let (listener, port) = open_port();
        drop(listener);
        port
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::ZERO,
            max_attempts,
        }
    }

    #[test]
    fn reachable_on_first_attempt_without_sleeping() {
        let (_listener, port) = open_port();
        let ep = Endpoint::new("127.0.0.1", port);
        let policy = RetryPolicy {
            interval: Duration::from_secs(5),
            max_attempts: 3,
        };

        let start = Instant::now();
        let outcome = wait_for(&ep, &policy);

        assert_eq!(outcome, WaitOutcome::Reachable { attempts: 1 });
        // A 5s interval would show up here if success slept.
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn unreachable_spends_exactly_the_budget() {
        let ep = Endpoint::new("127.0.0.1", closed_port());
        let outcome = wait_for(&ep, &fast_policy(5));
        assert_eq!(outcome, WaitOutcome::TimedOut { attempts: 5 });
    }

    #[test]
    fn zero_budget_times_out_immediately() {
        let ep = Endpoint::new("127.0.0.1", closed_port());
        let outcome = wait_for(&ep, &fast_policy(0));
        assert_eq!(outcome, WaitOutcome::TimedOut { attempts: 0 });
    }

    #[test]
    fn unresolvable_host_counts_as_failure() {
        let ep = Endpoint::new("host.invalid", 5432);
        let outcome = wait_for(&ep, &fast_policy(2));
        assert_eq!(outcome, WaitOutcome::TimedOut { attempts: 2 });
    }

    #[test]
    fn await_all_sequential_preserves_order() {
        let (_listener, up) = open_port();
        let down = closed_port();
        let endpoints = vec![
            Endpoint::new("127.0.0.1", up),
            Endpoint::new("127.0.0.1", down),
        ];

        let outcomes = await_all(&endpoints, &fast_policy(2), WaitStrategy::Sequential);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].0, endpoints[0]);
        assert!(outcomes[0].1.is_reachable());
        assert_eq!(outcomes[1].0, endpoints[1]);
        assert!(!outcomes[1].1.is_reachable());
    }

    #[test]
    fn await_all_parallel_returns_every_outcome() {
        let (_a, up_a) = open_port();
        let (_b, up_b) = open_port();
        let endpoints = vec![
            Endpoint::new("127.0.0.1", up_a),
            Endpoint::new("127.0.0.1", up_b),
            Endpoint::new("127.0.0.1", closed_port()),
        ];

        let outcomes = await_all(&endpoints, &fast_policy(2), WaitStrategy::Parallel);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes.iter().filter(|(_, o)| o.is_reachable()).count(), 2);
    }

    #[test]
    fn readiness_skipped_outside_development() {
        // An unreachable endpoint with a long budget: only reachable if the
        // phase is actually skipped.
        let cfg = Config {
            development: false,
            wait_for: vec![Endpoint::new("127.0.0.1", closed_port())],
            sleep: 30.0,
            tries: 60,
            ..Config::default()
        };

        let start = Instant::now();
        assert!(run_readiness(&cfg).is_ok());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn readiness_continues_after_timeout_by_default() {
        let cfg = Config {
            development: true,
            wait_for: vec![Endpoint::new("127.0.0.1", closed_port())],
            sleep: 0.0,
            tries: 2,
            ..Config::default()
        };
        assert!(run_readiness(&cfg).is_ok());
    }

    #[test]
    fn readiness_aborts_on_timeout_when_configured() {
        let cfg = Config {
            development: true,
            on_timeout: OnTimeout::Abort,
            wait_for: vec![Endpoint::new("127.0.0.1", closed_port())],
            sleep: 0.0,
            tries: 2,
            ..Config::default()
        };

        let err = run_readiness(&cfg).unwrap_err();
        assert!(err.to_string().contains("unreachable"));
    }
}
