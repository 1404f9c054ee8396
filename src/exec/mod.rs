// Process execution: run steps to completion, or hand the process over.

use std::io;
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::{debug, info};

/// Execution failures that carry an exit code worth propagating.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("command is empty")]
    EmptyCommand,
    #[error("{label} step exited with code {code}")]
    StepFailed { label: String, code: i32 },
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    /// Exit code the orchestrator should terminate with for this failure.
    ///
    /// Step failures propagate the child's own code; launch failures use
    /// the shell's 127 convention.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecError::StepFailed { code, .. } => *code,
            ExecError::EmptyCommand => 2,
            ExecError::Spawn { .. } => 127,
        }
    }
}

/// Run `argv` to completion with inherited stdio, failing on non-zero exit.
pub fn run_step(label: &str, argv: &[String]) -> Result<(), ExecError> {
    let code = run_status(label, argv)?;
    if code != 0 {
        return Err(ExecError::StepFailed {
            label: label.to_string(),
            code,
        });
    }
    Ok(())
}

/// Run `argv` to completion with inherited stdio and report its exit code.
pub fn run_status(label: &str, argv: &[String]) -> Result<i32, ExecError> {
    let (program, rest) = argv.split_first().ok_or(ExecError::EmptyCommand)?;
    debug!("running {label} step: {}", shell_words::join(argv));

    let status = Command::new(program)
        .args(rest)
        .status()
        .map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;
    Ok(exit_code(status))
}

/// Replace the current process with `argv`.
///
/// On Unix this is a true `exec`: stdio and the exit code observed by the
/// supervisor belong to the child, and the call only returns on launch
/// failure. Elsewhere the child is spawned with inherited stdio, awaited,
/// and its exit code returned for the caller to terminate with.
pub fn replace(argv: &[String]) -> Result<i32, ExecError> {
    let (program, rest) = argv.split_first().ok_or(ExecError::EmptyCommand)?;
    info!("handing off to {}", shell_words::join(argv));

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;

        let source = Command::new(program).args(rest).exec();
        Err(ExecError::Spawn {
            program: program.clone(),
            source,
        })
    }

    #[cfg(not(unix))]
    {
        let status = Command::new(program)
            .args(rest)
            .status()
            .map_err(|source| ExecError::Spawn {
                program: program.clone(),
                source,
            })?;
        Ok(exit_code(status))
    }
}

/// Map an exit status to a code, `128 + signal` for signal deaths.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn run_status_reports_zero_for_success() {
        assert_eq!(run_status("ok", &argv(&["true"])).unwrap(), 0);
    }

    #[test]
    fn run_status_reports_the_child_code() {
        let code = run_status("exit7", &argv(&["sh", "-c", "exit 7"])).unwrap();
        assert_eq!(code, 7);
    }

    #[test]
    fn run_step_fails_on_non_zero_exit() {
        let err = run_step("migrate", &argv(&["sh", "-c", "exit 3"])).unwrap_err();
        match &err {
            ExecError::StepFailed { label, code } => {
                assert_eq!(label, "migrate");
                assert_eq!(*code, 3);
            }
            other => panic!("expected StepFailed, got {other:?}"),
        }
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = run_status("nope", &argv(&["readyrun-no-such-program"])).unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn empty_argv_is_rejected() {
        let err = run_status("empty", &[]).unwrap_err();
        assert!(matches!(err, ExecError::EmptyCommand));
    }

    #[cfg(unix)]
    #[test]
    fn signal_death_maps_to_128_plus_signal() {
        let code = run_status("sig", &argv(&["sh", "-c", "kill -TERM $$"])).unwrap();
        assert_eq!(code, 128 + 15);
    }
}
