use serde::{Deserialize, Serialize};

/// Run behavior selected from the first CLI token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Web,
    WebDev,
    Worker,
    Test,
    Shell,
    /// Unrecognized token: the whole argument list runs verbatim.
    Passthrough,
}

impl Mode {
    /// Map a mode token. Anything unknown is the passthrough fallback, by
    /// design not an error.
    pub fn parse(token: &str) -> Self {
        match token {
            "web" => Mode::Web,
            "web-dev" => Mode::WebDev,
            "worker" => Mode::Worker,
            "test" => Mode::Test,
            "bash" => Mode::Shell,
            _ => Mode::Passthrough,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Web => "web",
            Mode::WebDev => "web-dev",
            Mode::Worker => "worker",
            Mode::Test => "test",
            Mode::Shell => "bash",
            Mode::Passthrough => "passthrough",
        }
    }
}

/// A preparatory command run to completion before the final handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub label: &'static str,
    pub argv: Vec<String>,
}

/// What a mode resolves to. Building one performs no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Run `steps` in order (any failure aborts with that step's code),
    /// print `hint` if set, then replace the process with `handoff`.
    Exec {
        hint: Option<&'static str>,
        steps: Vec<Step>,
        handoff: Vec<String>,
    },
    /// Run the coverage/test sequence and exit with the suite's status.
    TestPipeline,
}

/// JSON summary of one test-pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub steps: Vec<StepRecord>,
    pub suite_exit_code: i32,
    pub ci: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub label: String,
    pub status: String,
}

impl StepRecord {
    pub fn pass(label: &str) -> Self {
        Self {
            label: label.to_string(),
            status: "pass".to_string(),
        }
    }

    pub fn fail(label: &str) -> Self {
        Self {
            label: label.to_string(),
            status: "fail".to_string(),
        }
    }

    pub fn skipped(label: &str) -> Self {
        Self {
            label: label.to_string(),
            status: "skipped".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tokens_map_to_their_modes() {
        assert_eq!(Mode::parse("web"), Mode::Web);
        assert_eq!(Mode::parse("web-dev"), Mode::WebDev);
        assert_eq!(Mode::parse("worker"), Mode::Worker);
        assert_eq!(Mode::parse("test"), Mode::Test);
        assert_eq!(Mode::parse("bash"), Mode::Shell);
    }

    #[test]
    fn unknown_tokens_fall_through_to_passthrough() {
        assert_eq!(Mode::parse("psql"), Mode::Passthrough);
        assert_eq!(Mode::parse("WEB"), Mode::Passthrough);
        assert_eq!(Mode::parse(""), Mode::Passthrough);
    }

    #[test]
    fn report_serializes_step_statuses() {
        let report = RunReport {
            steps: vec![
                StepRecord::pass("coverage-erase"),
                StepRecord::fail("test-suite"),
                StepRecord::skipped("coverage-upload"),
            ],
            suite_exit_code: 1,
            ci: true,
        };

        let json = serde_json::to_string(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.steps.len(), 3);
        assert_eq!(parsed.steps[1].status, "fail");
        assert_eq!(parsed.suite_exit_code, 1);
    }
}
