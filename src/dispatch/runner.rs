use anyhow::{Context, Result};
use tracing::info;

use super::commands;
use super::types::{Mode, Plan, RunReport, Step, StepRecord};
use crate::config::Config;
use crate::exec;

/// Hint printed before the interactive-shell handoff.
const SHELL_HINT: &str = "For faster test feedback, install pytest-watch and run `ptw`.";

/// Resolve a mode plus the full argument list into a plan. Pure: nothing is
/// spawned, printed, or logged here.
pub fn plan_for(mode: Mode, cfg: &Config, args: &[String]) -> Result<Plan> {
    let plan = match mode {
        Mode::Web => Plan::Exec {
            hint: None,
            steps: vec![Step {
                label: "migrate",
                argv: commands::migrate(cfg)?,
            }],
            handoff: commands::serve(cfg)?,
        },
        // The dev server migrates first too, and its migration fails closed
        // just like production.
        Mode::WebDev => Plan::Exec {
            hint: None,
            steps: vec![Step {
                label: "migrate",
                argv: commands::migrate(cfg)?,
            }],
            handoff: commands::serve_dev(cfg)?,
        },
        Mode::Worker => Plan::Exec {
            hint: None,
            steps: Vec::new(),
            handoff: commands::worker(cfg)?,
        },
        Mode::Test => Plan::TestPipeline,
        Mode::Shell => Plan::Exec {
            hint: Some(SHELL_HINT),
            steps: Vec::new(),
            handoff: commands::shell(&args[1..]),
        },
        Mode::Passthrough => Plan::Exec {
            hint: None,
            steps: Vec::new(),
            handoff: args.to_vec(),
        },
    };
    Ok(plan)
}

/// Resolve and run the mode named by `args[0]`.
///
/// Returns the exit code to terminate with. On Unix the `Exec` arm only
/// returns on failure: a successful handoff replaces the process image and
/// never comes back.
pub fn dispatch(cfg: &Config, args: &[String]) -> Result<i32> {
    let Some(token) = args.first() else {
        anyhow::bail!("no mode supplied");
    };
    let mode = Mode::parse(token);
    info!("dispatching {} mode", mode.as_str());

    match plan_for(mode, cfg, args)? {
        Plan::Exec {
            hint,
            steps,
            handoff,
        } => {
            for step in &steps {
                exec::run_step(step.label, &step.argv)?;
            }
            if let Some(hint) = hint {
                println!("{hint}");
            }
            Ok(exec::replace(&handoff)?)
        }
        Plan::TestPipeline => run_test_pipeline(cfg),
    }
}

/// Fixed coverage/test sequence for `test` mode.
///
/// The reporting branch is chosen once from the configuration snapshot:
/// machine-readable XML plus upload under a CI signal, the human summary
/// otherwise. Exactly one branch runs per invocation. A failing suite still
/// gets its branch's report for diagnostics, but the upload is success-only,
/// and the suite's status is always the final status.
fn run_test_pipeline(cfg: &Config) -> Result<i32> {
    let mut report = RunReport {
        ci: cfg.ci,
        ..RunReport::default()
    };

    // Reset instrumentation first; its failure aborts the whole pipeline.
    exec::run_step("coverage-erase", &commands::coverage_erase(cfg)?)?;
    report.steps.push(StepRecord::pass("coverage-erase"));

    let suite_code = exec::run_status("test-suite", &commands::test_suite(cfg)?)?;
    let suite_passed = suite_code == 0;
    report.suite_exit_code = suite_code;
    report.steps.push(if suite_passed {
        StepRecord::pass("test-suite")
    } else {
        StepRecord::fail("test-suite")
    });

    if cfg.ci {
        exec::run_step("coverage-xml", &commands::coverage_xml(cfg)?)?;
        report.steps.push(StepRecord::pass("coverage-xml"));

        if suite_passed {
            exec::run_step("coverage-upload", &commands::coverage_upload(cfg)?)?;
            report.steps.push(StepRecord::pass("coverage-upload"));
        } else {
            report.steps.push(StepRecord::skipped("coverage-upload"));
        }
    } else {
        exec::run_step("coverage-report", &commands::coverage_report(cfg)?)?;
        report.steps.push(StepRecord::pass("coverage-report"));
    }

    write_report(cfg, &report)?;
    Ok(suite_code)
}

fn write_report(cfg: &Config, report: &RunReport) -> Result<()> {
    let Some(path) = &cfg.report_path else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("failed to write run report to {path}"))?;
    Ok(())
}
