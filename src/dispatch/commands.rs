use anyhow::{Context, Result, bail};

use crate::config::Config;

/// Split a configured command string into argv.
fn split(label: &str, raw: &str) -> Result<Vec<String>> {
    let argv =
        shell_words::split(raw).with_context(|| format!("invalid {label} command: {raw:?}"))?;
    if argv.is_empty() {
        bail!("{label} command is empty");
    }
    Ok(argv)
}

/// Expand the `{port}` placeholder in a serve command.
fn with_port(raw: &str, port: u16) -> String {
    raw.replace("{port}", &port.to_string())
}

pub fn migrate(cfg: &Config) -> Result<Vec<String>> {
    split("migrate", &cfg.migrate_command)
}

pub fn serve(cfg: &Config) -> Result<Vec<String>> {
    split("serve", &with_port(&cfg.serve_command, cfg.port))
}

pub fn serve_dev(cfg: &Config) -> Result<Vec<String>> {
    split("serve-dev", &with_port(&cfg.serve_dev_command, cfg.port))
}

/// Worker command, prefixed by the monitoring wrapper when one is configured.
pub fn worker(cfg: &Config) -> Result<Vec<String>> {
    let mut argv = if cfg.worker_wrapper.trim().is_empty() {
        Vec::new()
    } else {
        split("worker wrapper", &cfg.worker_wrapper)?
    };
    argv.extend(split("worker", &cfg.worker_command)?);
    Ok(argv)
}

pub fn coverage_erase(cfg: &Config) -> Result<Vec<String>> {
    split("coverage-erase", &cfg.coverage_erase_command)
}

pub fn test_suite(cfg: &Config) -> Result<Vec<String>> {
    split("test-suite", &cfg.test_command)
}

pub fn coverage_report(cfg: &Config) -> Result<Vec<String>> {
    split("coverage-report", &cfg.coverage_report_command)
}

pub fn coverage_xml(cfg: &Config) -> Result<Vec<String>> {
    split("coverage-xml", &cfg.coverage_xml_command)
}

pub fn coverage_upload(cfg: &Config) -> Result<Vec<String>> {
    split("coverage-upload", &cfg.coverage_upload_command)
}

/// Handoff for `bash` mode: the extra arguments verbatim, or an interactive
/// shell when none were given.
pub fn shell(extra: &[String]) -> Vec<String> {
    if extra.is_empty() {
        vec!["bash".to_string()]
    } else {
        extra.to_vec()
    }
}
