use std::path::Path;

use anyhow::{Context, Result, bail};

use super::types::Config;

/// Dotfile read from the working directory, when present.
pub const CONFIG_FILE: &str = ".readyrunrc";

/// Build the configuration snapshot for this invocation.
///
/// Values come from `.readyrunrc` in `dir` (absent file means pure
/// defaults), then environment variables override on top.
pub fn load(dir: &Path) -> Result<Config> {
    let mut cfg = load_file(dir)?.unwrap_or_default();
    apply_env(&mut cfg, |name| std::env::var(name).ok())?;
    validate(&cfg)?;
    Ok(cfg)
}

fn load_file(dir: &Path) -> Result<Option<Config>> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let cfg = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(cfg))
}

/// Apply environment overrides through `get`, so tests can substitute a map
/// for the process environment.
///
/// `DEVELOPMENT` and `CI` are presence signals: any value, including the
/// empty string, enables them.
pub fn apply_env(cfg: &mut Config, get: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(v) = get("PORT") {
        cfg.port = v
            .parse()
            .with_context(|| format!("PORT must be a TCP port number, got {v:?}"))?;
    }
    if let Some(v) = get("SLEEP") {
        cfg.sleep = v
            .parse()
            .with_context(|| format!("SLEEP must be a number of seconds, got {v:?}"))?;
    }
    if let Some(v) = get("TRIES") {
        cfg.tries = v
            .parse()
            .with_context(|| format!("TRIES must be a non-negative integer, got {v:?}"))?;
    }
    if let Some(v) = get("WAIT_FOR") {
        cfg.wait_for = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<super::Endpoint>())
            .collect::<Result<Vec<_>>>()
            .context("invalid WAIT_FOR endpoint list")?;
    }
    if let Some(v) = get("ON_TIMEOUT") {
        cfg.on_timeout = v.parse().context("invalid ON_TIMEOUT")?;
    }
    if let Some(v) = get("WAIT_STRATEGY") {
        cfg.wait_strategy = v.parse().context("invalid WAIT_STRATEGY")?;
    }
    cfg.development = cfg.development || get("DEVELOPMENT").is_some();
    cfg.ci = cfg.ci || get("CI").is_some();
    Ok(())
}

fn validate(cfg: &Config) -> Result<()> {
    if !cfg.sleep.is_finite() || cfg.sleep < 0.0 {
        bail!(
            "sleep interval must be a non-negative number of seconds, got {}",
            cfg.sleep
        );
    }
    Ok(())
}
