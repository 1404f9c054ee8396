use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use readyrun::config;
use readyrun::dispatch;
use readyrun::exec::ExecError;
use readyrun::wait;

/// Wait for service dependencies, then dispatch a run mode.
///
/// Recognized modes: web, web-dev, worker, test, bash. Any other first
/// token runs verbatim with the remaining arguments.
#[derive(Parser)]
#[command(name = "readyrun", version)]
struct Cli {
    /// Mode name followed by any extra arguments.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "MODE [ARGS]..."
    )]
    command: Vec<String>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli.command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            error!("{err:#}");
            // Propagate a failed step's own exit code where we have one.
            let code = err
                .downcast_ref::<ExecError>()
                .map(ExecError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

fn run(args: &[String]) -> Result<i32> {
    let cwd = std::env::current_dir()?;
    let cfg = config::load(&cwd)?;
    wait::run_readiness(&cfg)?;
    dispatch::dispatch(&cfg, args)
}

/// Logs go to stderr so the dispatched child owns stdout.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("readyrun=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
