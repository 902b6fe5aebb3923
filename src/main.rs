//! CLI entry point for the simtemp conformance harness.
//!
//! Subcommands:
//! - `show` — print the current configuration attributes and statistics.
//! - `set <attr> <value>` — write one configuration attribute.
//! - `watch` — print samples live until Ctrl+C.
//! - `test [--case tpN]` — run the conformance suite, or a single case.
//!
//! Exit codes: 0 = PASS, 1 = FAIL, 2 = usage error or fatal precondition
//! failure.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use simtemp_harness::checks;
use simtemp_harness::config::HarnessConfig;
use simtemp_harness::monitor;
use simtemp_harness::suite::{Suite, TestContext};
use simtemp_harness::sysfs::{
    ConfigPort, ATTR_MODE, ATTR_SAMPLING_MS, ATTR_STATS, ATTR_THRESHOLD_MC,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simtemp-harness")]
#[command(about = "Conformance and stress-test harness for the simtemp driver", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the character device node path.
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    /// Override the sysfs attribute directory.
    #[arg(long, global = true)]
    sysfs: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print current configuration and statistics
    Show,

    /// Write one configuration attribute (sampling_ms, threshold_mc, mode)
    Set {
        /// Attribute name
        attr: String,
        /// Value to write
        value: String,
    },

    /// Watch and print samples until Ctrl+C
    Watch,

    /// Run the conformance suite, or a single case with --case
    Test {
        /// Single case to run (tp1..tp6 or full name)
        #[arg(long)]
        case: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => HarnessConfig::default(),
    };
    if let Some(device) = cli.device {
        config.paths.device = device;
    }
    if let Some(sysfs) = cli.sysfs {
        config.paths.sysfs = sysfs;
    }

    match cli.command {
        Commands::Show => {
            show(&config);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Set { attr, value } => {
            warn_if_unprivileged();
            set_attribute(&config, &attr, &value)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Watch => {
            monitor::watch(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Test { case } => run_tests(config, case).await,
    }
}

fn show(config: &HarnessConfig) {
    let port = ConfigPort::new(config.paths.clone());
    println!("--- Current Configuration ---");
    let display = |value: simtemp_harness::error::HarnessResult<String>| match value {
        Ok(v) => v,
        Err(_) => "<error reading>".into(),
    };
    println!(
        "Sampling period (ms): {}",
        display(port.get_string(ATTR_SAMPLING_MS))
    );
    println!(
        "Alert threshold (mC): {}",
        display(port.get_string(ATTR_THRESHOLD_MC))
    );
    println!("Simulation mode     : {}", display(port.get_string(ATTR_MODE)));
    println!("Statistics          : {}", display(port.get_string(ATTR_STATS)));
}

fn set_attribute(config: &HarnessConfig, attr: &str, value: &str) -> Result<()> {
    if ![ATTR_SAMPLING_MS, ATTR_THRESHOLD_MC, ATTR_MODE].contains(&attr) {
        bail!("unknown or read-only attribute '{attr}' (writable: sampling_ms, threshold_mc, mode)");
    }
    let port = ConfigPort::new(config.paths.clone());
    port.set_string(attr, value)?;
    println!("{attr} = {}", port.get_string(attr)?);
    Ok(())
}

async fn run_tests(config: HarnessConfig, case: Option<String>) -> Result<ExitCode> {
    let suite = match &case {
        Some(name) => {
            let case = checks::case_by_name(name)
                .with_context(|| format!("unknown test case '{name}' (expected tp1..tp6)"))?;
            Suite::with_cases(vec![case])
        }
        None => Suite::standard(),
    };

    // Precondition failures surface here as fatal errors, not a test FAIL.
    let ctx = Arc::new(TestContext::new(config));
    let report = suite.run(ctx).await?;
    print!("{}", report.summary());
    if report.all_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

fn warn_if_unprivileged() {
    if !nix::unistd::Uid::effective().is_root() {
        warn!("not running as root; sysfs writes may fail");
    }
}
