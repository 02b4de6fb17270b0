#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod startup;
mod telemetry;

use std::process;

use uuid::Uuid;

use crate::config::Cli;
use crate::startup::StartupError;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "puller_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "puller_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "puller_cli::config";

#[tokio::main]
async fn main() {
    let cli = match Cli::init() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            process::exit(StartupError::CONFIG_EXIT_CODE);
        }
    };

    if let Err(err) = telemetry::init_tracing(cli.runtime.log_json) {
        eprintln!("Error: {err:#}");
        process::exit(StartupError::CONFIG_EXIT_CODE);
    }

    let Err(error) = run(cli).await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    tracing::error!(
        target: TRACING_TARGET_SHUTDOWN,
        error = %error,
        stage = error.stage(),
        exit_code = error.exit_code(),
        "application terminated with error"
    );

    if let Some(suggestion) = error.suggestion() {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            suggestion,
            "Recovery suggestion"
        );
    }

    process::exit(error.exit_code());
}

/// Main application entry point.
async fn run(cli: Cli) -> Result<(), StartupError> {
    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        instance_id = %Uuid::now_v7(),
        "starting file puller"
    );

    cli.log();
    cli.validate().map_err(StartupError::Config)?;

    startup::run(cli).await
}
