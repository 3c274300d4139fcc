//! Orders - service entry point
//!
//! This is the main entry point for the orders service.

use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info};

use orders::{
    api::create_router,
    config::Config,
    error::LifecycleError,
    lifecycle::{Coordinator, ShutdownReport},
    utils::{init_tracing, ShutdownSignals},
};

/// Logs completion when dropped, whichever way `run` returns
struct CompletionLog;

impl Drop for CompletionLog {
    fn drop(&mut self) {
        info!(main = "completed", "shutdown");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // No logger yet, so stderr is the only place to report this
    if let Err(e) = init_tracing(&config) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(report) => {
            if !report.is_graceful() {
                info!(signal = %report.termination, "Shutdown completed after forcing the listener closed");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let message = format!("{:#}", e);
            error!(error = %message, "startup");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<ShutdownReport> {
    let address = config.address();
    info!(
        main = "started",
        version = env!("CARGO_PKG_VERSION"),
        address = address.as_deref().unwrap_or("disabled"),
        "startup"
    );
    let _completed = CompletionLog;

    let coordinator = Coordinator::from_config(&config)?;

    // Register before waiting so an early signal is not lost
    let mut signals = ShutdownSignals::register().map_err(LifecycleError::Signals)?;

    let report = coordinator
        .run(create_router(), signals.recv())
        .await
        .context("running http listener")?;

    signals.close();
    Ok(report)
}
