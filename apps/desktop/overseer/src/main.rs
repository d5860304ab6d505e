use overseer::app::{Launch, build_runtime, launch};
use overseer::error::OverseerError;
use overseer::logger::initialize as LoggerInitialize;
use overseer::paths::{config_dir, ensure_dir, log_dir};
use overseer::settings::load_instance_config;

use std::process::ExitCode;

use log::{error, info, warn};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Overseer failed to start: {e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), OverseerError> {
    let log_dir = log_dir()?;
    ensure_dir(&log_dir)?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir)?;

    info!("Overseer starting");
    info!("Log directory: {}", log_dir.display());

    let config = match config_dir() {
        Ok(dir) => load_instance_config(&dir),
        Err(e) => {
            warn!("{e}; using default instance config");
            Default::default()
        }
    };

    let runtime = build_runtime()?;

    match launch(&runtime, &config) {
        Launch::Secondary => {
            info!("Exiting secondary instance");
        }
        Launch::Primary(app) => {
            let executed = app.run(&runtime, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl-C: {e}");
                    std::future::pending::<()>().await;
                }
            });
            info!("Overseer exiting after {executed} UI task(s)");
        }
    }

    Ok(())
}
