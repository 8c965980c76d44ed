// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device management daemon (dmd)
//!
//! Background process that runs the command engine and serves local requests.
//!
//! Usage:
//! - `dmd [CONFIG]` runs the daemon
//! - `dmd send [--config CONFIG] REQUEST` sends one JSON request to a running daemon

use std::path::{Path, PathBuf};

use dm_daemon::lifecycle::{self, LifecycleError};
use dm_daemon::{default_config_path, server, DaemonClient, DaemonConfig, Paths, Request};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("send") => send(&args[1..]).await,
        Some(path) => run(PathBuf::from(path)).await,
        None => run(default_config_path()?).await,
    }
}

/// Send a single request to the running daemon and print the response
async fn send(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let (config_path, request) = match args {
        [flag, path, request] if flag == "--config" => (PathBuf::from(path), request),
        [request] => (default_config_path()?, request),
        _ => return Err("usage: dmd send [--config CONFIG] REQUEST".into()),
    };
    let config = DaemonConfig::load(&config_path)?;
    let paths = config.paths()?;

    let request: Request = serde_json::from_str(request)?;
    let response = DaemonClient::connect(&paths.socket_path)?
        .send(request)
        .await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = DaemonConfig::load(&config_path)?;
    let paths = config.paths()?;

    // Write startup marker to log (before tracing setup, so it is never lost)
    write_startup_marker(&paths)?;

    let log_guard = setup_logging(&paths)?;

    info!("Starting dmd with config {}", config_path.display());

    let mut daemon = match lifecycle::startup(&config, &paths).await {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&paths, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("Daemon ready, listening on {}", paths.socket_path.display());

    // Signal ready for a supervising parent process
    println!("READY");

    loop {
        tokio::select! {
            result = daemon.listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        if let Err(e) = server::handle_connection(&mut daemon, stream).await {
                            error!("Error handling connection: {}", e);
                        }
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                }
            }

            result = &mut daemon.engine_task, if !daemon.engine_stopped => {
                daemon.engine_stopped = true;
                let outcome = match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(LifecycleError::from(e)),
                    Err(e) => Err(LifecycleError::Io(std::io::Error::other(e))),
                };
                daemon.shutdown().await?;
                match outcome {
                    Ok(()) => {
                        info!("Engine stopped");
                        break;
                    }
                    Err(e) => {
                        error!("Engine aborted: {}", e);
                        return Err(e.into());
                    }
                }
            }

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                daemon.shutdown().await?;
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                daemon.shutdown().await?;
                break;
            }
        }

        if daemon.shutdown_requested {
            info!("Shutdown requested via IPC, shutting down...");
            daemon.shutdown().await?;
            break;
        }
    }

    info!("Daemon stopped");
    Ok(())
}

/// Startup marker prefix written to the log before anything else.
/// Full format: "--- dmd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- dmd: starting (pid: ";

fn write_startup_marker(paths: &Paths) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = paths.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to the log file
fn write_startup_error(paths: &Paths, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    paths: &Paths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (dir, file) = split_log_path(&paths.log_path)?;
    let file_appender = tracing_appender::rolling::never(dir, file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr), LifecycleError> {
    match (path.parent(), path.file_name()) {
        (Some(dir), Some(file)) => Ok((dir, file)),
        _ => Err(LifecycleError::Config(dm_daemon::ConfigError::NoStateDir)),
    }
}
