// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! termbridge daemon (tbd)
//!
//! Owns the terminal registry and serves agent requests over TCP.
//!
//! Architecture:
//! - Listener Task: accepts connections, one task per connection
//! - Sweeper Task: reclaims expired terminals on a fixed interval
//! - Main: waits for a shutdown signal, then stops both

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod env;
mod lifecycle;
mod listener;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tb_adapters::{DockerProvider, NoOpProvider, SessionProvider};
use tb_daemon::PROTOCOL_VERSION;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, ProviderKind};
use crate::lifecycle::{LifecycleError, StartupResult};
use crate::listener::{ListenCtx, Listener};

/// How long background tasks get to finish after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config loading
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("tbd {}", PROTOCOL_VERSION);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("tbd {}", PROTOCOL_VERSION);
                println!("termbridge daemon - provisions isolated, time-bounded terminals for agents");
                println!();
                println!("USAGE:");
                println!("    tbd");
                println!();
                println!("Configuration comes from the TOML file named by TB_CONFIG and from");
                println!("TB_* environment variables. TB_TOKEN_SECRET is required.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: tbd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    rotate_log_if_needed(&config.log_path);

    // Write startup marker to log (before tracing setup)
    write_startup_marker(&config)?;

    let log_guard = setup_logging(&config)?;

    info!(provider = ?config.provider, "starting daemon");

    let result = match config.provider {
        ProviderKind::Docker => {
            let provider = DockerProvider::new()
                .with_binary(config.docker_binary.clone())
                .with_network(config.docker_network.clone());
            run(&config, provider).await
        }
        ProviderKind::Noop => run(&config, NoOpProvider::new()).await,
    };

    if let Err(e) = result {
        // Write error synchronously (tracing is non-blocking and may not flush in time)
        write_startup_error(&config, &e);
        error!("daemon failed: {}", e);
        drop(log_guard);
        return Err(e.into());
    }
    info!("daemon stopped");
    Ok(())
}

/// Serve requests with `provider` until SIGTERM or SIGINT
async fn run<P: SessionProvider>(config: &Config, provider: P) -> Result<(), LifecycleError> {
    let StartupResult {
        manager,
        gateway,
        verifier,
        sweeper,
        listener: socket,
    } = lifecycle::startup(config, provider).await?;

    let shutdown = CancellationToken::new();
    let ctx = Arc::new(ListenCtx {
        manager,
        gateway,
        verifier,
        shutdown: shutdown.clone(),
    });
    let listener_task = tokio::spawn(Listener::new(socket, ctx).run());
    let sweeper_task = tokio::spawn(sweeper.run(shutdown.clone()));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(addr = %config.listen_addr, "daemon ready");

    // Signal ready for parent process (e.g., systemd, test harness)
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    // Sessions are left running; only the background tasks stop here
    shutdown.cancel();
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = listener_task.await;
        let _ = sweeper_task.await;
    })
    .await;
    if drained.is_err() {
        warn!("background tasks did not stop within the grace period");
    }
    Ok(())
}

/// Rotate the daemon log once it exceeds this size
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Rotated copies kept beside the live log (`daemon.log.1` .. `.3`)
const MAX_ROTATIONS: u32 = 3;

/// Shift `log` to `log.1` (and older copies up by one) when it is too large.
///
/// Best effort: rotation failures never block startup.
fn rotate_log_if_needed(log: &Path) {
    let Ok(meta) = std::fs::metadata(log) else {
        return;
    };
    if meta.len() <= MAX_LOG_SIZE {
        return;
    }

    let rotated = |n: u32| {
        let mut name = log.as_os_str().to_owned();
        name.push(format!(".{}", n));
        std::path::PathBuf::from(name)
    };

    let _ = std::fs::remove_file(rotated(MAX_ROTATIONS));
    for n in (1..MAX_ROTATIONS).rev() {
        let from = rotated(n);
        if from.exists() {
            let _ = std::fs::rename(&from, rotated(n + 1));
        }
    }
    let _ = std::fs::rename(log, rotated(1));
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- tbd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- tbd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
