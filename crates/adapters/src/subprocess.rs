// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Timeout for short docker control commands (inspect, rm, logs --tail).
pub const DOCKER_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for `docker run`, which may need to create the container filesystem.
pub const DOCKER_RUN_TIMEOUT: Duration = Duration::from_secs(120);

/// Grace period handed to `docker stop` before the engine kills the container.
pub const STOP_GRACE_SECS: u64 = 10;

/// Timeout for `docker stop`; covers the grace period plus engine overhead.
pub const DOCKER_STOP_TIMEOUT: Duration = Duration::from_secs(STOP_GRACE_SECS + 20);

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{description} failed: {source}")]
    Spawn {
        description: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{description} timed out after {}s", .timeout.as_secs())]
    TimedOut {
        description: String,
        timeout: Duration,
    },
}

impl SubprocessError {
    /// The program itself could not be found on PATH
    pub fn is_missing_binary(&self) -> bool {
        matches!(self, Self::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`. The child is
/// killed when the timeout elapses because the command is marked
/// `kill_on_drop`.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, SubprocessError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(SubprocessError::Spawn {
            description: description.to_string(),
            source,
        }),
        Err(_elapsed) => Err(SubprocessError::TimedOut {
            description: description.to_string(),
            timeout,
        }),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
