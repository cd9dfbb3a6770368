// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker session provider, driven through the `docker` CLI

use super::{LogStream, ProviderError, SessionProvider, SessionSpec};
use crate::subprocess::{
    run_with_timeout, SubprocessError, DOCKER_RUN_TIMEOUT, DOCKER_STOP_TIMEOUT, DOCKER_TIMEOUT,
    STOP_GRACE_SECS,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tb_core::ExecOutcome;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Mount point of the per-terminal log directory inside the container
pub const CONTAINER_LOG_DIR: &str = "/tmp/logs";

/// Exit status the docker CLI uses for its own failures (as opposed to the
/// exit status of the command run inside the container)
const DOCKER_CLI_FAILURE: i32 = 125;

/// CPU scheduler period used with `--cpu-quota`
const CPU_PERIOD_US: u64 = 100_000;

/// Docker-based session provider
#[derive(Clone, Debug)]
pub struct DockerProvider {
    binary: String,
    network: String,
}

impl Default for DockerProvider {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            network: "bridge".to_string(),
        }
    }
}

impl DockerProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different docker-compatible CLI (e.g. `podman`)
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Arguments for `docker run` that start a detached, resource-limited session.
    ///
    /// `-i` keeps stdin open so an interactive entry command such as `bash`
    /// stays alive without a TTY.
    pub(crate) fn run_args(&self, spec: &SessionSpec) -> Vec<String> {
        let cpu_quota = CPU_PERIOD_US * u64::from(spec.limits.cpu_percent) / 100;
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "-i".to_string(),
            "--name".to_string(),
            format!("tb-{}", spec.name),
            "--network".to_string(),
            self.network.clone(),
            "--memory".to_string(),
            format!("{}m", spec.limits.memory_mb),
            "--cpu-period".to_string(),
            CPU_PERIOD_US.to_string(),
            "--cpu-quota".to_string(),
            cpu_quota.to_string(),
            "-v".to_string(),
            format!("{}:{}:rw", spec.log_dir.display(), CONTAINER_LOG_DIR),
        ];
        for (key, value) in &spec.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push(spec.image.clone());
        args.push("sh".to_string());
        args.push("-c".to_string());
        args.push(entry_script(&spec.command));
        args
    }

    /// Check that a container exists; errors if docker does not know it.
    async fn inspect(&self, handle: &str) -> Result<(), ProviderError> {
        let mut cmd = self.command();
        cmd.args(["inspect", "--format", "{{.State.Running}}", handle]);
        let output = run_with_timeout(cmd, DOCKER_TIMEOUT, "docker inspect")
            .await
            .map_err(from_subprocess)?;
        if !output.status.success() {
            return Err(classify("docker inspect", &output.stderr));
        }
        Ok(())
    }
}

/// Shell script run as the container's entry point: prints a banner, records
/// the start in the persisted session log, then hands over to `command`.
///
/// Identity values come from the injected environment rather than being
/// interpolated into the script.
pub(crate) fn entry_script(command: &str) -> String {
    format!(
        "echo '=== Agent Terminal Started ==='; \
         echo \"Agent ID: $AGENT_ID\"; \
         echo \"Terminal ID: $TERMINAL_ID\"; \
         echo \"Timestamp: $(date)\"; \
         echo \"Working Directory: $(pwd)\"; \
         echo \"User: $(whoami)\"; \
         echo; \
         echo 'Terminal ready for commands'; \
         echo \"$(date): Terminal $TERMINAL_ID started\" >> \"$LOG_DIR/session.log\"; \
         {}",
        command
    )
}

fn from_subprocess(err: SubprocessError) -> ProviderError {
    match err {
        SubprocessError::TimedOut { timeout, .. } => ProviderError::Timeout(timeout),
        e if e.is_missing_binary() => {
            ProviderError::Unavailable(format!("container engine CLI not found ({})", e))
        }
        e => ProviderError::Unavailable(e.to_string()),
    }
}

fn is_daemon_unreachable(stderr: &str) -> bool {
    [
        "Cannot connect to the Docker daemon",
        "Is the docker daemon running",
        "error during connect",
    ]
    .iter()
    .any(|pattern| stderr.contains(pattern))
}

fn is_missing_container(stderr: &str) -> bool {
    stderr.contains("No such container")
}

/// Map a failed docker invocation to a provider error
pub(crate) fn classify(description: &str, stderr: &[u8]) -> ProviderError {
    let stderr = String::from_utf8_lossy(stderr);
    let message = format!("{}: {}", description, stderr.trim());
    if is_daemon_unreachable(&stderr) {
        ProviderError::Unavailable(message)
    } else {
        ProviderError::Rejected(message)
    }
}

#[async_trait]
impl SessionProvider for DockerProvider {
    async fn start(&self, spec: &SessionSpec) -> Result<String, ProviderError> {
        let mut cmd = self.command();
        cmd.args(self.run_args(spec));

        let output = run_with_timeout(cmd, DOCKER_RUN_TIMEOUT, "docker run")
            .await
            .map_err(from_subprocess)?;

        if !output.status.success() {
            return Err(classify("docker run", &output.stderr));
        }

        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if container_id.is_empty() {
            return Err(ProviderError::Rejected(
                "docker run returned no container id".to_string(),
            ));
        }
        Ok(container_id)
    }

    async fn exec(
        &self,
        handle: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecOutcome, ProviderError> {
        let mut cmd = self.command();
        cmd.args(["exec", handle, "sh", "-c", command]);

        let started = Instant::now();
        let output = run_with_timeout(cmd, timeout, "docker exec")
            .await
            .map_err(from_subprocess)?;
        let elapsed = started.elapsed();

        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code == DOCKER_CLI_FAILURE || is_daemon_unreachable(&stderr) {
            return Err(classify("docker exec", &output.stderr));
        }

        Ok(ExecOutcome::new(
            String::from_utf8_lossy(&output.stdout),
            stderr,
            exit_code,
            elapsed,
        ))
    }

    async fn tail_logs(&self, handle: &str, lines: u32) -> Result<String, ProviderError> {
        let mut cmd = self.command();
        let tail = lines.to_string();
        cmd.args(["logs", "--timestamps", "--tail", tail.as_str(), handle]);

        let output = run_with_timeout(cmd, DOCKER_TIMEOUT, "docker logs")
            .await
            .map_err(from_subprocess)?;
        if !output.status.success() {
            return Err(classify("docker logs", &output.stderr));
        }

        // docker replays the container's stderr on its own stderr
        let mut logs = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            logs.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        Ok(logs)
    }

    async fn stream_logs(&self, handle: &str) -> Result<LogStream, ProviderError> {
        self.inspect(handle).await?;

        let mut cmd = self.command();
        cmd.args(["logs", "--follow", "--timestamps", "--tail", "0", handle])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| ProviderError::Unavailable(format!("docker logs failed: {}", e)))?;
        let stdout = child.stdout.take().ok_or_else(|| {
            ProviderError::Rejected("docker logs produced no output pipe".to_string())
        })?;

        let stream = async_stream::stream! {
            // Keeps the follower process alive until the stream is dropped
            let _child = child;
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => yield Ok(line),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(ProviderError::Rejected(format!("log stream read failed: {}", e)));
                        break;
                    }
                }
            }
        };
        Ok(stream.boxed())
    }

    async fn stop(&self, handle: &str) -> Result<(), ProviderError> {
        let grace = STOP_GRACE_SECS.to_string();
        let mut cmd = self.command();
        cmd.args(["stop", "-t", grace.as_str(), handle]);
        let output = run_with_timeout(cmd, DOCKER_STOP_TIMEOUT, "docker stop")
            .await
            .map_err(from_subprocess)?;
        if !output.status.success() {
            if is_missing_container(&String::from_utf8_lossy(&output.stderr)) {
                tracing::debug!(handle, "container already gone");
                return Ok(());
            }
            return Err(classify("docker stop", &output.stderr));
        }

        let mut cmd = self.command();
        cmd.args(["rm", handle]);
        let output = run_with_timeout(cmd, DOCKER_TIMEOUT, "docker rm")
            .await
            .map_err(from_subprocess)?;
        if !output.status.success() && !is_missing_container(&String::from_utf8_lossy(&output.stderr))
        {
            return Err(classify("docker rm", &output.stderr));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
