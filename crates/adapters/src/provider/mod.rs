// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Isolated execution providers backing terminal sessions

mod docker;
mod noop;

pub use docker::{DockerProvider, CONTAINER_LOG_DIR};
pub use noop::NoOpProvider;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProvider, ProviderCall, ProviderOp};

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::path::PathBuf;
use std::time::Duration;
use tb_core::{ExecOutcome, ResourceLimits};
use thiserror::Error;

/// Errors from provider operations.
///
/// All variants are transient from the orchestrator's point of view: they
/// are surfaced to the caller, who decides whether to retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The engine cannot be reached at all
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// The engine refused the operation
    #[error("provider error: {0}")]
    Rejected(String),
    /// The operation did not finish within its bound
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Everything needed to start one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSpec {
    /// Unique name for the execution unit (derived from the terminal id)
    pub name: String,
    pub image: String,
    /// Entry command run after the startup banner
    pub command: String,
    pub env: Vec<(String, String)>,
    pub limits: ResourceLimits,
    /// Host directory bound into the session for persisted output
    pub log_dir: PathBuf,
}

/// Live output lines from a session.
///
/// Infinite until the session ends; dropping the stream cancels the
/// underlying subscription. Not restartable.
pub type LogStream = BoxStream<'static, Result<String, ProviderError>>;

/// Adapter for an isolated execution engine (docker, etc.)
#[async_trait]
pub trait SessionProvider: Clone + Send + Sync + 'static {
    /// Start a session, returning its handle
    async fn start(&self, spec: &SessionSpec) -> Result<String, ProviderError>;

    /// Run a command inside a session, bounded by `timeout`
    async fn exec(
        &self,
        handle: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecOutcome, ProviderError>;

    /// Up to `lines` most recent lines of session output
    async fn tail_logs(&self, handle: &str, lines: u32) -> Result<String, ProviderError>;

    /// Follow session output from now on
    async fn stream_logs(&self, handle: &str) -> Result<LogStream, ProviderError>;

    /// Stop and remove a session. A session that is already gone counts as stopped.
    async fn stop(&self, handle: &str) -> Result<(), ProviderError>;
}
