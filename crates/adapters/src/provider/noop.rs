// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op provider for when no container engine is configured.

use super::{LogStream, ProviderError, SessionProvider, SessionSpec};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tb_core::ExecOutcome;

/// Provider that starts nothing.
///
/// Sessions are named after the requested unit, commands succeed with no
/// output, and log streams end immediately. Used for dry runs of the daemon
/// and for black-box tests that do not need a container engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpProvider;

impl NoOpProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionProvider for NoOpProvider {
    async fn start(&self, spec: &SessionSpec) -> Result<String, ProviderError> {
        Ok(format!("noop-{}", spec.name))
    }

    async fn exec(
        &self,
        _handle: &str,
        _command: &str,
        _timeout: Duration,
    ) -> Result<ExecOutcome, ProviderError> {
        Ok(ExecOutcome::new(String::new(), String::new(), 0, Duration::ZERO))
    }

    async fn tail_logs(&self, _handle: &str, _lines: u32) -> Result<String, ProviderError> {
        Ok(String::new())
    }

    async fn stream_logs(&self, _handle: &str) -> Result<LogStream, ProviderError> {
        Ok(futures::stream::empty().boxed())
    }

    async fn stop(&self, _handle: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
