// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced provider wrapper for consistent observability

use crate::provider::{LogStream, ProviderError, SessionProvider, SessionSpec};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tb_core::ExecOutcome;
use tracing::Instrument;

/// Wrapper that adds tracing to any SessionProvider
#[derive(Clone)]
pub struct TracedProvider<P> {
    inner: P,
}

impl<P> TracedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: SessionProvider> SessionProvider for TracedProvider<P> {
    async fn start(&self, spec: &SessionSpec) -> Result<String, ProviderError> {
        async {
            tracing::info!(
                image = %spec.image,
                command = %spec.command,
                env_count = spec.env.len(),
                "starting"
            );
            let start = Instant::now();
            let result = self.inner.start(spec).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(handle) => tracing::info!(handle = handle.as_str(), elapsed_ms, "session started"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "start failed"),
            }
            result
        }
        .instrument(tracing::info_span!("provider.start", name = %spec.name))
        .await
    }

    async fn exec(
        &self,
        handle: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecOutcome, ProviderError> {
        async {
            tracing::debug!(command_len = command.len(), timeout_secs = timeout.as_secs(), "executing");
            let start = Instant::now();
            let result = self.inner.exec(handle, command, timeout).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(outcome) => tracing::info!(exit_code = outcome.exit_code, elapsed_ms, "executed"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "exec failed"),
            }
            result
        }
        .instrument(tracing::info_span!("provider.exec", handle))
        .await
    }

    async fn tail_logs(&self, handle: &str, lines: u32) -> Result<String, ProviderError> {
        let result = self.inner.tail_logs(handle, lines).await;
        tracing::info_span!("provider.tail_logs", handle, lines).in_scope(|| match &result {
            Ok(text) => tracing::debug!(captured_len = text.len(), "captured"),
            Err(e) => tracing::warn!(error = %e, "tail failed"),
        });
        result
    }

    async fn stream_logs(&self, handle: &str) -> Result<LogStream, ProviderError> {
        let result = self.inner.stream_logs(handle).await;
        tracing::info_span!("provider.stream_logs", handle).in_scope(|| match &result {
            Ok(_) => tracing::info!("subscribed"),
            Err(e) => tracing::error!(error = %e, "subscribe failed"),
        });
        result
    }

    async fn stop(&self, handle: &str) -> Result<(), ProviderError> {
        let start = Instant::now();
        let result = self.inner.stop(handle).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info_span!("provider.stop", handle).in_scope(|| match &result {
            Ok(()) => tracing::info!(elapsed_ms, "stopped"),
            Err(e) => tracing::warn!(elapsed_ms, error = %e, "stop failed"),
        });
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
