// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live log streaming for authenticated callers

use crate::auth::TokenVerifier;
use crate::error::OrchestratorError;
use crate::manager::TerminalManager;
use futures::StreamExt;
use std::sync::Arc;
use tb_adapters::{LogStream, Mirror, SessionProvider};
use tb_core::{Clock, IdGen, TerminalId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Why a relay stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEnd {
    /// The cancellation token fired
    Cancelled,
    /// The receiving side went away
    ClientGone,
    /// The session stopped producing output
    SessionEnded,
    Failed(String),
}

impl RelayEnd {
    pub fn reason(&self) -> String {
        match self {
            Self::Cancelled => "cancelled".to_string(),
            Self::ClientGone => "client_gone".to_string(),
            Self::SessionEnded => "session_ended".to_string(),
            Self::Failed(msg) => format!("failed: {}", msg),
        }
    }
}

/// An open, authorized log stream
pub struct LogSubscription {
    pub terminal_id: TerminalId,
    stream: LogStream,
}

impl LogSubscription {
    /// Forward lines into `sink` until cancelled, the receiver closes, or
    /// the session output ends. The subscription is released on return.
    pub async fn relay(self, sink: mpsc::Sender<String>, cancel: CancellationToken) -> RelayEnd {
        let LogSubscription {
            terminal_id,
            mut stream,
        } = self;

        let end = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break RelayEnd::Cancelled,
                _ = sink.closed() => break RelayEnd::ClientGone,
                next = stream.next() => next,
            };
            let line = match next {
                Some(Ok(line)) => line,
                Some(Err(e)) => break RelayEnd::Failed(e.to_string()),
                None => break RelayEnd::SessionEnded,
            };
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break RelayEnd::Cancelled,
                sent = sink.send(line) => {
                    if sent.is_err() {
                        break RelayEnd::ClientGone;
                    }
                }
            }
        };

        drop(stream);
        tracing::info!(%terminal_id, reason = %end.reason(), "log stream closed");
        end
    }
}

pub struct LogGateway<P, M, C, I> {
    manager: Arc<TerminalManager<P, M, C, I>>,
    verifier: TokenVerifier,
}

impl<P, M, C, I> LogGateway<P, M, C, I>
where
    P: SessionProvider,
    M: Mirror,
    C: Clock,
    I: IdGen,
{
    pub fn new(manager: Arc<TerminalManager<P, M, C, I>>, verifier: TokenVerifier) -> Self {
        Self { manager, verifier }
    }

    /// Authenticate the stream's own credential, check ownership, and
    /// subscribe to the session's output from now on
    pub async fn open(
        &self,
        credential: Option<&str>,
        terminal_id: &TerminalId,
    ) -> Result<LogSubscription, OrchestratorError> {
        let identity = self.verifier.verify(credential)?;
        let handle = self.manager.session_handle(&identity, terminal_id).await?;
        let stream = self.manager.provider().stream_logs(&handle).await?;
        tracing::info!(%terminal_id, agent_id = %identity.agent_id(), "log stream opened");
        Ok(LogSubscription {
            terminal_id: terminal_id.clone(),
            stream,
        })
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
