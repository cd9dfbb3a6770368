// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::collections::BTreeMap;
use std::time::Duration;

use tb_core::{ExecOutcome, TerminalId, TerminalRecord};
use tb_daemon::protocol::{self, ProtocolError};
use tb_daemon::{Request, Response, PROTOCOL_VERSION};
use tb_engine::{HealthReport, StatusReport};
use thiserror::Error;
use tokio::net::TcpStream;

use crate::env;

/// Exec timeout the daemon applies when none is requested
const DEFAULT_EXEC_SECS: i64 = 30;

/// Longest exec timeout the daemon accepts
const MAX_EXEC_SECS: i64 = 600;

/// Timeout for plain request/response exchanges
pub fn timeout_ipc() -> Duration {
    env::timeout_ipc_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for establishing the TCP connection
pub fn timeout_connect() -> Duration {
    env::timeout_connect_ms().unwrap_or(Duration::from_secs(5))
}

/// How long to wait for an exec response: the command's own budget plus
/// the usual round trip.
pub fn exec_wait(timeout: Option<i64>) -> Duration {
    let secs = timeout.unwrap_or(DEFAULT_EXEC_SECS).clamp(1, MAX_EXEC_SECS);
    Duration::from_secs(secs as u64) + timeout_ipc()
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not reachable at {0}")]
    DaemonNotRunning(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{message} ({code})")]
    Rejected { code: String, message: String },

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Error code reported by the daemon, if it rejected the request
    #[cfg(test)]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }
}

fn unexpected(response: Response) -> ClientError {
    match response {
        Response::Error { code, message } => ClientError::Rejected { code, message },
        _ => ClientError::UnexpectedResponse,
    }
}

/// Daemon client
pub struct DaemonClient {
    addr: String,
    token: Option<String>,
}

impl DaemonClient {
    pub fn new(addr: impl Into<String>, token: Option<String>) -> Self {
        Self {
            addr: addr.into(),
            token,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> Result<TcpStream, ClientError> {
        match tokio::time::timeout(timeout_connect(), TcpStream::connect(&self.addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
                ) =>
            {
                Err(ClientError::DaemonNotRunning(self.addr.clone()))
            }
            Ok(Err(e)) => Err(ClientError::Io(e)),
            Err(_) => Err(ClientError::DaemonNotRunning(self.addr.clone())),
        }
    }

    /// Send a request and wait up to `read_timeout` for the response
    async fn send_with_timeout(
        &self,
        request: &Request,
        read_timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = self.connect().await?;
        let (mut reader, mut writer) = stream.into_split();
        protocol::write_request(&mut writer, request, timeout_ipc()).await?;
        Ok(protocol::read_response(&mut reader, read_timeout).await?)
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        self.send_with_timeout(request, timeout_ipc()).await
    }

    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    /// Daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        let request = Request::Hello {
            version: PROTOCOL_VERSION.to_string(),
        };
        match self.send(&request).await? {
            Response::Hello { version } => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    pub async fn health(&self) -> Result<HealthReport, ClientError> {
        match self.send(&Request::Health).await? {
            Response::Health { health } => Ok(health),
            other => Err(unexpected(other)),
        }
    }

    pub async fn create_terminal(
        &self,
        agent_id: Option<String>,
        command: Option<String>,
        environment: BTreeMap<String, String>,
        timeout_hours: Option<i64>,
    ) -> Result<TerminalRecord, ClientError> {
        let request = Request::CreateTerminal {
            token: self.token(),
            agent_id,
            command,
            environment,
            timeout_hours,
        };
        match self.send(&request).await? {
            Response::Terminal { terminal } => Ok(terminal),
            other => Err(unexpected(other)),
        }
    }

    pub async fn execute(
        &self,
        terminal_id: &str,
        command: &str,
        timeout: Option<i64>,
    ) -> Result<ExecOutcome, ClientError> {
        let request = Request::ExecuteCommand {
            token: self.token(),
            terminal_id: TerminalId::new(terminal_id),
            command: command.to_string(),
            timeout,
        };
        match self.send_with_timeout(&request, exec_wait(timeout)).await? {
            Response::Executed { result } => Ok(result),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_logs(
        &self,
        terminal_id: &str,
        lines: Option<u32>,
    ) -> Result<String, ClientError> {
        let request = Request::GetLogs {
            token: self.token(),
            terminal_id: TerminalId::new(terminal_id),
            lines,
        };
        match self.send(&request).await? {
            Response::Logs { logs } => Ok(logs),
            other => Err(unexpected(other)),
        }
    }

    pub async fn destroy(&self, terminal_id: &str) -> Result<bool, ClientError> {
        let request = Request::DestroyTerminal {
            token: self.token(),
            terminal_id: TerminalId::new(terminal_id),
        };
        match self.send(&request).await? {
            Response::Destroyed { success } => Ok(success),
            other => Err(unexpected(other)),
        }
    }

    pub async fn list(&self) -> Result<Vec<TerminalRecord>, ClientError> {
        let request = Request::ListTerminals {
            token: self.token(),
        };
        match self.send(&request).await? {
            Response::Terminals { terminals } => Ok(terminals),
            other => Err(unexpected(other)),
        }
    }

    pub async fn status(&self, terminal_id: &str) -> Result<StatusReport, ClientError> {
        let request = Request::TerminalStatus {
            token: self.token(),
            terminal_id: TerminalId::new(terminal_id),
        };
        match self.send(&request).await? {
            Response::Status { status } => Ok(*status),
            other => Err(unexpected(other)),
        }
    }

    /// Follow a terminal's output, calling `on_line` per line.
    ///
    /// Returns the daemon's end reason once the stream closes. Dropping the
    /// future closes the connection, which cancels the stream server-side.
    pub async fn stream(
        &self,
        terminal_id: &str,
        mut on_line: impl FnMut(&str),
    ) -> Result<String, ClientError> {
        let stream = self.connect().await?;
        let (mut reader, mut writer) = stream.into_split();
        let request = Request::StreamLogs {
            token: self.token(),
            terminal_id: TerminalId::new(terminal_id),
        };
        protocol::write_request(&mut writer, &request, timeout_ipc()).await?;

        match protocol::read_response(&mut reader, timeout_ipc()).await? {
            Response::StreamStarted { .. } => {}
            other => return Err(unexpected(other)),
        }

        loop {
            let bytes = protocol::read_message(&mut reader).await?;
            match protocol::decode::<Response>(&bytes)? {
                Response::LogLine { line } => on_line(&line),
                Response::StreamEnded { reason } => return Ok(reason),
                other => return Err(unexpected(other)),
            }
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
