// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response protocol between `tb` clients and the daemon.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tb_core::{ExecOutcome, TerminalId, TerminalRecord};
use tb_engine::{HealthReport, OrchestratorError, StatusReport};

#[path = "protocol_wire.rs"]
mod wire;
pub use wire::{
    decode, encode, read_message, read_request, read_response, write_message, write_request,
    write_response, ProtocolError,
};

/// Request from a client to the daemon.
///
/// Terminal operations carry the caller's bearer token; a missing token is
/// rejected as `auth_invalid`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Daemon-wide counters; needs no credential
    Health,

    CreateTerminal {
        #[serde(default)]
        token: Option<String>,
        /// Owner named by the caller; must match the credential when given
        #[serde(default)]
        agent_id: Option<String>,
        #[serde(default)]
        command: Option<String>,
        #[serde(default)]
        environment: BTreeMap<String, String>,
        #[serde(default)]
        timeout_hours: Option<i64>,
    },

    ExecuteCommand {
        #[serde(default)]
        token: Option<String>,
        terminal_id: TerminalId,
        command: String,
        /// Seconds
        #[serde(default)]
        timeout: Option<i64>,
    },

    GetLogs {
        #[serde(default)]
        token: Option<String>,
        terminal_id: TerminalId,
        #[serde(default)]
        lines: Option<u32>,
    },

    DestroyTerminal {
        #[serde(default)]
        token: Option<String>,
        terminal_id: TerminalId,
    },

    ListTerminals {
        #[serde(default)]
        token: Option<String>,
    },

    TerminalStatus {
        #[serde(default)]
        token: Option<String>,
        terminal_id: TerminalId,
    },

    /// Switch the connection into streaming mode for one terminal's output
    StreamLogs {
        #[serde(default)]
        token: Option<String>,
        terminal_id: TerminalId,
    },
}

/// Response from the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Pong,

    Hello { version: String },

    Health { health: HealthReport },

    /// A newly created terminal
    Terminal { terminal: TerminalRecord },

    Executed { result: ExecOutcome },

    Logs { logs: String },

    Destroyed { success: bool },

    Terminals { terminals: Vec<TerminalRecord> },

    Status { status: Box<StatusReport> },

    /// First frame of a stream connection
    StreamStarted { terminal_id: TerminalId },

    LogLine { line: String },

    /// Last frame of a stream connection
    StreamEnded { reason: String },

    /// Failed request; `code` is a stable machine-readable kind
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<OrchestratorError> for Response {
    fn from(err: OrchestratorError) -> Self {
        Self::error(err.code(), err.to_string())
    }
}

/// Maximum message size (16 MiB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Default timeout for reading a request or writing a response
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Port the daemon listens on unless configured otherwise
pub const DEFAULT_PORT: u16 = 8740;

/// Protocol version (from Cargo.toml)
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
