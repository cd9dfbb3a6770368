// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for orchestrator operations

use crate::auth::AuthError;
use std::time::Duration;
use tb_adapters::ProviderError;
use tb_core::{AgentId, TerminalId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestratorError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("ownership mismatch: {0}")]
    OwnershipMismatch(String),
    #[error("terminal not found: {0}")]
    NotFound(TerminalId),
    #[error("agent {agent_id} already has {limit} running terminals")]
    QuotaExceeded { agent_id: AgentId, limit: usize },
    #[error("terminal {0} is not running")]
    NotRunning(TerminalId),
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth_invalid",
            Self::OwnershipMismatch(_) => "ownership_mismatch",
            Self::NotFound(_) => "not_found",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::NotRunning(_) => "not_running",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::Provider(_) => "provider_error",
            Self::Timeout(_) => "timeout",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Internal(_) => "internal",
        }
    }

    pub(crate) fn not_owner(terminal_id: &TerminalId) -> Self {
        Self::OwnershipMismatch(format!("terminal {} belongs to another agent", terminal_id))
    }
}

impl From<ProviderError> for OrchestratorError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Unavailable(msg) => Self::ProviderUnavailable(msg),
            ProviderError::Rejected(msg) => Self::Provider(msg),
            ProviderError::Timeout(d) => Self::Timeout(d),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
