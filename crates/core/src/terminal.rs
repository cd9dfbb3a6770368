// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal record: one provisioned, time-bounded session owned by an agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Identity of an authenticated agent, taken from a verified credential.
    pub struct AgentId;
}

crate::define_id! {
    /// Globally unique terminal identifier, assigned at creation.
    pub struct TerminalId;
}

/// Externally observable terminal state.
///
/// `Creating` is never stored; a record only exists once the provider has
/// confirmed the session started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    Running,
    Destroyed,
}

impl TerminalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Destroyed => "destroyed",
        }
    }
}

impl std::fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalRecord {
    pub terminal_id: TerminalId,
    pub agent_id: AgentId,
    /// Opaque handle of the backing execution unit (container id)
    #[serde(rename = "session_ref")]
    pub session_handle: String,
    pub status: TerminalStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub command: String,
    pub log_location: PathBuf,
}

impl TerminalRecord {
    pub fn is_running(&self) -> bool {
        self.status == TerminalStatus::Running
    }

    pub fn is_owned_by(&self, agent_id: &AgentId) -> bool {
        &self.agent_id == agent_id
    }

    /// Deadline has passed (inclusive of the exact instant)
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero once expired
    pub fn remaining(&self, now: DateTime<Utc>) -> chrono::Duration {
        (self.expires_at - now).max(chrono::Duration::zero())
    }

    /// Transition `Running -> Destroyed`.
    ///
    /// Returns false if the record was already destroyed; the reverse
    /// transition does not exist.
    pub fn mark_destroyed(&mut self) -> bool {
        match self.status {
            TerminalStatus::Running => {
                self.status = TerminalStatus::Destroyed;
                true
            }
            TerminalStatus::Destroyed => false,
        }
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
