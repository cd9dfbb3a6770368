// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durability mirror: a non-authoritative, expiring copy of registry state

mod noop;
mod redis;

pub use self::noop::NoOpMirror;
pub use self::redis::RedisMirror;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMirror, MirrorCall};

use async_trait::async_trait;
use std::time::Duration;
use tb_core::{CommandAudit, TerminalId, TerminalRecord};
use thiserror::Error;

/// Errors from mirror writes. Never fatal to the caller's operation.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("mirror unavailable: {0}")]
    Unavailable(String),
    #[error("mirror write failed: {0}")]
    Write(#[from] ::redis::RedisError),
    #[error("mirror encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key holding the JSON terminal record
pub fn terminal_key(id: &TerminalId) -> String {
    format!("terminal:{}", id)
}

/// Key holding the recent-command list
pub fn commands_key(id: &TerminalId) -> String {
    format!("terminal:{}:commands", id)
}

/// Expiry in whole seconds; the store rejects a zero TTL
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// External key-value store receiving best-effort copies of registry writes
#[async_trait]
pub trait Mirror: Clone + Send + Sync + 'static {
    /// Whether writes go anywhere (reported by health)
    fn is_enabled(&self) -> bool {
        true
    }

    /// Store a record that expires after `ttl`
    async fn put_terminal(&self, record: &TerminalRecord, ttl: Duration)
        -> Result<(), MirrorError>;

    /// Prepend an audit entry, keeping only the newest `keep`
    async fn push_command(
        &self,
        id: &TerminalId,
        entry: &CommandAudit,
        keep: usize,
        ttl: Duration,
    ) -> Result<(), MirrorError>;

    /// Drop the record and its command list
    async fn remove_terminal(&self, id: &TerminalId) -> Result<(), MirrorError>;
}
