// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mirror that discards every write, for in-memory-only deployments.

use super::{Mirror, MirrorError};
use async_trait::async_trait;
use std::time::Duration;
use tb_core::{CommandAudit, TerminalId, TerminalRecord};

#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpMirror;

impl NoOpMirror {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mirror for NoOpMirror {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn put_terminal(
        &self,
        _record: &TerminalRecord,
        _ttl: Duration,
    ) -> Result<(), MirrorError> {
        Ok(())
    }

    async fn push_command(
        &self,
        _id: &TerminalId,
        _entry: &CommandAudit,
        _keep: usize,
        _ttl: Duration,
    ) -> Result<(), MirrorError> {
        Ok(())
    }

    async fn remove_terminal(&self, _id: &TerminalId) -> Result<(), MirrorError> {
        Ok(())
    }
}
