// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake mirror for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Mirror, MirrorError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tb_core::{CommandAudit, TerminalId, TerminalRecord};

/// Recorded mirror call
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorCall {
    PutTerminal { id: TerminalId, ttl: Duration },
    PushCommand { id: TerminalId, command: String, keep: usize },
    RemoveTerminal { id: TerminalId },
}

#[derive(Default)]
struct FakeMirrorState {
    terminals: HashMap<TerminalId, TerminalRecord>,
    commands: HashMap<TerminalId, Vec<CommandAudit>>,
    calls: Vec<MirrorCall>,
    failing: bool,
    stall: Option<Duration>,
}

/// In-memory mirror that records calls and can be made to fail
#[derive(Clone, Default)]
pub struct FakeMirror {
    inner: Arc<Mutex<FakeMirrorState>>,
}

impl FakeMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MirrorCall> {
        self.inner.lock().calls.clone()
    }

    /// Make every subsequent write fail (after being recorded)
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }

    /// Make every subsequent write block for `stall` before it is recorded
    pub fn set_stall(&self, stall: Duration) {
        self.inner.lock().stall = Some(stall);
    }

    async fn wait_stall(&self) {
        let stall = self.inner.lock().stall;
        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
    }

    pub fn terminal(&self, id: &TerminalId) -> Option<TerminalRecord> {
        self.inner.lock().terminals.get(id).cloned()
    }

    /// Mirrored commands, newest first
    pub fn commands(&self, id: &TerminalId) -> Vec<CommandAudit> {
        self.inner
            .lock()
            .commands
            .get(id)
            .cloned()
            .unwrap_or_default()
    }
}

fn injected() -> MirrorError {
    MirrorError::Unavailable("injected failure".to_string())
}

#[async_trait]
impl Mirror for FakeMirror {
    async fn put_terminal(
        &self,
        record: &TerminalRecord,
        ttl: Duration,
    ) -> Result<(), MirrorError> {
        self.wait_stall().await;
        let mut inner = self.inner.lock();
        inner.calls.push(MirrorCall::PutTerminal {
            id: record.terminal_id.clone(),
            ttl,
        });
        if inner.failing {
            return Err(injected());
        }
        inner
            .terminals
            .insert(record.terminal_id.clone(), record.clone());
        Ok(())
    }

    async fn push_command(
        &self,
        id: &TerminalId,
        entry: &CommandAudit,
        keep: usize,
        _ttl: Duration,
    ) -> Result<(), MirrorError> {
        self.wait_stall().await;
        let mut inner = self.inner.lock();
        inner.calls.push(MirrorCall::PushCommand {
            id: id.clone(),
            command: entry.command.clone(),
            keep,
        });
        if inner.failing {
            return Err(injected());
        }
        let list = inner.commands.entry(id.clone()).or_default();
        list.insert(0, entry.clone());
        list.truncate(keep);
        Ok(())
    }

    async fn remove_terminal(&self, id: &TerminalId) -> Result<(), MirrorError> {
        self.wait_stall().await;
        let mut inner = self.inner.lock();
        inner
            .calls
            .push(MirrorCall::RemoveTerminal { id: id.clone() });
        if inner.failing {
            return Err(injected());
        }
        inner.terminals.remove(id);
        inner.commands.remove(id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
