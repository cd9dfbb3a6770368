// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authoritative in-memory terminal registry.
//!
//! The map lock is held only for single read-modify-write steps and never
//! across an await. Each terminal also has an async slot lock that callers
//! hold across their check-then-act sequence, so operations on one terminal
//! are serialized while different terminals proceed independently.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use std::future::Future;
use tb_adapters::{Mirror, MirrorError};
use tb_core::{AgentId, CommandAudit, TerminalId, TerminalRecord, TerminalStatus};

/// Longest a mirror write may hold up the operation that triggered it
pub(crate) const MIRROR_TIMEOUT: Duration = Duration::from_secs(2);

/// Mutable per-terminal state, guarded by the slot lock
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) record: TerminalRecord,
    recent: VecDeque<CommandAudit>,
    pub(crate) teardown_failures: u32,
    removed: bool,
}

impl Entry {
    fn new(record: TerminalRecord) -> Self {
        Self {
            record,
            recent: VecDeque::new(),
            teardown_failures: 0,
            removed: false,
        }
    }

    /// Set once the terminal has left the registry; waiters must treat it as gone
    pub(crate) fn is_removed(&self) -> bool {
        self.removed
    }

    /// Recent commands, newest first
    pub(crate) fn recent_commands(&self) -> Vec<CommandAudit> {
        self.recent.iter().cloned().collect()
    }
}

pub(crate) type Slot = Arc<tokio::sync::Mutex<Entry>>;

struct Registered {
    record: TerminalRecord,
    slot: Slot,
}

#[derive(Default)]
struct Inner {
    terminals: HashMap<TerminalId, Registered>,
    /// Creates in flight per agent, counted against the quota
    pending: HashMap<AgentId, usize>,
}

fn release(pending: &mut HashMap<AgentId, usize>, agent_id: &AgentId) {
    if let Some(n) = pending.get_mut(agent_id) {
        *n = n.saturating_sub(1);
        if *n == 0 {
            pending.remove(agent_id);
        }
    }
}

/// A quota slot held while a session is being started.
///
/// Dropping it without [`Registry::insert`] gives the slot back.
pub struct Reservation<'a> {
    inner: &'a Mutex<Inner>,
    agent_id: AgentId,
    committed: bool,
}

impl Reservation<'_> {
    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            release(&mut self.inner.lock().pending, &self.agent_id);
        }
    }
}

pub struct Registry<M> {
    inner: Mutex<Inner>,
    mirror: M,
    audit_window: usize,
}

impl<M: Mirror> Registry<M> {
    pub fn new(mirror: M, audit_window: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            mirror,
            audit_window,
        }
    }

    pub fn mirror_enabled(&self) -> bool {
        self.mirror.is_enabled()
    }

    /// Claim a quota slot for `agent_id`, or `None` when it already holds
    /// `limit` terminals (registered or being created).
    pub fn reserve(&self, agent_id: &AgentId, limit: usize) -> Option<Reservation<'_>> {
        let mut inner = self.inner.lock();
        let registered = inner
            .terminals
            .values()
            .filter(|t| &t.record.agent_id == agent_id)
            .count();
        let pending = inner.pending.get(agent_id).copied().unwrap_or(0);
        if registered + pending >= limit {
            return None;
        }
        *inner.pending.entry(agent_id.clone()).or_default() += 1;
        Some(Reservation {
            inner: &self.inner,
            agent_id: agent_id.clone(),
            committed: false,
        })
    }

    /// Register a started terminal, consuming its reservation
    pub async fn insert(
        &self,
        mut reservation: Reservation<'_>,
        record: TerminalRecord,
        now: DateTime<Utc>,
    ) {
        {
            let mut inner = self.inner.lock();
            release(&mut inner.pending, &reservation.agent_id);
            reservation.committed = true;
            inner.terminals.insert(
                record.terminal_id.clone(),
                Registered {
                    record: record.clone(),
                    slot: Arc::new(tokio::sync::Mutex::new(Entry::new(record.clone()))),
                },
            );
        }

        mirrored(
            &record.terminal_id,
            "write",
            self.mirror.put_terminal(&record, ttl(&record, now)),
        )
        .await;
    }

    pub fn get(&self, id: &TerminalId) -> Option<TerminalRecord> {
        self.inner.lock().terminals.get(id).map(|t| t.record.clone())
    }

    pub(crate) fn slot(&self, id: &TerminalId) -> Option<Slot> {
        self.inner.lock().terminals.get(id).map(|t| Arc::clone(&t.slot))
    }

    /// Apply a status transition. Only `Running -> Destroyed` changes anything.
    pub fn update_status(&self, id: &TerminalId, status: TerminalStatus) -> bool {
        let mut inner = self.inner.lock();
        match (inner.terminals.get_mut(id), status) {
            (Some(t), TerminalStatus::Destroyed) => t.record.mark_destroyed(),
            _ => false,
        }
    }

    /// Destroy and unregister the terminal whose slot lock the caller holds
    pub(crate) async fn remove(&self, entry: &mut Entry) {
        let id = entry.record.terminal_id.clone();
        self.update_status(&id, TerminalStatus::Destroyed);
        entry.record.mark_destroyed();
        entry.removed = true;
        self.inner.lock().terminals.remove(&id);

        mirrored(&id, "delete", self.mirror.remove_terminal(&id)).await;
    }

    /// Append to the recent-command window of the terminal whose slot lock
    /// the caller holds
    pub(crate) async fn record_command(
        &self,
        entry: &mut Entry,
        audit: CommandAudit,
        now: DateTime<Utc>,
    ) {
        entry.recent.push_front(audit.clone());
        entry.recent.truncate(self.audit_window);

        let id = &entry.record.terminal_id;
        let ttl = ttl(&entry.record, now);
        mirrored(
            id,
            "append",
            self.mirror.push_command(id, &audit, self.audit_window, ttl),
        )
        .await;
    }

    /// Registered terminals, optionally only those of one agent, oldest first
    pub fn list(&self, agent_id: Option<&AgentId>) -> Vec<TerminalRecord> {
        let inner = self.inner.lock();
        let mut records: Vec<_> = inner
            .terminals
            .values()
            .filter(|t| agent_id.is_none() || agent_id == Some(&t.record.agent_id))
            .map(|t| t.record.clone())
            .collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.terminal_id.as_str().cmp(b.terminal_id.as_str()))
        });
        records
    }

    /// Ids of running terminals whose deadline has passed
    pub fn expired(&self, now: DateTime<Utc>) -> Vec<TerminalId> {
        let inner = self.inner.lock();
        inner
            .terminals
            .values()
            .filter(|t| t.record.is_running() && t.record.is_expired(now))
            .map(|t| t.record.terminal_id.clone())
            .collect()
    }

    /// Registered terminals that have not yet expired
    pub fn live_count(&self, now: DateTime<Utc>) -> usize {
        let inner = self.inner.lock();
        inner
            .terminals
            .values()
            .filter(|t| t.record.is_running() && !t.record.is_expired(now))
            .count()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().terminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Await a mirror write for at most [`MIRROR_TIMEOUT`]; failures are only logged
async fn mirrored(
    terminal_id: &TerminalId,
    op: &'static str,
    write: impl Future<Output = Result<(), MirrorError>>,
) {
    match tokio::time::timeout(MIRROR_TIMEOUT, write).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(%terminal_id, op, code = "mirror_failure", error = %e, "mirror write failed");
        }
        Err(_) => {
            tracing::warn!(
                %terminal_id,
                op,
                code = "mirror_failure",
                timeout_ms = MIRROR_TIMEOUT.as_millis() as u64,
                "mirror write timed out"
            );
        }
    }
}

/// Mirror expiry matching the terminal's remaining lifetime
fn ttl(record: &TerminalRecord, now: DateTime<Utc>) -> Duration {
    record.remaining(now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
