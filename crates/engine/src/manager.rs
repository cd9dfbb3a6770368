// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle manager: the operation surface over the registry and provider.
//!
//! Every operation takes a verified [`Identity`]. Per-terminal operations
//! resolve in a fixed order: `not_found`, then `ownership_mismatch`, then
//! (where a live session is needed) `not_running`.

use crate::auth::Identity;
use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::registry::{Entry, Registry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tb_adapters::{Mirror, SessionProvider, SessionSpec, CONTAINER_LOG_DIR};
use tb_core::{
    format_remaining, AgentId, Clock, CommandAudit, ExecOutcome, IdGen, TerminalId,
    TerminalRecord, TerminalStatus, UuidIdGen,
};
use tokio::sync::OwnedMutexGuard;

/// Text reported in place of logs when the tail cannot be fetched
const LOGS_UNAVAILABLE: &str = "Unable to fetch logs";

/// Adapter dependencies of the manager
pub struct ManagerDeps<P, M, C, I = UuidIdGen> {
    pub provider: P,
    pub mirror: M,
    pub clock: C,
    pub ids: I,
}

/// Parameters of a create request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateTerminal {
    /// Owner named in the request payload; must match the credential when set
    pub agent_id: Option<AgentId>,
    pub command: Option<String>,
    pub environment: BTreeMap<String, String>,
    pub timeout_hours: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub record: TerminalRecord,
    pub time_remaining: String,
    pub recent_logs: String,
    /// Newest first
    pub recent_commands: Vec<CommandAudit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub running_terminals: usize,
    pub total_terminals: usize,
    pub uptime_secs: u64,
    pub mirror_enabled: bool,
}

/// Result of reclaiming one expired terminal
#[derive(Debug)]
pub(crate) enum Reap {
    Reaped,
    /// Already removed by someone else
    Gone,
    Failed {
        error: OrchestratorError,
        failures: u32,
    },
}

pub struct TerminalManager<P, M, C, I = UuidIdGen> {
    provider: P,
    registry: Registry<M>,
    clock: C,
    ids: I,
    config: OrchestratorConfig,
    started_at: DateTime<Utc>,
}

impl<P, M, C, I> TerminalManager<P, M, C, I>
where
    P: SessionProvider,
    M: Mirror,
    C: Clock,
    I: IdGen,
{
    pub fn new(deps: ManagerDeps<P, M, C, I>, config: OrchestratorConfig) -> Self {
        let started_at = deps.clock.now();
        Self {
            provider: deps.provider,
            registry: Registry::new(deps.mirror, config.audit_window),
            clock: deps.clock,
            ids: deps.ids,
            config,
            started_at,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn registry(&self) -> &Registry<M> {
        &self.registry
    }

    /// Start a session for the caller and register it as running
    pub async fn create(
        &self,
        identity: &Identity,
        request: CreateTerminal,
    ) -> Result<TerminalRecord, OrchestratorError> {
        let agent_id = identity.agent_id();
        if let Some(claimed) = &request.agent_id {
            if claimed != agent_id {
                return Err(OrchestratorError::OwnershipMismatch(format!(
                    "request names agent {} but credential is for {}",
                    claimed, agent_id
                )));
            }
        }
        let command = match request.command {
            Some(c) if c.trim().is_empty() => {
                return Err(OrchestratorError::InvalidRequest(
                    "command must not be empty".to_string(),
                ))
            }
            Some(c) => c,
            None => "bash".to_string(),
        };

        let limit = self.config.max_terminals_per_agent;
        let reservation = self.registry.reserve(agent_id, limit).ok_or_else(|| {
            OrchestratorError::QuotaExceeded {
                agent_id: agent_id.clone(),
                limit,
            }
        })?;

        let terminal_id = TerminalId::new(self.ids.next());
        let log_location = self
            .config
            .log_base_dir
            .join(path_component(agent_id.as_str()))
            .join(path_component(terminal_id.as_str()));
        tokio::fs::create_dir_all(&log_location)
            .await
            .map_err(|e| {
                OrchestratorError::Internal(format!(
                    "failed to create log directory {}: {}",
                    log_location.display(),
                    e
                ))
            })?;

        let spec = SessionSpec {
            name: terminal_id.to_string(),
            image: self.config.image.clone(),
            command: command.clone(),
            env: session_env(request.environment, agent_id, &terminal_id),
            limits: self.config.limits,
            log_dir: log_location.clone(),
        };
        let lifetime = self.config.session_timeout(request.timeout_hours);
        let deadline = |from: DateTime<Utc>| {
            chrono::Duration::from_std(lifetime)
                .ok()
                .and_then(|d| from.checked_add_signed(d))
        };
        if deadline(self.clock.now()).is_none() {
            remove_log_dir(&log_location).await;
            return Err(OrchestratorError::Internal(format!(
                "session lifetime of {}s is out of range",
                lifetime.as_secs()
            )));
        }

        let session_handle = match self.provider.start(&spec).await {
            Ok(handle) => handle,
            Err(e) => {
                remove_log_dir(&log_location).await;
                return Err(e.into());
            }
        };

        let created_at = self.clock.now();
        let Some(expires_at) = deadline(created_at) else {
            if let Err(e) = self.provider.stop(&session_handle).await {
                tracing::warn!(%terminal_id, error = %e, "failed to stop unregistered session");
            }
            remove_log_dir(&log_location).await;
            return Err(OrchestratorError::Internal(
                "session deadline overflowed".to_string(),
            ));
        };
        let record = TerminalRecord {
            terminal_id,
            agent_id: agent_id.clone(),
            session_handle,
            status: TerminalStatus::Running,
            created_at,
            expires_at,
            command,
            log_location,
        };
        self.registry
            .insert(reservation, record.clone(), created_at)
            .await;

        tracing::info!(
            terminal_id = %record.terminal_id,
            agent_id = %record.agent_id,
            expires_at = %record.expires_at,
            "terminal created"
        );
        Ok(record)
    }

    /// Run a command inside the caller's running terminal
    pub async fn execute(
        &self,
        identity: &Identity,
        terminal_id: &TerminalId,
        command: &str,
        timeout_secs: Option<i64>,
    ) -> Result<ExecOutcome, OrchestratorError> {
        if command.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "command must not be empty".to_string(),
            ));
        }
        let mut entry = self.lock_owned(identity, terminal_id).await?;
        self.ensure_running(&entry)?;

        let timeout = self.config.exec_timeout(timeout_secs);
        let outcome = tokio::time::timeout(
            timeout,
            self.provider
                .exec(&entry.record.session_handle, command, timeout),
        )
        .await
        .map_err(|_| OrchestratorError::Timeout(timeout))??;

        let now = self.clock.now();
        let audit = CommandAudit::from_outcome(command, &outcome, now);
        self.registry.record_command(&mut entry, audit, now).await;

        tracing::debug!(
            %terminal_id,
            exit_code = outcome.exit_code,
            execution_time = outcome.execution_time,
            "command executed"
        );
        Ok(outcome)
    }

    /// Most recent `lines` of session output (expired terminals included)
    pub async fn get_logs(
        &self,
        identity: &Identity,
        terminal_id: &TerminalId,
        lines: Option<u32>,
    ) -> Result<String, OrchestratorError> {
        let entry = self.lock_owned(identity, terminal_id).await?;
        let lines = self.config.log_lines(lines);
        Ok(self
            .provider
            .tail_logs(&entry.record.session_handle, lines)
            .await?)
    }

    /// Stop the session and unregister the terminal
    pub async fn destroy(
        &self,
        identity: &Identity,
        terminal_id: &TerminalId,
    ) -> Result<(), OrchestratorError> {
        let mut entry = self.lock_owned(identity, terminal_id).await?;
        self.teardown(&mut entry).await?;
        tracing::info!(%terminal_id, agent_id = %identity.agent_id(), "terminal destroyed");
        Ok(())
    }

    /// The caller's terminals, oldest first
    pub fn list(&self, identity: &Identity) -> Vec<TerminalRecord> {
        let mut records = self.registry.list(Some(identity.agent_id()));
        if self.config.list_running_only {
            let now = self.clock.now();
            records.retain(|r| r.is_running() && !r.is_expired(now));
        }
        records
    }

    /// Record plus recent output and commands
    pub async fn status(
        &self,
        identity: &Identity,
        terminal_id: &TerminalId,
    ) -> Result<StatusReport, OrchestratorError> {
        let entry = self.lock_owned(identity, terminal_id).await?;
        let recent_logs = match self
            .provider
            .tail_logs(&entry.record.session_handle, self.config.status_log_lines)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(%terminal_id, error = %e, "status log tail failed");
                LOGS_UNAVAILABLE.to_string()
            }
        };
        let now = self.clock.now();
        Ok(StatusReport {
            time_remaining: format_remaining(entry.record.expires_at, now),
            recent_logs,
            recent_commands: entry.recent_commands(),
            record: entry.record.clone(),
        })
    }

    pub fn health(&self) -> HealthReport {
        let now = self.clock.now();
        HealthReport {
            running_terminals: self.registry.live_count(now),
            total_terminals: self.registry.len(),
            uptime_secs: (now - self.started_at).num_seconds().max(0) as u64,
            mirror_enabled: self.registry.mirror_enabled(),
        }
    }

    /// Session handle of the caller's running terminal, read once
    pub(crate) async fn session_handle(
        &self,
        identity: &Identity,
        terminal_id: &TerminalId,
    ) -> Result<String, OrchestratorError> {
        let entry = self.lock_owned(identity, terminal_id).await?;
        self.ensure_running(&entry)?;
        Ok(entry.record.session_handle.clone())
    }

    /// Destroy an expired terminal on behalf of the sweeper
    pub(crate) async fn reap(&self, terminal_id: &TerminalId) -> Reap {
        let Some(slot) = self.registry.slot(terminal_id) else {
            return Reap::Gone;
        };
        let mut entry = slot.lock().await;
        if entry.is_removed() {
            return Reap::Gone;
        }
        match self.teardown(&mut entry).await {
            Ok(()) => Reap::Reaped,
            Err(error) => {
                entry.teardown_failures += 1;
                Reap::Failed {
                    error,
                    failures: entry.teardown_failures,
                }
            }
        }
    }

    /// Wait for the terminal's slot and check it still exists and is the caller's
    async fn lock_owned(
        &self,
        identity: &Identity,
        terminal_id: &TerminalId,
    ) -> Result<OwnedMutexGuard<Entry>, OrchestratorError> {
        let slot = self
            .registry
            .slot(terminal_id)
            .ok_or_else(|| OrchestratorError::NotFound(terminal_id.clone()))?;
        let entry = slot.lock_owned().await;
        if entry.is_removed() {
            return Err(OrchestratorError::NotFound(terminal_id.clone()));
        }
        if !entry.record.is_owned_by(identity.agent_id()) {
            return Err(OrchestratorError::not_owner(terminal_id));
        }
        Ok(entry)
    }

    fn ensure_running(&self, entry: &Entry) -> Result<(), OrchestratorError> {
        if !entry.record.is_running() || entry.record.is_expired(self.clock.now()) {
            return Err(OrchestratorError::NotRunning(
                entry.record.terminal_id.clone(),
            ));
        }
        Ok(())
    }

    /// Stop the session, then drop the terminal from the registry.
    /// On provider failure the terminal stays registered and running.
    async fn teardown(&self, entry: &mut Entry) -> Result<(), OrchestratorError> {
        self.provider.stop(&entry.record.session_handle).await?;
        self.registry.remove(entry).await;
        Ok(())
    }
}

/// Drop the per-terminal log directory of a create that did not complete
async fn remove_log_dir(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_dir(path).await {
        tracing::debug!(path = %path.display(), error = %e, "log directory left in place");
    }
}

/// Caller environment with the orchestrator's identity variables on top
fn session_env(
    mut env: BTreeMap<String, String>,
    agent_id: &AgentId,
    terminal_id: &TerminalId,
) -> Vec<(String, String)> {
    env.insert("AGENT_ID".to_string(), agent_id.to_string());
    env.insert("TERMINAL_ID".to_string(), terminal_id.to_string());
    env.insert("LOG_DIR".to_string(), CONTAINER_LOG_DIR.to_string());
    env.into_iter().collect()
}

/// Single path segment safe to join under the log root
fn path_component(raw: &str) -> PathBuf {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => PathBuf::from("_"),
        _ => PathBuf::from(cleaned),
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
