// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::{CreateTerminal, Identity, ManagerDeps, OrchestratorConfig, TerminalManager};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tb_adapters::{FakeMirror, FakeProvider};
use tb_core::{AgentId, FakeClock, SequentialIdGen, TerminalId, TerminalRecord, TerminalStatus};
use tempfile::TempDir;

pub(crate) const SECRET: &[u8] = b"engine-test-secret";

/// Convenience alias for the fully-typed test manager.
pub(crate) type TestManager = TerminalManager<FakeProvider, FakeMirror, FakeClock, SequentialIdGen>;

/// Test context holding the manager and handles to its fakes.
pub(crate) struct TestContext {
    pub manager: Arc<TestManager>,
    pub provider: FakeProvider,
    pub mirror: FakeMirror,
    pub clock: FakeClock,
    pub log_root: TempDir,
}

pub(crate) fn setup() -> TestContext {
    setup_with(OrchestratorConfig::default())
}

/// Manager over fresh fakes; `log_base_dir` is redirected to a temp dir.
pub(crate) fn setup_with(mut config: OrchestratorConfig) -> TestContext {
    let log_root = tempfile::tempdir().unwrap();
    config.log_base_dir = log_root.path().to_path_buf();

    let provider = FakeProvider::new();
    let mirror = FakeMirror::new();
    let clock = FakeClock::new();
    let manager = TerminalManager::new(
        ManagerDeps {
            provider: provider.clone(),
            mirror: mirror.clone(),
            clock: clock.clone(),
            ids: SequentialIdGen::new("term"),
        },
        config,
    );

    TestContext {
        manager: Arc::new(manager),
        provider,
        mirror,
        clock,
        log_root,
    }
}

pub(crate) fn identity(agent: &str) -> Identity {
    Identity::new(AgentId::new(agent))
}

/// Create a terminal for `agent` with a one-hour lifetime.
pub(crate) async fn create_for(ctx: &TestContext, agent: &str) -> TerminalRecord {
    ctx.manager
        .create(
            &identity(agent),
            CreateTerminal {
                timeout_hours: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

/// A running record built by hand, for registry-level tests.
pub(crate) fn record(
    id: &str,
    agent: &str,
    created_at: DateTime<Utc>,
    lifetime: chrono::Duration,
) -> TerminalRecord {
    TerminalRecord {
        terminal_id: TerminalId::new(id),
        agent_id: AgentId::new(agent),
        session_handle: format!("handle-{}", id),
        status: TerminalStatus::Running,
        created_at,
        expires_at: created_at + lifetime,
        command: "bash".to_string(),
        log_location: PathBuf::from("/tmp/agent-logs").join(agent).join(id),
    }
}
