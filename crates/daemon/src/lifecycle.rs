// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and adapter wiring.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tb_adapters::{
    Mirror, MirrorError, NoOpMirror, RedisMirror, SessionProvider, TracedProvider,
};
use tb_core::{CommandAudit, SystemClock, TerminalId, TerminalRecord, UuidIdGen};
use tb_engine::{LogGateway, ManagerDeps, Sweeper, TerminalManager, TokenVerifier};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;

/// Manager with the production clock and id source
pub type DaemonManager<P> = TerminalManager<TracedProvider<P>, MirrorBackend, SystemClock>;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory (set TB_STATE_DIR or HOME)")]
    NoStateDir,

    #[error("TB_TOKEN_SECRET is required")]
    MissingSecret,

    #[error("Invalid value for {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("Failed to load config file {}: {reason}", path.display())]
    ConfigFile { path: PathBuf, reason: String },

    #[error("Failed to bind {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mirror chosen at startup: Redis when configured and reachable, else none
#[derive(Clone)]
pub enum MirrorBackend {
    Redis(RedisMirror),
    Disabled(NoOpMirror),
}

impl MirrorBackend {
    /// Connect to `url` if set. An unreachable store disables mirroring
    /// rather than failing startup.
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else {
            info!("mirror not configured");
            return Self::Disabled(NoOpMirror::new());
        };
        match RedisMirror::connect(url).await {
            Ok(mirror) => {
                info!("mirror connected");
                Self::Redis(mirror)
            }
            Err(e) => {
                warn!(error = %e, "mirror unreachable, continuing without it");
                Self::Disabled(NoOpMirror::new())
            }
        }
    }
}

#[async_trait]
impl Mirror for MirrorBackend {
    fn is_enabled(&self) -> bool {
        match self {
            Self::Redis(m) => m.is_enabled(),
            Self::Disabled(m) => m.is_enabled(),
        }
    }

    async fn put_terminal(
        &self,
        record: &TerminalRecord,
        ttl: Duration,
    ) -> Result<(), MirrorError> {
        match self {
            Self::Redis(m) => m.put_terminal(record, ttl).await,
            Self::Disabled(m) => m.put_terminal(record, ttl).await,
        }
    }

    async fn push_command(
        &self,
        id: &TerminalId,
        entry: &CommandAudit,
        keep: usize,
        ttl: Duration,
    ) -> Result<(), MirrorError> {
        match self {
            Self::Redis(m) => m.push_command(id, entry, keep, ttl).await,
            Self::Disabled(m) => m.push_command(id, entry, keep, ttl).await,
        }
    }

    async fn remove_terminal(&self, id: &TerminalId) -> Result<(), MirrorError> {
        match self {
            Self::Redis(m) => m.remove_terminal(id).await,
            Self::Disabled(m) => m.remove_terminal(id).await,
        }
    }
}

/// Result of daemon startup: shared services plus the bound socket.
pub struct StartupResult<P> {
    pub manager: Arc<DaemonManager<P>>,
    pub gateway: LogGateway<TracedProvider<P>, MirrorBackend, SystemClock, UuidIdGen>,
    pub verifier: TokenVerifier,
    pub sweeper: Sweeper<TracedProvider<P>, MirrorBackend, SystemClock, UuidIdGen>,
    /// The TCP listener to spawn as a task
    pub listener: TcpListener,
}

/// Start the daemon over `provider`
pub async fn startup<P: SessionProvider>(
    config: &Config,
    provider: P,
) -> Result<StartupResult<P>, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.orchestrator.log_base_dir)?;

    let mirror = MirrorBackend::connect(config.mirror_url.as_deref()).await;
    let verifier = TokenVerifier::new(config.token_secret.as_bytes());

    let manager = Arc::new(TerminalManager::new(
        ManagerDeps {
            provider: TracedProvider::new(provider),
            mirror,
            clock: SystemClock,
            ids: UuidIdGen,
        },
        config.orchestrator.clone(),
    ));
    let gateway = LogGateway::new(Arc::clone(&manager), verifier.clone());
    let sweeper = Sweeper::new(Arc::clone(&manager));

    // Bind LAST, only after all validation passes
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.listen_addr, e))?;

    info!(
        addr = %config.listen_addr,
        image = %config.orchestrator.image,
        quota = config.orchestrator.max_terminals_per_agent,
        mirror = manager.registry().mirror_enabled(),
        "daemon started"
    );

    Ok(StartupResult {
        manager,
        gateway,
        verifier,
        sweeper,
        listener,
    })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
