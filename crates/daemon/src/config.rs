// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: an optional TOML file overridden by `TB_*` variables.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tb_engine::OrchestratorConfig;

use crate::env;
use crate::lifecycle::LifecycleError;

/// Which session backend the daemon drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Docker,
    /// Sessions that do nothing; for smoke tests without a container engine
    Noop,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "docker" => Ok(Self::Docker),
            "noop" => Ok(Self::Noop),
            other => Err(format!("unknown provider '{}' (expected docker or noop)", other)),
        }
    }
}

/// Contents of the TOML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    listen_addr: Option<SocketAddr>,
    token_secret: Option<String>,
    mirror_url: Option<String>,
    provider: Option<ProviderKind>,
    docker_binary: Option<String>,
    docker_network: Option<String>,
    image: Option<String>,
    log_base_dir: Option<PathBuf>,
    max_terminals_per_agent: Option<usize>,
    default_timeout_hours: Option<u64>,
    max_timeout_hours: Option<u64>,
    default_exec_timeout_secs: Option<u64>,
    max_exec_timeout_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    sweep_alert_after: Option<u32>,
    memory_mb: Option<u64>,
    cpu_percent: Option<u32>,
    audit_window: Option<usize>,
    list_running_only: Option<bool>,
}

/// Daemon configuration
#[derive(Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/termbridge)
    pub state_dir: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    pub listen_addr: SocketAddr,
    /// HS256 signing secret for agent tokens
    pub token_secret: String,
    pub mirror_url: Option<String>,
    pub provider: ProviderKind,
    pub docker_binary: String,
    pub docker_network: String,
    pub orchestrator: OrchestratorConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("state_dir", &self.state_dir)
            .field("log_path", &self.log_path)
            .field("listen_addr", &self.listen_addr)
            .field("token_secret", &"<redacted>")
            .field("mirror_url", &self.mirror_url)
            .field("provider", &self.provider)
            .field("docker_binary", &self.docker_binary)
            .field("docker_network", &self.docker_network)
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}

const HOUR_SECS: u64 = 3600;
/// Longest session lifetime a config may allow (one year)
const MAX_SESSION_HOURS: u64 = 24 * 365;

impl Config {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self, LifecycleError> {
        Self::resolve(&env::var)
    }

    /// Build configuration from `lookup`, reading the file it names in
    /// `TB_CONFIG` if any. Environment values win over file values.
    pub fn resolve(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, LifecycleError> {
        let file = match lookup(env::CONFIG) {
            Some(path) => read_file(Path::new(&path))?,
            None => FileConfig::default(),
        };
        let state_dir = env::state_dir(lookup)?;
        let defaults = OrchestratorConfig::default();

        let token_secret = lookup(env::TOKEN_SECRET)
            .or(file.token_secret)
            .filter(|s| !s.is_empty())
            .ok_or(LifecycleError::MissingSecret)?;

        let listen_addr = setting(lookup, env::LISTEN_ADDR, file.listen_addr)?.unwrap_or_else(
            || SocketAddr::from(([127, 0, 0, 1], tb_daemon::protocol::DEFAULT_PORT)),
        );
        let provider =
            setting(lookup, env::PROVIDER, file.provider)?.unwrap_or(ProviderKind::Docker);

        let max_terminals = positive(
            env::MAX_TERMINALS_PER_AGENT,
            setting(lookup, env::MAX_TERMINALS_PER_AGENT, file.max_terminals_per_agent)?,
        )?;
        let default_hours = positive(
            env::DEFAULT_TIMEOUT_HOURS,
            setting(lookup, env::DEFAULT_TIMEOUT_HOURS, file.default_timeout_hours)?,
        )?;
        let max_hours = positive(
            env::MAX_TIMEOUT_HOURS,
            setting(lookup, env::MAX_TIMEOUT_HOURS, file.max_timeout_hours)?,
        )?;
        let sweep_secs = positive(
            env::SWEEP_INTERVAL_SECS,
            setting(lookup, env::SWEEP_INTERVAL_SECS, file.sweep_interval_secs)?,
        )?;
        let memory_mb = positive(
            env::MEMORY_MB,
            setting(lookup, env::MEMORY_MB, file.memory_mb)?,
        )?;
        let cpu_percent = positive(
            env::CPU_PERCENT,
            setting(lookup, env::CPU_PERCENT, file.cpu_percent)?,
        )?;

        let mut orchestrator = OrchestratorConfig {
            image: lookup(env::IMAGE).or(file.image).unwrap_or(defaults.image),
            log_base_dir: lookup(env::LOG_BASE_DIR)
                .map(PathBuf::from)
                .or(file.log_base_dir)
                .unwrap_or(defaults.log_base_dir),
            max_terminals_per_agent: max_terminals.unwrap_or(defaults.max_terminals_per_agent),
            default_timeout: hours(env::DEFAULT_TIMEOUT_HOURS, default_hours)?
                .unwrap_or(defaults.default_timeout),
            max_timeout: hours(env::MAX_TIMEOUT_HOURS, max_hours)?
                .unwrap_or(defaults.max_timeout),
            default_exec_timeout: file
                .default_exec_timeout_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_exec_timeout),
            max_exec_timeout: file
                .max_exec_timeout_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_exec_timeout),
            sweep_interval: sweep_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            sweep_alert_after: file
                .sweep_alert_after
                .unwrap_or(defaults.sweep_alert_after),
            audit_window: positive("audit_window", file.audit_window)?
                .unwrap_or(defaults.audit_window),
            list_running_only: file
                .list_running_only
                .unwrap_or(defaults.list_running_only),
            ..defaults
        };
        if let Some(mb) = memory_mb {
            orchestrator.limits.memory_mb = mb;
        }
        if let Some(pct) = cpu_percent {
            orchestrator.limits.cpu_percent = pct;
        }
        if orchestrator.default_timeout > orchestrator.max_timeout {
            return Err(LifecycleError::InvalidSetting {
                name: env::DEFAULT_TIMEOUT_HOURS,
                reason: "exceeds the maximum session timeout".to_string(),
            });
        }

        Ok(Self {
            log_path: state_dir.join("daemon.log"),
            state_dir,
            listen_addr,
            token_secret,
            mirror_url: lookup(env::MIRROR_URL).or(file.mirror_url),
            provider,
            docker_binary: lookup(env::DOCKER_BINARY)
                .or(file.docker_binary)
                .unwrap_or_else(|| "docker".to_string()),
            docker_network: lookup(env::DOCKER_NETWORK)
                .or(file.docker_network)
                .unwrap_or_else(|| "bridge".to_string()),
            orchestrator,
        })
    }
}

fn read_file(path: &Path) -> Result<FileConfig, LifecycleError> {
    let text = std::fs::read_to_string(path).map_err(|e| LifecycleError::ConfigFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    toml::from_str(&text).map_err(|e| LifecycleError::ConfigFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Environment value for `name` parsed as `T`, else the file value
fn setting<T>(
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &'static str,
    file_value: Option<T>,
) -> Result<Option<T>, LifecycleError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| LifecycleError::InvalidSetting {
                name,
                reason: format!("'{}': {}", raw, e),
            }),
        None => Ok(file_value),
    }
}

fn positive<T>(name: &'static str, value: Option<T>) -> Result<Option<T>, LifecycleError>
where
    T: PartialOrd + Default,
{
    match value {
        Some(v) if v <= T::default() => Err(LifecycleError::InvalidSetting {
            name,
            reason: "must be greater than zero".to_string(),
        }),
        other => Ok(other),
    }
}

fn hours(name: &'static str, value: Option<u64>) -> Result<Option<Duration>, LifecycleError> {
    match value {
        Some(h) if h > MAX_SESSION_HOURS => Err(LifecycleError::InvalidSetting {
            name,
            reason: format!("must be at most {} hours", MAX_SESSION_HOURS),
        }),
        other => Ok(other.map(|h| Duration::from_secs(h.saturating_mul(HOUR_SECS)))),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
