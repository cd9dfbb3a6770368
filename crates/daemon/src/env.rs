// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use crate::lifecycle::LifecycleError;

pub const CONFIG: &str = "TB_CONFIG";
pub const STATE_DIR: &str = "TB_STATE_DIR";
pub const LISTEN_ADDR: &str = "TB_LISTEN_ADDR";
pub const TOKEN_SECRET: &str = "TB_TOKEN_SECRET";
pub const MIRROR_URL: &str = "TB_MIRROR_URL";
pub const PROVIDER: &str = "TB_PROVIDER";
pub const DOCKER_BINARY: &str = "TB_DOCKER_BINARY";
pub const DOCKER_NETWORK: &str = "TB_DOCKER_NETWORK";
pub const IMAGE: &str = "TB_IMAGE";
pub const LOG_BASE_DIR: &str = "TB_LOG_BASE_DIR";
pub const MAX_TERMINALS_PER_AGENT: &str = "TB_MAX_TERMINALS_PER_AGENT";
pub const DEFAULT_TIMEOUT_HOURS: &str = "TB_DEFAULT_TIMEOUT_HOURS";
pub const MAX_TIMEOUT_HOURS: &str = "TB_MAX_TIMEOUT_HOURS";
pub const SWEEP_INTERVAL_SECS: &str = "TB_SWEEP_INTERVAL_SECS";
pub const MEMORY_MB: &str = "TB_MEMORY_MB";
pub const CPU_PERCENT: &str = "TB_CPU_PERCENT";

/// Read a variable from the process environment; blank counts as unset
pub fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve state directory: TB_STATE_DIR > XDG_STATE_HOME/termbridge > ~/.local/state/termbridge
pub fn state_dir(lookup: &dyn Fn(&str) -> Option<String>) -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = lookup(STATE_DIR) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = lookup("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("termbridge"));
    }
    let home = lookup("HOME").ok_or(LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/termbridge"))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
