// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator tuning knobs

use std::path::PathBuf;
use std::time::Duration;
use tb_core::ResourceLimits;

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Container image every session runs
    pub image: String,
    /// Host root for per-terminal log directories
    pub log_base_dir: PathBuf,
    pub max_terminals_per_agent: usize,
    /// Session lifetime when the request leaves it unset or non-positive
    pub default_timeout: Duration,
    /// Upper bound on requested session lifetime
    pub max_timeout: Duration,
    pub default_exec_timeout: Duration,
    pub max_exec_timeout: Duration,
    pub default_log_lines: u32,
    /// Lines of recent output included in status
    pub status_log_lines: u32,
    /// Recent commands retained per terminal
    pub audit_window: usize,
    pub limits: ResourceLimits,
    pub sweep_interval: Duration,
    /// Consecutive teardown failures before the sweeper raises an alert
    pub sweep_alert_after: u32,
    /// Hide expired-but-unreaped terminals from listings
    pub list_running_only: bool,
}

const HOUR: Duration = Duration::from_secs(3600);

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            image: "minimal-agent-terminal:latest".to_string(),
            log_base_dir: PathBuf::from("/tmp/agent-logs"),
            max_terminals_per_agent: 5,
            default_timeout: HOUR * 4,
            max_timeout: HOUR * 4,
            default_exec_timeout: Duration::from_secs(30),
            max_exec_timeout: Duration::from_secs(600),
            default_log_lines: 100,
            status_log_lines: 10,
            audit_window: 100,
            limits: ResourceLimits::default(),
            sweep_interval: Duration::from_secs(300),
            sweep_alert_after: 3,
            list_running_only: false,
        }
    }
}

impl OrchestratorConfig {
    /// Session lifetime for a request of `hours`
    pub fn session_timeout(&self, hours: Option<i64>) -> Duration {
        match hours {
            Some(h) if h > 0 => {
                Duration::from_secs((h as u64).saturating_mul(3600)).min(self.max_timeout)
            }
            _ => self.default_timeout.min(self.max_timeout),
        }
    }

    /// Command deadline for a request of `secs`
    pub fn exec_timeout(&self, secs: Option<i64>) -> Duration {
        match secs {
            Some(s) if s > 0 => Duration::from_secs(s as u64).min(self.max_exec_timeout),
            _ => self.default_exec_timeout.min(self.max_exec_timeout),
        }
    }

    pub fn log_lines(&self, lines: Option<u32>) -> u32 {
        match lines {
            Some(n) if n > 0 => n,
            _ => self.default_log_lines,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
