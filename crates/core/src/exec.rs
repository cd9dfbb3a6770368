// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command execution results and the per-terminal audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of one command run inside a terminal. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub output: String,
    pub error: String,
    pub exit_code: i32,
    /// Wall time in seconds
    pub execution_time: f64,
}

impl ExecOutcome {
    pub fn new(
        output: impl Into<String>,
        error: impl Into<String>,
        exit_code: i32,
        elapsed: Duration,
    ) -> Self {
        Self {
            output: output.into(),
            error: error.into(),
            exit_code,
            execution_time: elapsed.as_secs_f64(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Entry in a terminal's bounded recent-command log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandAudit {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub exit_code: i32,
    pub execution_time: f64,
}

impl CommandAudit {
    pub fn from_outcome(command: &str, outcome: &ExecOutcome, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at,
            command: command.to_string(),
            exit_code: outcome.exit_code,
            execution_time: outcome.execution_time,
        }
    }
}
