// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource limits applied to every terminal session

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Hard memory cap in megabytes
    pub memory_mb: u64,
    /// Share of a single CPU, in percent (50 = half a core)
    pub cpu_percent: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_mb: 512,
            cpu_percent: 50,
        }
    }
}
