// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::time::Duration;

pub const ADDR: &str = "TB_ADDR";
pub const TOKEN: &str = "TB_TOKEN";
pub const TOKEN_SECRET: &str = "TB_TOKEN_SECRET";

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

// --- Color ---

pub fn no_color() -> bool {
    std::env::var("NO_COLOR").is_ok_and(|v| v == "1")
}

pub fn force_color() -> bool {
    std::env::var("COLOR").is_ok_and(|v| v == "1")
}

// --- Timeouts ---

pub fn timeout_ipc_ms() -> Option<Duration> {
    parse_duration_ms("TB_TIMEOUT_IPC_MS")
}

pub fn timeout_connect_ms() -> Option<Duration> {
    parse_duration_ms("TB_TIMEOUT_CONNECT_MS")
}
