// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short human-readable durations for listings.

use chrono::{DateTime, Utc};

/// Format seconds as `"5s"`, `"2m"`, `"1h30m"`, `"3d"`.
///
/// Minutes are shown alongside hours only when non-zero.
pub fn format_span(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        if m > 0 {
            format!("{}h{}m", h, m)
        } else {
            format!("{}h", h)
        }
    } else {
        format!("{}d", secs / 86400)
    }
}

/// Time left until `deadline`, or `"expired"` once it has passed.
pub fn format_remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (deadline - now).num_seconds();
    if secs <= 0 {
        "expired".to_string()
    } else {
        format_span(secs as u64)
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
