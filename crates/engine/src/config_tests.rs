// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    unset     = { None, 4 * 3600 },
    one_hour  = { Some(1), 3600 },
    at_max    = { Some(4), 4 * 3600 },
    over_max  = { Some(48), 4 * 3600 },
    zero      = { Some(0), 4 * 3600 },
    negative  = { Some(-3), 4 * 3600 },
    huge      = { Some(i64::MAX), 4 * 3600 },
)]
fn session_timeout(hours: Option<i64>, expected_secs: u64) {
    let config = OrchestratorConfig::default();
    assert_eq!(
        config.session_timeout(hours),
        Duration::from_secs(expected_secs)
    );
}

#[yare::parameterized(
    unset    = { None, 30 },
    explicit = { Some(5), 5 },
    clamped  = { Some(3600), 600 },
    zero     = { Some(0), 30 },
)]
fn exec_timeout(secs: Option<i64>, expected_secs: u64) {
    let config = OrchestratorConfig::default();
    assert_eq!(config.exec_timeout(secs), Duration::from_secs(expected_secs));
}

#[test]
fn log_lines_fall_back_to_default() {
    let config = OrchestratorConfig::default();
    assert_eq!(config.log_lines(None), 100);
    assert_eq!(config.log_lines(Some(0)), 100);
    assert_eq!(config.log_lines(Some(7)), 7);
}
