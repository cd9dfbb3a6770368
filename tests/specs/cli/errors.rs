//! CLI error reporting specs

use crate::prelude::*;

#[test]
fn unreachable_daemon_is_reported_on_stderr() {
    let addr = free_addr();
    let out = cli()
        .args(&["list"])
        .env("TB_ADDR", &addr)
        .env("TB_TOKEN", "whatever")
        .fails()
        .stderr_has("Daemon not reachable");
    assert_eq!(out.code(), Some(1));
    assert!(out.stdout().is_empty());
}

#[test]
fn malformed_env_pair_is_a_usage_error() {
    cli()
        .args(&["create", "-e", "NOEQUALS"])
        .fails()
        .stderr_has("KEY=VALUE");
}
