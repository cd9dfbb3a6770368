//! Daemon startup and shutdown specs

use std::process::Command;

use crate::prelude::*;

#[test]
fn health_reports_an_empty_daemon() {
    let daemon = Daemon::start();

    daemon
        .tb()
        .args(&["health"])
        .passes()
        .stdout_has("0 running / 0 total")
        .stdout_has("Mirror: disabled");
}

#[test]
fn health_json_carries_counts() {
    let daemon = Daemon::start();

    let json = daemon.tb().args(&["health", "-o", "json"]).passes().json();
    assert_eq!(json["running_terminals"], 0);
    assert_eq!(json["mirror_enabled"], false);
    assert_eq!(json["addr"], daemon.addr());
}

#[test]
fn startup_writes_marker_and_log() {
    let daemon = Daemon::start();

    let ready = wait_for(WAIT_MAX_MS, || daemon.log().contains("daemon ready"));
    assert!(ready, "log: {}", daemon.log());
    assert!(daemon.log().contains("--- tbd: starting (pid: "));
}

#[test]
fn sigterm_stops_cleanly() {
    let mut daemon = Daemon::start();

    assert_eq!(daemon.stop(), Some(0));
    let stopped = wait_for(WAIT_MAX_MS, || daemon.log().contains("daemon stopped"));
    assert!(stopped, "log: {}", daemon.log());
}

#[test]
fn missing_secret_refuses_to_start() {
    let state = tempfile::tempdir().unwrap();
    let out = Command::new(tbd_binary())
        .env_clear()
        .env("TB_PROVIDER", "noop")
        .env("TB_STATE_DIR", state.path())
        .env("TB_LISTEN_ADDR", free_addr())
        .output()
        .unwrap();
    assert!(!out.status.success());
}

#[test]
fn invalid_numeric_setting_refuses_to_start() {
    let state = tempfile::tempdir().unwrap();
    let out = Command::new(tbd_binary())
        .env_clear()
        .env("TB_PROVIDER", "noop")
        .env("TB_TOKEN_SECRET", DAEMON_SECRET)
        .env("TB_STATE_DIR", state.path())
        .env("TB_LISTEN_ADDR", free_addr())
        .env("TB_MAX_TERMINALS_PER_AGENT", "lots")
        .output()
        .unwrap();
    assert!(!out.status.success());
}
