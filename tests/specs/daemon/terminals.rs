//! Terminal lifecycle specs against a daemon with the no-op provider

use crate::prelude::*;

fn create(daemon: &Daemon, agent: &str) -> String {
    let json = daemon
        .tb_as(agent)
        .args(&["create", "--timeout-hours", "1", "-o", "json"])
        .passes()
        .json();
    assert_eq!(json["status"], "running");
    assert_eq!(json["agent_id"], agent);
    json["terminal_id"].as_str().unwrap().to_string()
}

#[test]
fn requests_without_a_token_are_rejected() {
    let daemon = Daemon::start();

    daemon.tb().args(&["list"]).fails().stderr_has("auth_invalid");
}

#[test]
fn token_signed_with_another_secret_is_rejected() {
    let daemon = Daemon::start();
    let forged = cli()
        .args(&["token", "a1"])
        .env("TB_TOKEN_SECRET", "not-the-daemon-secret")
        .passes()
        .stdout();

    daemon
        .tb()
        .env("TB_TOKEN", forged.trim())
        .args(&["list"])
        .fails()
        .stderr_has("auth_invalid");
}

#[test]
fn create_exec_destroy_roundtrip() {
    let daemon = Daemon::start();
    let id = create(&daemon, "a1");

    daemon
        .tb_as("a1")
        .args(&["list"])
        .passes()
        .stdout_has(&id)
        .stdout_has("running");

    let executed = daemon
        .tb_as("a1")
        .args(&["-o", "json", "exec", &id, "echo", "hi"])
        .passes()
        .json();
    assert_eq!(executed["exit_code"], 0);

    let status = daemon
        .tb_as("a1")
        .args(&["status", &id, "-o", "json"])
        .passes()
        .json();
    assert_eq!(status["terminal_id"], id.as_str());
    assert_eq!(status["recent_commands"][0]["command"], "echo hi");

    daemon
        .tb_as("a1")
        .args(&["destroy", &id])
        .passes()
        .stdout_has("Destroyed");

    daemon
        .tb_as("a1")
        .args(&["status", &id])
        .fails()
        .stderr_has("not_found");
}

#[test]
fn other_agents_cannot_touch_a_terminal() {
    let daemon = Daemon::start();
    let id = create(&daemon, "a1");

    daemon
        .tb_as("a2")
        .args(&["exec", &id, "ls"])
        .fails()
        .stderr_has("ownership_mismatch");
    daemon
        .tb_as("a2")
        .args(&["list"])
        .passes()
        .stdout_lacks(&id);
}

#[test]
fn quota_caps_running_terminals_per_agent() {
    let daemon = Daemon::start_with(&[("TB_MAX_TERMINALS_PER_AGENT", "1")]);
    create(&daemon, "a1");

    daemon
        .tb_as("a1")
        .args(&["create"])
        .fails()
        .stderr_has("quota_exceeded");
    // Another agent has its own budget
    create(&daemon, "a2");
}

#[test]
fn stream_reports_when_the_session_output_ends() {
    let daemon = Daemon::start();
    let id = create(&daemon, "a1");

    daemon
        .tb_as("a1")
        .args(&["stream", &id])
        .passes()
        .stderr_has("stream ended: session_ended");
}

#[test]
fn unknown_terminal_is_not_found() {
    let daemon = Daemon::start();

    daemon
        .tb_as("a1")
        .args(&["logs", "no-such-terminal"])
        .fails()
        .stderr_has("not_found");
}
