// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use tb_core::ExecOutcome;
use tb_daemon::protocol::{read_request, write_response};
use tb_daemon::{Request, Response, DEFAULT_TIMEOUT};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use yare::parameterized;

use super::{exec_wait, timeout_ipc, ClientError, DaemonClient};

/// Accept one connection, record its request, then reply with `frames` in order.
async fn serve_once(frames: Vec<Response>) -> (String, JoinHandle<Request>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (mut reader, mut writer) = stream.into_split();
        let request = read_request(&mut reader, DEFAULT_TIMEOUT).await.unwrap();
        for frame in &frames {
            write_response(&mut writer, frame, DEFAULT_TIMEOUT)
                .await
                .unwrap();
        }
        request
    });
    (addr, task)
}

#[tokio::test]
async fn execute_sends_the_token_and_returns_the_outcome() {
    let outcome = ExecOutcome {
        output: "hi\n".to_string(),
        error: String::new(),
        exit_code: 0,
        execution_time: 0.01,
    };
    let (addr, server) = serve_once(vec![Response::Executed {
        result: outcome.clone(),
    }])
    .await;
    let client = DaemonClient::new(addr, Some("tok".to_string()));

    let result = client.execute("term-1", "echo hi", Some(10)).await.unwrap();

    assert_eq!(result, outcome);
    match server.await.unwrap() {
        Request::ExecuteCommand {
            token,
            terminal_id,
            command,
            timeout,
        } => {
            assert_eq!(token.as_deref(), Some("tok"));
            assert_eq!(terminal_id, "term-1");
            assert_eq!(command, "echo hi");
            assert_eq!(timeout, Some(10));
        }
        other => panic!("unexpected request: {:?}", other),
    }
}

#[tokio::test]
async fn error_responses_become_rejections_with_the_code() {
    let (addr, _server) = serve_once(vec![Response::error("not_found", "terminal missing")]).await;
    let client = DaemonClient::new(addr, Some("tok".to_string()));

    let err = client.destroy("missing").await.unwrap_err();

    assert_eq!(err.code(), Some("not_found"));
    assert_eq!(err.to_string(), "terminal missing (not_found)");
}

#[tokio::test]
async fn mismatched_response_is_unexpected() {
    let (addr, _server) = serve_once(vec![Response::Pong]).await;
    let client = DaemonClient::new(addr, None);

    let err = client.list().await.unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedResponse));
}

#[tokio::test]
async fn closed_port_reports_daemon_not_running() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let client = DaemonClient::new(addr.clone(), None);
    let err = client.health().await.unwrap_err();

    match err {
        ClientError::DaemonNotRunning(a) => assert_eq!(a, addr),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn stream_collects_lines_until_the_end_frame() {
    let (addr, server) = serve_once(vec![
        Response::StreamStarted {
            terminal_id: "term-1".into(),
        },
        Response::LogLine {
            line: "one".to_string(),
        },
        Response::LogLine {
            line: "two".to_string(),
        },
        Response::StreamEnded {
            reason: "session_ended".to_string(),
        },
    ])
    .await;
    let client = DaemonClient::new(addr, Some("tok".to_string()));

    let mut lines = Vec::new();
    let reason = client
        .stream("term-1", |line| lines.push(line.to_string()))
        .await
        .unwrap();

    assert_eq!(reason, "session_ended");
    assert_eq!(lines, vec!["one", "two"]);
    assert!(matches!(server.await.unwrap(), Request::StreamLogs { .. }));
}

#[tokio::test]
async fn stream_refusal_is_a_rejection() {
    let (addr, _server) = serve_once(vec![Response::error("auth_invalid", "bad token")]).await;
    let client = DaemonClient::new(addr, Some("junk".to_string()));

    let err = client.stream("term-1", |_| {}).await.unwrap_err();
    assert_eq!(err.code(), Some("auth_invalid"));
}

#[parameterized(
    unset = { None, 30 },
    below_floor = { Some(0), 1 },
    within = { Some(120), 120 },
    above_cap = { Some(10_000), 600 },
)]
fn exec_wait_clamps_the_command_budget(timeout: Option<i64>, secs: u64) {
    assert_eq!(exec_wait(timeout), Duration::from_secs(secs) + timeout_ipc());
}
