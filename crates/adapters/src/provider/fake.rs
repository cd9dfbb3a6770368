// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake session provider for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{LogStream, ProviderError, SessionProvider, SessionSpec};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tb_core::ExecOutcome;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Recorded provider call
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    Start { spec: SessionSpec },
    Exec { handle: String, command: String, timeout: Duration },
    TailLogs { handle: String, lines: u32 },
    StreamLogs { handle: String },
    Stop { handle: String },
}

/// Provider operation, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    Start,
    Exec,
    TailLogs,
    StreamLogs,
    Stop,
}

/// Fake session state
#[derive(Debug, Clone)]
pub struct FakeSession {
    pub spec: SessionSpec,
    pub output: Vec<String>,
    pub running: bool,
}

type LineSender = mpsc::UnboundedSender<Result<String, ProviderError>>;

#[derive(Default)]
struct FakeProviderState {
    sessions: HashMap<String, FakeSession>,
    calls: Vec<ProviderCall>,
    next_id: u64,
    fail_next: HashMap<ProviderOp, ProviderError>,
    fail_always: HashMap<ProviderOp, ProviderError>,
    exec_results: HashMap<String, ExecOutcome>,
    exec_delay: Option<Duration>,
    exec_stall: Option<Duration>,
    subscribers: HashMap<String, Vec<LineSender>>,
}

impl FakeProviderState {
    fn take_failure(&mut self, op: ProviderOp) -> Option<ProviderError> {
        self.fail_next
            .remove(&op)
            .or_else(|| self.fail_always.get(&op).cloned())
    }

    fn running_session(&self, handle: &str) -> Result<&FakeSession, ProviderError> {
        match self.sessions.get(handle) {
            Some(session) if session.running => Ok(session),
            _ => Err(ProviderError::Rejected(format!("no such session: {}", handle))),
        }
    }
}

/// Fake session provider for testing.
///
/// By default `echo X` produces `X\n` and every other command succeeds with
/// no output. Results, delays, failures and live log lines are scripted
/// through the setters below.
#[derive(Clone, Default)]
pub struct FakeProvider {
    inner: Arc<Mutex<FakeProviderState>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.inner.lock().calls.clone()
    }

    /// Get a session by handle
    pub fn get_session(&self, handle: &str) -> Option<FakeSession> {
        self.inner.lock().sessions.get(handle).cloned()
    }

    /// Handles of sessions that have not been stopped
    pub fn running_handles(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut handles: Vec<_> = inner
            .sessions
            .iter()
            .filter(|(_, s)| s.running)
            .map(|(h, _)| h.clone())
            .collect();
        handles.sort();
        handles
    }

    /// Fail the next call of `op` only
    pub fn fail_next(&self, op: ProviderOp, error: ProviderError) {
        self.inner.lock().fail_next.insert(op, error);
    }

    /// Fail every call of `op` until cleared
    pub fn fail_always(&self, op: ProviderOp, error: ProviderError) {
        self.inner.lock().fail_always.insert(op, error);
    }

    pub fn clear_failures(&self) {
        let mut inner = self.inner.lock();
        inner.fail_next.clear();
        inner.fail_always.clear();
    }

    /// Script the outcome of an exact command string
    pub fn set_exec_result(&self, command: &str, outcome: ExecOutcome) {
        self.inner
            .lock()
            .exec_results
            .insert(command.to_string(), outcome);
    }

    /// Make every exec take `delay`; execs whose timeout is shorter time out
    pub fn set_exec_delay(&self, delay: Duration) {
        self.inner.lock().exec_delay = Some(delay);
    }

    /// Make every exec block for `stall` before anything else, ignoring its timeout
    pub fn set_exec_stall(&self, stall: Duration) {
        self.inner.lock().exec_stall = Some(stall);
    }

    /// Replace the retained output of a session
    pub fn set_output(&self, handle: &str, output: Vec<String>) {
        if let Some(session) = self.inner.lock().sessions.get_mut(handle) {
            session.output = output;
        }
    }

    /// Append a line of session output and deliver it to live subscribers
    pub fn emit_line(&self, handle: &str, line: &str) {
        let mut inner = self.inner.lock();
        if let Some(session) = inner.sessions.get_mut(handle) {
            session.output.push(line.to_string());
        }
        if let Some(senders) = inner.subscribers.get_mut(handle) {
            senders.retain(|tx| tx.send(Ok(line.to_string())).is_ok());
        }
    }

    /// End all live streams of a session as if it exited
    pub fn end_stream(&self, handle: &str) {
        self.inner.lock().subscribers.remove(handle);
    }

    /// Deliver an error to live subscribers, then end their streams
    pub fn fail_stream(&self, handle: &str, error: ProviderError) {
        if let Some(senders) = self.inner.lock().subscribers.remove(handle) {
            for tx in senders {
                let _ = tx.send(Err(error.clone()));
            }
        }
    }

    /// Number of subscriptions whose consumer has not dropped the stream
    pub fn live_subscribers(&self, handle: &str) -> usize {
        self.inner
            .lock()
            .subscribers
            .get(handle)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

fn default_outcome(command: &str) -> ExecOutcome {
    let output = match command.strip_prefix("echo ") {
        Some(text) => format!("{}\n", text),
        None => String::new(),
    };
    ExecOutcome::new(output, String::new(), 0, Duration::from_millis(1))
}

#[async_trait]
impl SessionProvider for FakeProvider {
    async fn start(&self, spec: &SessionSpec) -> Result<String, ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Start { spec: spec.clone() });
        if let Some(err) = inner.take_failure(ProviderOp::Start) {
            return Err(err);
        }

        inner.next_id += 1;
        let handle = format!("fake-{}", inner.next_id);
        inner.sessions.insert(
            handle.clone(),
            FakeSession {
                spec: spec.clone(),
                output: Vec::new(),
                running: true,
            },
        );
        Ok(handle)
    }

    async fn exec(
        &self,
        handle: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecOutcome, ProviderError> {
        let (outcome, delay, stall) = {
            let mut inner = self.inner.lock();
            inner.calls.push(ProviderCall::Exec {
                handle: handle.to_string(),
                command: command.to_string(),
                timeout,
            });
            if let Some(err) = inner.take_failure(ProviderOp::Exec) {
                return Err(err);
            }
            inner.running_session(handle)?;
            let outcome = inner
                .exec_results
                .get(command)
                .cloned()
                .unwrap_or_else(|| default_outcome(command));
            (outcome, inner.exec_delay, inner.exec_stall)
        };

        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }

        if let Some(delay) = delay {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(ProviderError::Timeout(timeout));
            }
            tokio::time::sleep(delay).await;
        }
        Ok(outcome)
    }

    async fn tail_logs(&self, handle: &str, lines: u32) -> Result<String, ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::TailLogs {
            handle: handle.to_string(),
            lines,
        });
        if let Some(err) = inner.take_failure(ProviderOp::TailLogs) {
            return Err(err);
        }
        let session = inner.running_session(handle)?;
        let skip = session.output.len().saturating_sub(lines as usize);
        Ok(session.output[skip..]
            .iter()
            .map(|line| format!("{}\n", line))
            .collect())
    }

    async fn stream_logs(&self, handle: &str) -> Result<LogStream, ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::StreamLogs {
            handle: handle.to_string(),
        });
        if let Some(err) = inner.take_failure(ProviderOp::StreamLogs) {
            return Err(err);
        }
        inner.running_session(handle)?;

        let (tx, rx) = mpsc::unbounded_channel();
        inner
            .subscribers
            .entry(handle.to_string())
            .or_default()
            .push(tx);
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    async fn stop(&self, handle: &str) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Stop {
            handle: handle.to_string(),
        });
        if let Some(err) = inner.take_failure(ProviderOp::Stop) {
            return Err(err);
        }
        if let Some(session) = inner.sessions.get_mut(handle) {
            session.running = false;
        }
        inner.subscribers.remove(handle);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
