// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background reclamation of expired terminals

use crate::manager::{Reap, TerminalManager};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tb_adapters::{Mirror, SessionProvider};
use tb_core::{Clock, IdGen, TerminalId};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Outcome of one sweep pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub reaped: Vec<TerminalId>,
    /// Terminals left registered for the next pass, with the reason
    pub failed: Vec<(TerminalId, String)>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.reaped.is_empty() && self.failed.is_empty()
    }
}

pub struct Sweeper<P, M, C, I> {
    manager: Arc<TerminalManager<P, M, C, I>>,
    interval: Duration,
    alert_after: u32,
}

impl<P, M, C, I> Sweeper<P, M, C, I>
where
    P: SessionProvider,
    M: Mirror,
    C: Clock,
    I: IdGen,
{
    pub fn new(manager: Arc<TerminalManager<P, M, C, I>>) -> Self {
        let interval = manager.config().sweep_interval;
        let alert_after = manager.config().sweep_alert_after;
        Self {
            manager,
            interval,
            alert_after,
        }
    }

    /// Destroy every running terminal whose deadline is at or before `now`.
    ///
    /// Terminals are torn down concurrently so one slow teardown does not
    /// hold up the rest. Failures never abort the pass.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepReport {
        let expired = self.manager.registry().expired(now);
        if expired.is_empty() {
            return SweepReport::default();
        }

        let results = futures::future::join_all(expired.into_iter().map(|id| async move {
            let outcome = self.manager.reap(&id).await;
            (id, outcome)
        }))
        .await;

        let mut report = SweepReport::default();
        for (terminal_id, outcome) in results {
            match outcome {
                Reap::Reaped => {
                    tracing::info!(%terminal_id, "reaped expired terminal");
                    report.reaped.push(terminal_id);
                }
                Reap::Gone => {}
                Reap::Failed { error, failures } => {
                    if failures >= self.alert_after {
                        tracing::error!(
                            %terminal_id,
                            failures,
                            alert = true,
                            error = %error,
                            "expired terminal keeps failing teardown"
                        );
                    } else {
                        tracing::warn!(%terminal_id, failures, error = %error, "teardown failed, will retry");
                    }
                    report.failed.push((terminal_id, error.to_string()));
                }
            }
        }
        report
    }

    /// Sweep every interval until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let report = self.sweep_once(self.manager.clock().now()).await;
                    if !report.is_empty() {
                        tracing::info!(
                            reaped = report.reaped.len(),
                            failed = report.failed.len(),
                            "sweep complete"
                        );
                    }
                }
            }
        }
        tracing::debug!("sweeper stopped");
    }
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;
