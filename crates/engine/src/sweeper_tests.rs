// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{create_for, identity, setup, setup_with};
use crate::OrchestratorConfig;
use tb_adapters::{ProviderError, ProviderOp};

#[tokio::test]
async fn sweep_reaps_only_expired_terminals() {
    let ctx = setup();
    let old = create_for(&ctx, "a1").await;
    ctx.clock.advance(chrono::Duration::minutes(30));
    let young = create_for(&ctx, "a1").await;
    ctx.clock.advance(chrono::Duration::minutes(30));

    let sweeper = Sweeper::new(Arc::clone(&ctx.manager));
    let report = sweeper.sweep_once(ctx.clock.now()).await;

    assert_eq!(report.reaped, vec![old.terminal_id.clone()]);
    assert!(report.failed.is_empty());
    assert_eq!(ctx.manager.list(&identity("a1")), vec![young]);
    assert!(!ctx.provider.get_session(&old.session_handle).unwrap().running);
}

#[tokio::test]
async fn nothing_to_sweep_is_an_empty_report() {
    let ctx = setup();
    create_for(&ctx, "a1").await;
    let report = Sweeper::new(Arc::clone(&ctx.manager))
        .sweep_once(ctx.clock.now())
        .await;
    assert!(report.is_empty());
}

#[tokio::test]
async fn failed_teardown_is_retried_next_sweep() {
    let ctx = setup();
    let rec = create_for(&ctx, "a1").await;
    let other = create_for(&ctx, "a2").await;
    ctx.clock.advance(chrono::Duration::hours(2));
    ctx.provider.fail_next(
        ProviderOp::Stop,
        ProviderError::Unavailable("engine down".into()),
    );

    let sweeper = Sweeper::new(Arc::clone(&ctx.manager));
    let first = sweeper.sweep_once(ctx.clock.now()).await;
    assert_eq!(first.reaped.len(), 1);
    assert_eq!(first.failed.len(), 1);
    let failed_id = first.failed[0].0.clone();
    assert!(ctx.manager.registry().get(&failed_id).is_some());
    assert!([rec.terminal_id.clone(), other.terminal_id.clone()].contains(&failed_id));

    let second = sweeper.sweep_once(ctx.clock.now()).await;
    assert_eq!(second.reaped, vec![failed_id]);
    assert!(ctx.manager.registry().is_empty());
}

#[tokio::test]
async fn persistent_failures_are_counted_and_never_dropped() {
    let ctx = setup_with(OrchestratorConfig {
        sweep_alert_after: 2,
        ..Default::default()
    });
    let rec = create_for(&ctx, "a1").await;
    ctx.clock.advance(chrono::Duration::hours(2));
    ctx.provider
        .fail_always(ProviderOp::Stop, ProviderError::Rejected("stuck".into()));

    let sweeper = Sweeper::new(Arc::clone(&ctx.manager));
    for _ in 0..4 {
        let report = sweeper.sweep_once(ctx.clock.now()).await;
        assert_eq!(report.failed.len(), 1);
    }

    let slot = ctx.manager.registry().slot(&rec.terminal_id).unwrap();
    assert_eq!(slot.lock().await.teardown_failures, 4);
    assert!(ctx.manager.registry().get(&rec.terminal_id).is_some());
}

#[tokio::test]
async fn expired_terminal_rejects_exec_until_swept() {
    let ctx = setup();
    let rec = create_for(&ctx, "a1").await;
    ctx.clock.advance(chrono::Duration::hours(1));

    let result = ctx
        .manager
        .execute(&identity("a1"), &rec.terminal_id, "ls", None)
        .await;
    assert_eq!(result.unwrap_err().code(), "not_running");

    Sweeper::new(Arc::clone(&ctx.manager))
        .sweep_once(ctx.clock.now())
        .await;
    let result = ctx
        .manager
        .execute(&identity("a1"), &rec.terminal_id, "ls", None)
        .await;
    assert_eq!(result.unwrap_err().code(), "not_found");
}

#[tokio::test(start_paused = true)]
async fn run_sweeps_on_interval_and_stops_on_cancel() {
    let ctx = setup_with(OrchestratorConfig {
        sweep_interval: Duration::from_secs(60),
        ..Default::default()
    });
    create_for(&ctx, "a1").await;
    ctx.clock.advance(chrono::Duration::hours(2));

    let cancel = CancellationToken::new();
    let task = tokio::spawn(Sweeper::new(Arc::clone(&ctx.manager)).run(cancel.clone()));

    // the immediate first tick is skipped
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(ctx.manager.registry().len(), 1);

    tokio::time::sleep(Duration::from_secs(40)).await;
    assert!(ctx.manager.registry().is_empty());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
}
