// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for terminal operations.

use std::collections::BTreeMap;

use tb_adapters::{Mirror, SessionProvider};
use tb_core::{AgentId, Clock, IdGen, TerminalId};
use tb_engine::{CreateTerminal, Identity, OrchestratorError};
use tracing::{info, warn};

use tb_daemon::protocol::Response;

use super::ListenCtx;

/// Verify the caller, then run `op`; failures become error responses
async fn authorized<P, M, C, I, T, F, Fut>(
    ctx: &ListenCtx<P, M, C, I>,
    token: Option<String>,
    op: F,
    ok: impl FnOnce(T) -> Response,
) -> Response
where
    F: FnOnce(Identity) -> Fut,
    Fut: std::future::Future<Output = Result<T, OrchestratorError>>,
{
    let result = match ctx.verifier.verify(token.as_deref()) {
        Ok(identity) => op(identity).await,
        Err(e) => Err(e.into()),
    };
    respond(result, ok)
}

fn respond<T>(
    result: Result<T, OrchestratorError>,
    ok: impl FnOnce(T) -> Response,
) -> Response {
    match result {
        Ok(value) => ok(value),
        Err(e) => {
            match &e {
                OrchestratorError::Internal(_)
                | OrchestratorError::Provider(_)
                | OrchestratorError::ProviderUnavailable(_) => {
                    warn!(code = e.code(), error = %e, "request failed")
                }
                _ => info!(code = e.code(), error = %e, "request rejected"),
            }
            e.into()
        }
    }
}

pub(super) async fn handle_create<P, M, C, I>(
    ctx: &ListenCtx<P, M, C, I>,
    token: Option<String>,
    agent_id: Option<String>,
    command: Option<String>,
    environment: BTreeMap<String, String>,
    timeout_hours: Option<i64>,
) -> Response
where
    P: SessionProvider,
    M: Mirror,
    C: Clock,
    I: IdGen,
{
    let request = CreateTerminal {
        agent_id: agent_id.map(AgentId::new),
        command,
        environment,
        timeout_hours,
    };
    authorized(
        ctx,
        token,
        |identity| async move { ctx.manager.create(&identity, request).await },
        |terminal| Response::Terminal { terminal },
    )
    .await
}

pub(super) async fn handle_execute<P, M, C, I>(
    ctx: &ListenCtx<P, M, C, I>,
    token: Option<String>,
    terminal_id: TerminalId,
    command: String,
    timeout: Option<i64>,
) -> Response
where
    P: SessionProvider,
    M: Mirror,
    C: Clock,
    I: IdGen,
{
    authorized(
        ctx,
        token,
        |identity| async move {
            ctx.manager
                .execute(&identity, &terminal_id, &command, timeout)
                .await
        },
        |result| Response::Executed { result },
    )
    .await
}

pub(super) async fn handle_logs<P, M, C, I>(
    ctx: &ListenCtx<P, M, C, I>,
    token: Option<String>,
    terminal_id: TerminalId,
    lines: Option<u32>,
) -> Response
where
    P: SessionProvider,
    M: Mirror,
    C: Clock,
    I: IdGen,
{
    authorized(
        ctx,
        token,
        |identity| async move { ctx.manager.get_logs(&identity, &terminal_id, lines).await },
        |logs| Response::Logs { logs },
    )
    .await
}

pub(super) async fn handle_destroy<P, M, C, I>(
    ctx: &ListenCtx<P, M, C, I>,
    token: Option<String>,
    terminal_id: TerminalId,
) -> Response
where
    P: SessionProvider,
    M: Mirror,
    C: Clock,
    I: IdGen,
{
    authorized(
        ctx,
        token,
        |identity| async move { ctx.manager.destroy(&identity, &terminal_id).await },
        |()| Response::Destroyed { success: true },
    )
    .await
}

pub(super) fn handle_list<P, M, C, I>(ctx: &ListenCtx<P, M, C, I>, token: Option<String>) -> Response
where
    P: SessionProvider,
    M: Mirror,
    C: Clock,
    I: IdGen,
{
    let result = ctx
        .verifier
        .verify(token.as_deref())
        .map(|identity| ctx.manager.list(&identity))
        .map_err(OrchestratorError::from);
    respond(result, |terminals| Response::Terminals { terminals })
}

pub(super) async fn handle_status<P, M, C, I>(
    ctx: &ListenCtx<P, M, C, I>,
    token: Option<String>,
    terminal_id: TerminalId,
) -> Response
where
    P: SessionProvider,
    M: Mirror,
    C: Clock,
    I: IdGen,
{
    authorized(
        ctx,
        token,
        |identity| async move { ctx.manager.status(&identity, &terminal_id).await },
        |status| Response::Status {
            status: Box::new(status),
        },
    )
    .await
}
