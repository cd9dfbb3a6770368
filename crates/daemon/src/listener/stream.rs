// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live log streaming over a client connection.

use tb_adapters::{Mirror, SessionProvider};
use tb_core::{Clock, IdGen, TerminalId};
use tb_engine::RelayEnd;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tracing::debug;

use tb_daemon::protocol::{self, Response, DEFAULT_TIMEOUT};

use super::{ConnectionError, ListenCtx};

/// Lines buffered between the relay and the socket writer
const STREAM_BUFFER: usize = 256;

/// Authenticate the stream, then forward session output as `LogLine` frames.
///
/// The stream ends when the session output ends, the daemon shuts down, or
/// the client half-closes (or writes anything further).
pub(super) async fn handle_stream<P, M, C, I>(
    mut reader: OwnedReadHalf,
    mut writer: OwnedWriteHalf,
    ctx: &ListenCtx<P, M, C, I>,
    token: Option<String>,
    terminal_id: TerminalId,
) -> Result<(), ConnectionError>
where
    P: SessionProvider,
    M: Mirror,
    C: Clock,
    I: IdGen,
{
    let subscription = match ctx.gateway.open(token.as_deref(), &terminal_id).await {
        Ok(subscription) => subscription,
        Err(e) => {
            debug!(%terminal_id, code = e.code(), "stream refused");
            protocol::write_response(&mut writer, &Response::from(e), DEFAULT_TIMEOUT).await?;
            return Ok(());
        }
    };
    protocol::write_response(
        &mut writer,
        &Response::StreamStarted {
            terminal_id: terminal_id.clone(),
        },
        DEFAULT_TIMEOUT,
    )
    .await?;

    let cancel = ctx.shutdown.child_token();
    let (tx, mut rx) = mpsc::channel(STREAM_BUFFER);
    let relay = tokio::spawn(subscription.relay(tx, cancel.clone()));

    let hangup = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 1];
            let _ = reader.read(&mut buf).await;
            cancel.cancel();
        })
    };

    let mut client_gone = false;
    while let Some(line) = rx.recv().await {
        let frame = Response::LogLine { line };
        if let Err(e) = protocol::write_response(&mut writer, &frame, DEFAULT_TIMEOUT).await {
            debug!(%terminal_id, error = %e, "stream write failed");
            client_gone = true;
            break;
        }
    }
    drop(rx);
    hangup.abort();

    let end = relay
        .await
        .unwrap_or_else(|e| RelayEnd::Failed(e.to_string()));
    if client_gone {
        return Ok(());
    }

    let frame = Response::StreamEnded {
        reason: end.reason(),
    };
    if let Err(e) = protocol::write_response(&mut writer, &frame, DEFAULT_TIMEOUT).await {
        debug!(%terminal_id, error = %e, "could not send stream end");
    }
    Ok(())
}
