// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling client connections.
//!
//! Each accepted connection carries one request. Terminal operations get one
//! response; `StreamLogs` turns the connection into a line feed until either
//! side ends it.

mod stream;
mod terminals;

use std::sync::Arc;

use tb_adapters::{Mirror, SessionProvider};
use tb_core::{Clock, IdGen};
use tb_engine::{LogGateway, TerminalManager, TokenVerifier};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tb_daemon::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Services shared by every connection
pub struct ListenCtx<P, M, C, I> {
    pub manager: Arc<TerminalManager<P, M, C, I>>,
    pub gateway: LogGateway<P, M, C, I>,
    pub verifier: TokenVerifier,
    /// Fired on daemon shutdown; open streams end with it
    pub shutdown: CancellationToken,
}

/// Listener task for accepting TCP connections.
pub struct Listener<P, M, C, I> {
    socket: TcpListener,
    ctx: Arc<ListenCtx<P, M, C, I>>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

impl<P, M, C, I> Listener<P, M, C, I>
where
    P: SessionProvider,
    M: Mirror,
    C: Clock,
    I: IdGen,
{
    pub fn new(socket: TcpListener, ctx: Arc<ListenCtx<P, M, C, I>>) -> Self {
        Self { socket, ctx }
    }

    /// Run the accept loop until shutdown, spawning a task per connection.
    pub async fn run(self) {
        loop {
            let accepted = tokio::select! {
                _ = self.ctx.shutdown.cancelled() => break,
                accepted = self.socket.accept() => accepted,
            };
            match accepted {
                Ok((stream, peer)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, ctx).await {
                            match e {
                                ConnectionError::Protocol(
                                    protocol::ProtocolError::ConnectionClosed,
                                ) => debug!(%peer, "client disconnected"),
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!(%peer, "connection timeout")
                                }
                                _ => error!(%peer, "connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
        debug!("listener stopped");
    }
}

/// Handle a single client connection.
async fn handle_connection<P, M, C, I>(
    stream: TcpStream,
    ctx: Arc<ListenCtx<P, M, C, I>>,
) -> Result<(), ConnectionError>
where
    P: SessionProvider,
    M: Mirror,
    C: Clock,
    I: IdGen,
{
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;
    if let Request::StreamLogs { token, terminal_id } = request {
        info!(%terminal_id, "stream requested");
        return stream::handle_stream(reader, writer, &ctx, token, terminal_id).await;
    }

    debug!(request = request_kind(&request), "received request");
    let response = handle_request(request, &ctx).await;
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

/// Handle a single request and return a response.
async fn handle_request<P, M, C, I>(request: Request, ctx: &ListenCtx<P, M, C, I>) -> Response
where
    P: SessionProvider,
    M: Mirror,
    C: Clock,
    I: IdGen,
{
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Health => Response::Health {
            health: ctx.manager.health(),
        },

        Request::CreateTerminal {
            token,
            agent_id,
            command,
            environment,
            timeout_hours,
        } => {
            terminals::handle_create(ctx, token, agent_id, command, environment, timeout_hours)
                .await
        }

        Request::ExecuteCommand {
            token,
            terminal_id,
            command,
            timeout,
        } => terminals::handle_execute(ctx, token, terminal_id, command, timeout).await,

        Request::GetLogs {
            token,
            terminal_id,
            lines,
        } => terminals::handle_logs(ctx, token, terminal_id, lines).await,

        Request::DestroyTerminal { token, terminal_id } => {
            terminals::handle_destroy(ctx, token, terminal_id).await
        }

        Request::ListTerminals { token } => terminals::handle_list(ctx, token),

        Request::TerminalStatus { token, terminal_id } => {
            terminals::handle_status(ctx, token, terminal_id).await
        }

        // Streams take over the connection in handle_connection
        Request::StreamLogs { .. } => Response::error(
            "invalid_request",
            "StreamLogs must be the first request on a connection",
        ),
    }
}

/// Request name for logs; never includes the token
fn request_kind(request: &Request) -> &'static str {
    match request {
        Request::Ping => "Ping",
        Request::Hello { .. } => "Hello",
        Request::Health => "Health",
        Request::CreateTerminal { .. } => "CreateTerminal",
        Request::ExecuteCommand { .. } => "ExecuteCommand",
        Request::GetLogs { .. } => "GetLogs",
        Request::DestroyTerminal { .. } => "DestroyTerminal",
        Request::ListTerminals { .. } => "ListTerminals",
        Request::TerminalStatus { .. } => "TerminalStatus",
        Request::StreamLogs { .. } => "StreamLogs",
    }
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
