// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed mirror

use super::{commands_key, terminal_key, ttl_secs, Mirror, MirrorError};
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use std::time::Duration;
use tb_core::{CommandAudit, TerminalId, TerminalRecord};

/// Bound on a single Redis round trip
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Mirror writing to Redis through an auto-reconnecting connection
#[derive(Clone)]
pub struct RedisMirror {
    conn: ConnectionManager,
}

impl RedisMirror {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`)
    pub async fn connect(url: &str) -> Result<Self, MirrorError> {
        let client =
            redis::Client::open(url).map_err(|e| MirrorError::Unavailable(e.to_string()))?;
        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(CONNECT_TIMEOUT)
            .set_response_timeout(RESPONSE_TIMEOUT);
        let conn = ConnectionManager::new_with_config(client, config)
            .await
            .map_err(|e| MirrorError::Unavailable(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Mirror for RedisMirror {
    async fn put_terminal(
        &self,
        record: &TerminalRecord,
        ttl: Duration,
    ) -> Result<(), MirrorError> {
        let payload = serde_json::to_string(record)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(terminal_key(&record.terminal_id), payload, ttl_secs(ttl))
            .await?;
        Ok(())
    }

    async fn push_command(
        &self,
        id: &TerminalId,
        entry: &CommandAudit,
        keep: usize,
        ttl: Duration,
    ) -> Result<(), MirrorError> {
        let key = commands_key(id);
        let mut conn = self.conn.clone();
        if keep == 0 {
            let _: () = conn.del(&key).await?;
            return Ok(());
        }
        let payload = serde_json::to_string(entry)?;
        let last = keep as isize - 1;
        let _: () = redis::pipe()
            .atomic()
            .lpush(&key, payload)
            .ignore()
            .ltrim(&key, 0, last)
            .ignore()
            .expire(&key, ttl_secs(ttl) as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn remove_terminal(&self, id: &TerminalId) -> Result<(), MirrorError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(&[terminal_key(id), commands_key(id)]).await?;
        Ok(())
    }
}
