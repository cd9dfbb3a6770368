// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tb token` - Mint an agent credential

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use serde::Serialize;
use tb_core::AgentId;
use tb_engine::TokenIssuer;

use crate::env;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct TokenArgs {
    /// Agent the credential identifies
    pub agent_id: String,

    /// Credential lifetime in hours
    #[arg(long = "ttl-hours", default_value_t = 24, value_parser = clap::value_parser!(i64).range(1..))]
    pub ttl_hours: i64,

    /// Signing secret shared with the daemon
    #[arg(long, env = env::TOKEN_SECRET, hide_env_values = true)]
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct Minted {
    pub token: String,
    pub agent_id: String,
    pub expires_at: DateTime<Utc>,
}

pub fn mint(args: &TokenArgs, now: DateTime<Utc>) -> Result<Minted> {
    if args.agent_id.trim().is_empty() {
        anyhow::bail!("agent id must not be empty");
    }
    if args.secret.is_empty() {
        anyhow::bail!("signing secret must not be empty");
    }
    let ttl = Duration::hours(args.ttl_hours);
    let agent_id = AgentId::new(args.agent_id.trim());
    let token = TokenIssuer::new(args.secret.as_bytes())
        .issue_at(&agent_id, now, ttl)
        .context("failed to sign credential")?;
    Ok(Minted {
        token,
        agent_id: agent_id.to_string(),
        expires_at: now + ttl,
    })
}

pub fn handle(args: TokenArgs, format: OutputFormat) -> Result<()> {
    let minted = mint(&args, Utc::now())?;
    match format {
        // Bare token so `export TB_TOKEN=$(tb token ...)` works
        OutputFormat::Text => println!("{}", minted.token),
        OutputFormat::Json => print_json(&minted)?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
