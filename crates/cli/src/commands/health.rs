// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tb health` - Daemon liveness and counts

use anyhow::Result;
use serde::Serialize;
use tb_core::format_span;
use tb_engine::HealthReport;

use crate::client::DaemonClient;
use crate::color;
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct HealthView {
    addr: String,
    version: String,
    #[serde(flatten)]
    health: HealthReport,
}

pub async fn handle(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let version = client.hello().await?;
    let health = client.health().await?;

    match format {
        OutputFormat::Text => {
            println!(
                "{} {} ({})",
                color::header("Daemon:"),
                color::status("ok"),
                client.addr()
            );
            println!("  {} {}", color::context("Version:"), version);
            println!(
                "  {} {}",
                color::context("Uptime:"),
                format_span(health.uptime_secs)
            );
            println!(
                "  {} {} running / {} total",
                color::context("Terminals:"),
                health.running_terminals,
                health.total_terminals
            );
            let mirror = if health.mirror_enabled {
                "enabled"
            } else {
                "disabled"
            };
            println!("  {} {}", color::context("Mirror:"), mirror);
        }
        OutputFormat::Json => print_json(&HealthView {
            addr: client.addr().to_string(),
            version,
            health,
        })?,
    }
    Ok(())
}
