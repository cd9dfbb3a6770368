// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tb - termbridge CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod color;
mod commands;
mod env;
mod exit_error;
mod output;
mod table;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use commands::{health, terminal, token};
use output::OutputFormat;

use crate::client::DaemonClient;

/// Default daemon address
const DEFAULT_ADDR: &str = "127.0.0.1:8740";

#[derive(Parser)]
#[command(
    name = "tb",
    version,
    about = "termbridge - isolated, time-bounded terminals for agents"
)]
struct Cli {
    /// Daemon address
    #[arg(long, env = env::ADDR, default_value = DEFAULT_ADDR, global = true)]
    addr: String,

    /// Agent credential
    #[arg(long, env = env::TOKEN, hide_env_values = true, global = true)]
    token: Option<String>,

    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint an agent credential with the shared secret
    Token(token::TokenArgs),
    #[command(flatten)]
    Terminal(terminal::TerminalCommand),
    /// Check daemon liveness
    Health,
}

fn cli_command() -> clap::Command {
    Cli::command()
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e
            .downcast_ref::<exit_error::ExitError>()
            .map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// If the top-level Display already contains the source error text, the
/// "Caused by" chain is skipped. Otherwise the full chain is rendered.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            cli_command().print_help()?;
            println!();
            return Ok(());
        }
    };

    let client = DaemonClient::new(cli.addr, cli.token);
    match command {
        // Minting is local and never contacts the daemon
        Commands::Token(args) => token::handle(args, format)?,
        Commands::Terminal(cmd) => terminal::handle(cmd, &client, format).await?,
        Commands::Health => health::handle(&client, format).await?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
