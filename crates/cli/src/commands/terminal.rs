// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal commands: create, exec, logs, destroy, list, status, stream

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use clap::Subcommand;
use tb_core::ExecOutcome;

use crate::client::DaemonClient;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{one_line, print_block, print_json, remaining, OutputFormat};
use crate::table::{Column, Table};

#[derive(Subcommand)]
pub enum TerminalCommand {
    /// Provision a new terminal
    Create {
        /// Process the terminal runs (default: bash)
        #[arg(long)]
        command: Option<String>,

        /// Environment variable for the session (repeatable)
        #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,

        /// Lifetime in hours (clamped by the daemon)
        #[arg(long = "timeout-hours")]
        timeout_hours: Option<i64>,

        /// Agent id to record (defaults to the token's identity)
        #[arg(long = "agent-id")]
        agent_id: Option<String>,
    },
    /// Run a command inside a terminal
    Exec {
        /// Terminal ID
        id: String,

        /// Command line to run
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,

        /// Timeout in seconds (clamped by the daemon)
        #[arg(long)]
        timeout: Option<i64>,
    },
    /// Show recent terminal output
    Logs {
        /// Terminal ID
        id: String,

        /// Number of trailing lines
        #[arg(short = 'n', long)]
        lines: Option<u32>,
    },
    /// Destroy a terminal
    Destroy {
        /// Terminal ID
        id: String,
    },
    /// List your terminals
    List {},
    /// Show terminal details, recent output and commands
    Status {
        /// Terminal ID
        id: String,
    },
    /// Follow terminal output live (Ctrl-C to stop)
    Stream {
        /// Terminal ID
        id: String,
    },
}

/// Parse a `KEY=VALUE` pair for `--env`.
pub fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty variable name in '{}'", s));
    }
    if key.chars().any(|c| c.is_whitespace()) {
        return Err(format!("variable name '{}' contains whitespace", key));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Process exit code for a remote command's exit code
pub fn local_exit_code(remote: i32) -> i32 {
    if (1..=255).contains(&remote) {
        remote
    } else {
        1
    }
}

pub async fn handle(
    command: TerminalCommand,
    client: &DaemonClient,
    format: OutputFormat,
) -> Result<()> {
    match command {
        TerminalCommand::Create {
            command,
            env,
            timeout_hours,
            agent_id,
        } => {
            let environment: BTreeMap<String, String> = env.into_iter().collect();
            let terminal = client
                .create_terminal(agent_id, command, environment, timeout_hours)
                .await?;
            match format {
                OutputFormat::Text => {
                    println!(
                        "Created {} ({}), expires in {}",
                        color::header(terminal.terminal_id.as_str()),
                        terminal.command,
                        remaining(&terminal)
                    );
                }
                OutputFormat::Json => print_json(&terminal)?,
            }
        }
        TerminalCommand::Exec {
            id,
            command,
            timeout,
        } => {
            let outcome = client.execute(&id, &command.join(" "), timeout).await?;
            match format {
                OutputFormat::Text => print_outcome(&outcome),
                OutputFormat::Json => print_json(&outcome)?,
            }
            if !outcome.succeeded() {
                return Err(ExitError::new(local_exit_code(outcome.exit_code), "").into());
            }
        }
        TerminalCommand::Logs { id, lines } => {
            let logs = client.get_logs(&id, lines).await?;
            match format {
                OutputFormat::Text => print_block(&logs),
                OutputFormat::Json => {
                    print_json(&serde_json::json!({ "terminal_id": id, "logs": logs }))?
                }
            }
        }
        TerminalCommand::Destroy { id } => {
            let success = client.destroy(&id).await?;
            match format {
                OutputFormat::Text => println!("Destroyed {}", id),
                OutputFormat::Json => {
                    print_json(&serde_json::json!({ "terminal_id": id, "success": success }))?
                }
            }
        }
        TerminalCommand::List {} => {
            let terminals = client.list().await?;
            match format {
                OutputFormat::Text => {
                    if terminals.is_empty() {
                        println!("No terminals");
                        return Ok(());
                    }
                    let mut table = Table::new(vec![
                        Column::left("ID"),
                        Column::status("STATUS"),
                        Column::right("EXPIRES"),
                        Column::muted("COMMAND").with_max(48),
                    ]);
                    for t in &terminals {
                        table.row(vec![
                            t.terminal_id.to_string(),
                            t.status.to_string(),
                            remaining(t),
                            one_line(&t.command),
                        ]);
                    }
                    table.render(&mut std::io::stdout());
                }
                OutputFormat::Json => print_json(&terminals)?,
            }
        }
        TerminalCommand::Status { id } => {
            let status = client.status(&id).await?;
            match format {
                OutputFormat::Text => {
                    let record = &status.record;
                    println!("{} {}", color::header("Terminal:"), record.terminal_id);
                    println!(
                        "  {} {}",
                        color::context("Status:"),
                        color::status(record.status.as_str())
                    );
                    println!("  {} {}", color::context("Agent:"), record.agent_id);
                    println!("  {} {}", color::context("Command:"), record.command);
                    println!("  {} {}", color::context("Created:"), record.created_at);
                    println!("  {} {}", color::context("Expires:"), record.expires_at);
                    println!("  {} {}", color::context("Remaining:"), status.time_remaining);
                    println!(
                        "  {} {}",
                        color::context("Log file:"),
                        record.log_location.display()
                    );
                    if !status.recent_commands.is_empty() {
                        println!();
                        println!("{}", color::header("Recent commands:"));
                        for audit in &status.recent_commands {
                            println!(
                                "  [{}] exit {} ({:.2}s) {}",
                                audit.timestamp.format("%H:%M:%S"),
                                audit.exit_code,
                                audit.execution_time,
                                one_line(&audit.command)
                            );
                        }
                    }
                    if !status.recent_logs.is_empty() {
                        println!();
                        println!("{}", color::header("Recent output:"));
                        print_block(&status.recent_logs);
                    }
                }
                OutputFormat::Json => print_json(&status)?,
            }
        }
        TerminalCommand::Stream { id } => {
            let json = format == OutputFormat::Json;
            let follow = client.stream(&id, |line| {
                if json {
                    println!("{}", serde_json::json!({ "line": line }));
                } else {
                    println!("{}", line);
                }
                let _ = std::io::stdout().flush();
            });
            tokio::select! {
                result = follow => {
                    let reason = result?;
                    if !json {
                        eprintln!("{}", color::muted(&format!("stream ended: {}", reason)));
                    }
                }
                _ = tokio::signal::ctrl_c() => {}
            }
        }
    }
    Ok(())
}

fn print_outcome(outcome: &ExecOutcome) {
    print_block(&outcome.output);
    if !outcome.error.is_empty() {
        if outcome.error.ends_with('\n') {
            eprint!("{}", outcome.error);
        } else {
            eprintln!("{}", outcome.error);
        }
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
