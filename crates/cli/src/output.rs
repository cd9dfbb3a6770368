// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Utc;
use clap::ValueEnum;
use serde::Serialize;
use tb_core::{format_remaining, TerminalRecord};

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print `value` as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print captured output with a trailing newline only when it lacks one.
pub fn print_block(text: &str) {
    if text.is_empty() {
        return;
    }
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
}

/// Time left on a record, relative to now
pub fn remaining(record: &TerminalRecord) -> String {
    if !record.is_running() {
        return "-".to_string();
    }
    format_remaining(record.expires_at, Utc::now())
}

/// Collapse a command to a single line for table cells.
pub fn one_line(command: &str) -> String {
    command.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
