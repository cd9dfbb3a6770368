// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::IsTerminal;

pub mod codes {
    /// Section headers: steel blue
    pub const HEADER: u8 = 74;
    /// Descriptions and context: medium grey
    pub const CONTEXT: u8 = 245;
    /// Muted / secondary text: darker grey
    pub const MUTED: u8 = 240;
}

/// Determine if color output should be enabled.
///
/// Priority: `NO_COLOR=1` disables → `COLOR=1` forces → TTY check.
pub fn should_colorize() -> bool {
    if crate::env::no_color() {
        return false;
    }
    if crate::env::force_color() {
        return true;
    }
    std::io::stdout().is_terminal()
}

fn fg256(code: u8) -> String {
    format!("\x1b[38;5;{code}m")
}

const RESET: &str = "\x1b[0m";

/// Format text with the header color.
pub fn header(text: &str) -> String {
    if should_colorize() {
        apply_header(text)
    } else {
        text.to_string()
    }
}

pub(crate) fn apply_header(text: &str) -> String {
    format!("{}{}{}", fg256(codes::HEADER), text, RESET)
}

/// Format text with the context color (medium grey).
pub fn context(text: &str) -> String {
    if should_colorize() {
        format!("{}{}{}", fg256(codes::CONTEXT), text, RESET)
    } else {
        text.to_string()
    }
}

/// Format secondary text (darker grey).
pub fn muted(text: &str) -> String {
    if should_colorize() {
        apply_muted(text)
    } else {
        text.to_string()
    }
}

pub(crate) fn apply_muted(text: &str) -> String {
    format!("{}{}{}", fg256(codes::MUTED), text, RESET)
}

/// Colorize a terminal status or exit result.
///
/// Green for `running`/`ok`, yellow for `expired`, red for
/// `destroyed`/`failed`.
/// Matching is on the first word so "failed (exit 2)" is colored too.
pub fn status(text: &str) -> String {
    if !should_colorize() {
        return text.to_string();
    }
    apply_status(text)
}

pub(crate) fn apply_status(text: &str) -> String {
    let lower = text.trim_start().to_lowercase();
    let first_word = lower
        .split(|c: char| !c.is_alphabetic())
        .next()
        .unwrap_or("");
    let code = match first_word {
        "running" | "ok" => "\x1b[32m",
        "expired" => "\x1b[33m",
        "destroyed" | "failed" => "\x1b[31m",
        _ => return text.to_string(),
    };
    format!("{code}{text}{RESET}")
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
