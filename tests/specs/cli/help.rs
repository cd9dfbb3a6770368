//! CLI help and version specs

use crate::prelude::*;

#[test]
fn no_subcommand_prints_help() {
    cli()
        .passes()
        .stdout_has("Usage:")
        .stdout_has("create")
        .stdout_has("stream");
}

#[test]
fn help_lists_terminal_commands() {
    let out = cli().args(&["--help"]).passes();
    for name in ["token", "create", "exec", "logs", "destroy", "list", "status", "health"] {
        assert!(out.stdout().contains(name), "help missing {name}");
    }
}

#[test]
fn version_prints_package_version() {
    cli()
        .args(&["--version"])
        .passes()
        .stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn exec_help_documents_timeout() {
    cli()
        .args(&["exec", "--help"])
        .passes()
        .stdout_has("--timeout");
}
