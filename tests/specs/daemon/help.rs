//! Daemon help and argument specs

use std::process::Command;

use crate::prelude::*;

#[test]
fn tbd_help_mentions_required_secret() {
    let out = Command::new(tbd_binary()).arg("--help").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("TB_TOKEN_SECRET"), "stdout: {stdout}");
}

#[test]
fn tbd_version_prints_package_version() {
    let out = Command::new(tbd_binary()).arg("--version").output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn tbd_rejects_unknown_arguments() {
    let out = Command::new(tbd_binary()).arg("bogus").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unexpected argument"));
}
