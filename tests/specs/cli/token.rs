//! Credential minting specs

use crate::prelude::*;

#[test]
fn token_prints_a_bare_jwt() {
    let out = cli()
        .args(&["token", "agent-7"])
        .env("TB_TOKEN_SECRET", "s")
        .passes();
    let token = out.stdout();
    assert_eq!(token.trim().split('.').count(), 3, "not a JWT: {token}");
}

#[test]
fn token_json_includes_agent_and_expiry() {
    let json = cli()
        .args(&["token", "agent-7", "--ttl-hours", "2", "-o", "json"])
        .env("TB_TOKEN_SECRET", "s")
        .passes()
        .json();
    assert_eq!(json["agent_id"], "agent-7");
    assert!(json["token"].as_str().is_some());
    assert!(json["expires_at"].as_str().is_some());
}

#[test]
fn token_without_secret_fails() {
    cli().args(&["token", "agent-7"]).fails().stderr_has("--secret");
}
