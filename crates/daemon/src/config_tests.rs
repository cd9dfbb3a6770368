// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use yare::parameterized;

fn resolve(pairs: &[(&str, &str)]) -> Result<Config, LifecycleError> {
    let mut map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    map.entry("TB_STATE_DIR".to_string())
        .or_insert_with(|| "/var/lib/tb".to_string());
    Config::resolve(&move |key: &str| map.get(key).cloned())
}

#[test]
fn defaults_apply_when_only_the_secret_is_set() {
    let config = resolve(&[("TB_TOKEN_SECRET", "s3cret")]).unwrap();

    assert_eq!(config.listen_addr, "127.0.0.1:8740".parse().unwrap());
    assert_eq!(config.provider, ProviderKind::Docker);
    assert_eq!(config.mirror_url, None);
    assert_eq!(config.log_path, PathBuf::from("/var/lib/tb/daemon.log"));
    assert_eq!(config.orchestrator, OrchestratorConfig::default());
}

#[test]
fn missing_secret_is_a_startup_error() {
    let err = resolve(&[]).unwrap_err();
    assert!(matches!(err, LifecycleError::MissingSecret));
}

#[test]
fn environment_overrides_are_applied() {
    let config = resolve(&[
        ("TB_TOKEN_SECRET", "s3cret"),
        ("TB_LISTEN_ADDR", "0.0.0.0:9000"),
        ("TB_MIRROR_URL", "redis://127.0.0.1:6379"),
        ("TB_PROVIDER", "noop"),
        ("TB_IMAGE", "custom:1"),
        ("TB_LOG_BASE_DIR", "/data/logs"),
        ("TB_MAX_TERMINALS_PER_AGENT", "2"),
        ("TB_DEFAULT_TIMEOUT_HOURS", "1"),
        ("TB_MAX_TIMEOUT_HOURS", "8"),
        ("TB_SWEEP_INTERVAL_SECS", "60"),
        ("TB_MEMORY_MB", "256"),
        ("TB_CPU_PERCENT", "25"),
    ])
    .unwrap();

    assert_eq!(config.listen_addr, "0.0.0.0:9000".parse().unwrap());
    assert_eq!(config.mirror_url.as_deref(), Some("redis://127.0.0.1:6379"));
    assert_eq!(config.provider, ProviderKind::Noop);
    let o = &config.orchestrator;
    assert_eq!(o.image, "custom:1");
    assert_eq!(o.log_base_dir, PathBuf::from("/data/logs"));
    assert_eq!(o.max_terminals_per_agent, 2);
    assert_eq!(o.default_timeout, Duration::from_secs(3600));
    assert_eq!(o.max_timeout, Duration::from_secs(8 * 3600));
    assert_eq!(o.sweep_interval, Duration::from_secs(60));
    assert_eq!(o.limits.memory_mb, 256);
    assert_eq!(o.limits.cpu_percent, 25);
}

#[parameterized(
    not_a_number = { "TB_MAX_TERMINALS_PER_AGENT", "five" },
    negative = { "TB_MEMORY_MB", "-1" },
    zero_quota = { "TB_MAX_TERMINALS_PER_AGENT", "0" },
    zero_interval = { "TB_SWEEP_INTERVAL_SECS", "0" },
    bad_addr = { "TB_LISTEN_ADDR", "localhost" },
    bad_provider = { "TB_PROVIDER", "podman" },
    max_hours_too_large = { "TB_MAX_TIMEOUT_HOURS", "18446744073709551615" },
    default_hours_too_large = { "TB_DEFAULT_TIMEOUT_HOURS", "8761" },
)]
fn invalid_values_are_rejected(name: &str, value: &str) {
    let err = resolve(&[("TB_TOKEN_SECRET", "s"), (name, value)]).unwrap_err();
    match err {
        LifecycleError::InvalidSetting { name: got, .. } => assert_eq!(got, name),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn default_timeout_cannot_exceed_maximum() {
    let err = resolve(&[
        ("TB_TOKEN_SECRET", "s"),
        ("TB_DEFAULT_TIMEOUT_HOURS", "6"),
        ("TB_MAX_TIMEOUT_HOURS", "4"),
    ])
    .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidSetting { .. }));
}

#[test]
fn file_values_are_used_and_env_wins() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tb.toml");
    std::fs::write(
        &path,
        r#"
token_secret = "from-file"
image = "file-image:2"
max_terminals_per_agent = 3
default_exec_timeout_secs = 45
list_running_only = true
"#,
    )
    .unwrap();
    let path = path.to_string_lossy().to_string();

    let config = resolve(&[("TB_CONFIG", path.as_str()), ("TB_IMAGE", "env-image:3")]).unwrap();

    assert_eq!(config.token_secret, "from-file");
    assert_eq!(config.orchestrator.image, "env-image:3");
    assert_eq!(config.orchestrator.max_terminals_per_agent, 3);
    assert_eq!(
        config.orchestrator.default_exec_timeout,
        Duration::from_secs(45)
    );
    assert!(config.orchestrator.list_running_only);
}

#[test]
fn one_year_session_limit_is_accepted() {
    let config = resolve(&[("TB_TOKEN_SECRET", "s"), ("TB_MAX_TIMEOUT_HOURS", "8760")]).unwrap();
    assert_eq!(
        config.orchestrator.max_timeout,
        Duration::from_secs(8760 * 3600)
    );
}

#[test]
fn zero_audit_window_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tb.toml");
    std::fs::write(&path, "token_secret = \"s\"\naudit_window = 0\n").unwrap();
    let path = path.to_string_lossy().to_string();

    let err = resolve(&[("TB_CONFIG", path.as_str())]).unwrap_err();
    match err {
        LifecycleError::InvalidSetting { name, .. } => assert_eq!(name, "audit_window"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn unknown_file_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tb.toml");
    std::fs::write(&path, "token_secret = \"s\"\nmax_terminals = 3\n").unwrap();
    let path = path.to_string_lossy().to_string();

    let err = resolve(&[("TB_CONFIG", path.as_str())]).unwrap_err();
    assert!(matches!(err, LifecycleError::ConfigFile { .. }));
}

#[test]
fn missing_file_is_reported_with_its_path() {
    let err = resolve(&[("TB_CONFIG", "/nonexistent/tb.toml")]).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/tb.toml"));
}

#[test]
fn debug_output_hides_the_secret() {
    let config = resolve(&[("TB_TOKEN_SECRET", "hunter2")]).unwrap();
    let rendered = format!("{:?}", config);
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("<redacted>"));
}
