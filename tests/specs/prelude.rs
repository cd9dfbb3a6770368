//! Test helpers for the black-box behavior tests.
//!
//! Provides a small DSL for driving the tb CLI against a real tbd daemon.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};

// Aggressive timeouts for fast tests.
const TB_TIMEOUT_CONNECT_MS: &str = "2000";
const TB_TIMEOUT_IPC_MS: &str = "2000";

// Polling timeouts
pub const POLL_INTERVAL_MS: u64 = 10;
pub const WAIT_MAX_MS: u64 = 5000;

/// Signing secret shared by every test daemon
pub const DAEMON_SECRET: &str = "spec-signing-secret";

/// Returns the path to a binary, checking llvm-cov target directory first.
/// Falls back to resolving relative to the test binary itself.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// Returns the path to the tb binary.
fn tb_binary() -> PathBuf {
    binary_path("tb")
}

/// Returns the path to the tbd daemon binary.
pub fn tbd_binary() -> PathBuf {
    binary_path("tbd")
}

/// Create a CLI builder for tb commands
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: vec![
                ("TB_TIMEOUT_CONNECT_MS".into(), TB_TIMEOUT_CONNECT_MS.into()),
                ("TB_TIMEOUT_IPC_MS".into(), TB_TIMEOUT_IPC_MS.into()),
                ("NO_COLOR".into(), "1".into()),
            ],
        }
    }

    /// Add CLI arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.envs.push((key.to_string(), value.as_ref().to_string()));
        self
    }

    /// Build the command without running it
    pub fn command(self) -> Command {
        let mut cmd = Command::new(tb_binary());
        cmd.args(&self.args);

        // Keep the caller's environment from leaking into tests
        for key in ["TB_ADDR", "TB_TOKEN", "TB_TOKEN_SECRET"] {
            cmd.env_remove(key);
        }
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(&self) -> Option<i32> {
        self.output.status.code()
    }

    /// Parse stdout as JSON
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout())
            .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {}", self.stdout()))
    }

    /// Assert stdout contains substring.
    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    /// Assert stdout does not contain substring.
    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(unexpected),
            "stdout should not contain '{}'\nstdout: {}",
            unexpected,
            stdout
        );
        self
    }

    /// Assert stderr contains substring.
    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }
}

// =============================================================================
// Polling
// =============================================================================

/// Poll a condition until it returns true or timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

/// Reserve a loopback port by binding and releasing it
pub fn free_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

// =============================================================================
// Daemon
// =============================================================================

/// A tbd process running the no-op provider in isolated directories.
pub struct Daemon {
    child: Child,
    addr: String,
    state_dir: tempfile::TempDir,
    _log_dir: tempfile::TempDir,
}

impl Daemon {
    /// Start a daemon and wait until it accepts connections
    pub fn start() -> Self {
        Self::start_with(&[])
    }

    /// Start a daemon with extra environment settings
    pub fn start_with(envs: &[(&str, &str)]) -> Self {
        let state_dir = tempfile::tempdir().unwrap();
        let log_dir = tempfile::tempdir().unwrap();
        let addr = free_addr();

        let mut cmd = Command::new(tbd_binary());
        cmd.env_clear()
            .env("PATH", std::env::var("PATH").unwrap_or_default())
            .env("TB_PROVIDER", "noop")
            .env("TB_LISTEN_ADDR", &addr)
            .env("TB_TOKEN_SECRET", DAEMON_SECRET)
            .env("TB_STATE_DIR", state_dir.path())
            .env("TB_LOG_BASE_DIR", log_dir.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        for (key, value) in envs {
            cmd.env(key, value);
        }
        let child = cmd.spawn().expect("tbd should spawn");

        let daemon = Self {
            child,
            addr,
            state_dir,
            _log_dir: log_dir,
        };
        let up = wait_for(WAIT_MAX_MS, || {
            std::net::TcpStream::connect(&daemon.addr).is_ok()
        });
        assert!(up, "daemon did not start\nlog: {}", daemon.log());
        daemon
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    /// Read the daemon log file contents (for debugging test failures)
    pub fn log(&self) -> String {
        std::fs::read_to_string(self.state_path().join("daemon.log"))
            .unwrap_or_else(|_| "(no daemon log)".to_string())
    }

    /// Mint a credential for `agent` with the daemon's secret
    pub fn token(&self, agent: &str) -> String {
        cli()
            .args(&["token", agent])
            .env("TB_TOKEN_SECRET", DAEMON_SECRET)
            .passes()
            .stdout()
            .trim()
            .to_string()
    }

    /// tb pointed at this daemon, acting as `agent`
    pub fn tb_as(&self, agent: &str) -> CliBuilder {
        let token = self.token(agent);
        cli().env("TB_ADDR", &self.addr).env("TB_TOKEN", token)
    }

    /// tb pointed at this daemon with no credential
    pub fn tb(&self) -> CliBuilder {
        cli().env("TB_ADDR", &self.addr)
    }

    /// Send SIGTERM and wait for the process to exit
    pub fn stop(&mut self) -> Option<i32> {
        let _ = Command::new("kill")
            .args(["-TERM", &self.child.id().to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        self.child.wait().ok().and_then(|s| s.code())
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
