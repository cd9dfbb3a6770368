// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: the container engine and the durability mirror

pub mod mirror;
pub mod provider;
pub mod subprocess;
pub mod traced;

pub use mirror::{Mirror, MirrorError, NoOpMirror, RedisMirror};
pub use provider::{
    DockerProvider, LogStream, NoOpProvider, ProviderError, SessionProvider, SessionSpec,
    CONTAINER_LOG_DIR,
};
pub use traced::TracedProvider;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use mirror::{FakeMirror, MirrorCall};
#[cfg(any(test, feature = "test-support"))]
pub use provider::{FakeProvider, ProviderCall, ProviderOp};
