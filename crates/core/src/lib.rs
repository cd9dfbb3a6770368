// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tb-core: Core types for the termbridge terminal orchestrator

pub mod clock;
pub mod exec;
pub mod id;
pub mod limits;
pub mod terminal;
pub mod time_fmt;

pub use clock::{Clock, SystemClock};
pub use exec::{CommandAudit, ExecOutcome};
pub use id::{IdGen, UuidIdGen};
pub use limits::ResourceLimits;
pub use terminal::{AgentId, TerminalId, TerminalRecord, TerminalStatus};
pub use time_fmt::{format_remaining, format_span};

#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
#[cfg(any(test, feature = "test-support"))]
pub use id::SequentialIdGen;
