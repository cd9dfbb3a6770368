// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! termbridge terminal lifecycle engine

pub mod auth;
mod config;
mod error;
mod gateway;
mod manager;
mod registry;
mod sweeper;

pub use auth::{AuthError, Identity, TokenIssuer, TokenVerifier};
pub use config::OrchestratorConfig;
pub use error::OrchestratorError;
pub use gateway::{LogGateway, LogSubscription, RelayEnd};
pub use manager::{CreateTerminal, HealthReport, ManagerDeps, StatusReport, TerminalManager};
pub use registry::{Registry, Reservation};
pub use sweeper::{SweepReport, Sweeper};

#[cfg(test)]
mod test_helpers;
