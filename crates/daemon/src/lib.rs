// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! termbridge daemon library
//!
//! This module exposes the wire protocol types for use by CLI clients.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod protocol;

pub use protocol::{
    ProtocolError, Request, Response, DEFAULT_PORT, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE,
    PROTOCOL_VERSION,
};
