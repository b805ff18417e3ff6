// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod artifact;
pub mod client;
pub mod config;
pub mod connect;
pub mod credential;
pub mod endpoint;
pub mod error;
pub mod locator;
pub mod prompt;
pub mod properties;
pub mod session;
pub mod shared_config;
pub mod test_support;
pub mod transport;
