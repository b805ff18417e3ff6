// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use locus::transport::http::DISCOVERY_PATH;

use crate::error::ErrorCode;
use crate::state::LocatorState;

/// Constant-time string comparison to prevent timing side-channel attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Validate HTTP Basic credentials against `expected` (username, password).
pub fn validate_basic(headers: &HeaderMap, expected: Option<(&str, &str)>) -> Result<(), ErrorCode> {
    let Some((username, password)) = expected else {
        return Ok(());
    };

    let header =
        headers.get("authorization").and_then(|v| v.to_str().ok()).ok_or(ErrorCode::Unauthorized)?;
    let encoded = header.strip_prefix("Basic ").ok_or(ErrorCode::Unauthorized)?;
    let decoded = STANDARD.decode(encoded.trim()).map_err(|_| ErrorCode::Unauthorized)?;
    let decoded = String::from_utf8(decoded).map_err(|_| ErrorCode::Unauthorized)?;
    let (user, pass) = decoded.split_once(':').ok_or(ErrorCode::Unauthorized)?;

    // Evaluate both halves so a wrong username costs the same as a wrong password.
    let user_ok = constant_time_eq(user, username);
    let pass_ok = constant_time_eq(pass, password);
    if user_ok && pass_ok {
        Ok(())
    } else {
        Err(ErrorCode::Unauthorized)
    }
}

/// Axum middleware that enforces Basic authentication.
///
/// Exempt: discovery and `/health`.
pub async fn auth_layer(
    state: State<Arc<LocatorState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if path == DISCOVERY_PATH || path == "/health" {
        return next.run(req).await;
    }

    let expected = state.config.username.as_deref().zip(state.config.password.as_deref());
    if let Err(code) = validate_basic(req.headers(), expected) {
        tracing::debug!(%path, "rejected unauthenticated request");
        return code.to_http_response("invalid username or password").into_response();
    }

    next.run(req).await
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
