// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for the locator.

pub mod auth;
pub mod http;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use locus::transport::http::{DISCOVERY_PATH, EXPORT_PATH, IMPORT_PATH, INDEX_PATH, MEMBERSHIP_PATH};
use tower_http::trace::TraceLayer;

use crate::state::LocatorState;

/// Build the axum `Router` with all locator routes.
pub fn build_router(state: Arc<LocatorState>) -> Router {
    Router::new()
        // Health and discovery (no auth)
        .route("/health", get(http::health))
        .route(DISCOVERY_PATH, post(http::discover))
        // Management
        .route(INDEX_PATH, get(http::index))
        .route(MEMBERSHIP_PATH, get(http::membership))
        // Shared configuration
        .route(EXPORT_PATH, post(http::export))
        .route(IMPORT_PATH, post(http::import))
        .route("/config/v1/bundles/{group}/{name}", get(http::bundle))
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
