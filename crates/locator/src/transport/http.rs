// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the locator.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use locus::artifact::{ConfigArtifact, ARCHIVE_EXTENSION};
use locus::transport::{DiscoveryRequest, ExportRequest, OperationReply};

use crate::error::ErrorCode;
use crate::state::LocatorState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub id: String,
}

/// `GET /health`
pub async fn health(State(s): State<Arc<LocatorState>>) -> impl IntoResponse {
    Json(HealthResponse { status: "running".to_owned(), id: s.config.locator_id() })
}

/// `POST /locator/v1/manager`: report the active management endpoint.
pub async fn discover(
    State(s): State<Arc<LocatorState>>,
    Json(req): Json<DiscoveryRequest>,
) -> impl IntoResponse {
    tracing::debug!(
        locator = %format!("{}[{}]", req.locator_host, req.locator_port),
        properties = req.properties.len(),
        "discovery request"
    );
    Json(s.discovery())
}

/// `GET /management/v1/index`
pub async fn index(State(s): State<Arc<LocatorState>>) -> impl IntoResponse {
    Json(s.index())
}

/// `GET /management/v1/membership`
pub async fn membership(State(s): State<Arc<LocatorState>>) -> impl IntoResponse {
    Json(s.membership())
}

/// `POST /config/v1/export`: return the stored archive as one frame.
pub async fn export(
    State(s): State<Arc<LocatorState>>,
    body: Option<Json<ExportRequest>>,
) -> Response {
    let group = body.and_then(|Json(req)| req.group);
    match s.store.archive(group.as_deref()) {
        Ok(Some(archive)) => {
            tracing::info!(group = ?group, bytes = archive.payload.len(), "exporting archive");
            octet_stream(archive.encode())
        }
        Ok(None) => {
            let scope = group.map(|g| format!(" for group {g}")).unwrap_or_default();
            ErrorCode::NotFound
                .to_http_response(format!("no cluster configuration stored{scope}"))
                .into_response()
        }
        Err(e) => ErrorCode::Internal.to_http_response(e.to_string()).into_response(),
    }
}

/// `POST /config/v1/import`: replace the stored archive.
pub async fn import(State(s): State<Arc<LocatorState>>, body: Bytes) -> Response {
    let members = s.members();
    if !members.is_empty() {
        return ErrorCode::PreconditionFailed
            .to_http_response(format!(
                "cannot import while members are running: {}",
                members.join(", ")
            ))
            .into_response();
    }

    let artifact = match ConfigArtifact::decode(body) {
        Ok(artifact) => artifact,
        Err(e) => return ErrorCode::BadRequest.to_http_response(e.to_string()).into_response(),
    };
    if !artifact.name.ends_with(ARCHIVE_EXTENSION) {
        return ErrorCode::BadRequest
            .to_http_response(format!("{} is not a {ARCHIVE_EXTENSION} archive", artifact.name))
            .into_response();
    }

    match s.store.replace_archive(artifact.payload) {
        Ok(path) => {
            tracing::info!(from = %artifact.name, path = %path.display(), "cluster configuration imported");
            Json(OperationReply {
                success: true,
                message: format!(
                    "cluster configuration imported by {} from {}",
                    s.config.locator_id(),
                    artifact.name
                ),
            })
            .into_response()
        }
        Err(e) => ErrorCode::Internal.to_http_response(e.to_string()).into_response(),
    }
}

/// `GET /config/v1/bundles/{group}/{name}`
pub async fn bundle(
    State(s): State<Arc<LocatorState>>,
    Path((group, name)): Path<(String, String)>,
) -> Response {
    match s.store.bundle(&group, &name) {
        Ok(Some(payload)) => octet_stream(payload),
        Ok(None) => ErrorCode::NotFound
            .to_http_response(format!("bundle {group}/{name} not found"))
            .into_response(),
        Err(e) => ErrorCode::BadRequest.to_http_response(e.to_string()).into_response(),
    }
}

fn octet_stream(payload: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "application/octet-stream")], payload).into_response()
}
