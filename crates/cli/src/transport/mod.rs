// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote collaborators of the control plane, as traits, plus the JSON
//! wire types shared with the locator service.
//!
//! Trait methods return boxed futures so the traits stay dyn-compatible and
//! can be swapped for scripted doubles in tests.

pub mod http;

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::artifact::ConfigArtifact;
use crate::credential::{Credential, SslParameters};
use crate::endpoint::ConnectionEndpoint;
use crate::error::Result;
use crate::properties::PropertyMap;

/// Boxed future returned by every RPC trait method.
pub type RpcFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

// -- Discovery ----------------------------------------------------------------

/// Ask a locator for the active management endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    pub locator_host: String,
    pub locator_port: u16,
    pub timeout_ms: u64,
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub properties: PropertyMap,
}

/// A locator's answer. Blank host or port 0 means "no manager".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResponse {
    #[serde(default)]
    pub manager_host: String,
    #[serde(default)]
    pub manager_port: u16,
    #[serde(default)]
    pub manager_tls_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_cause: Option<String>,
}

pub trait DirectoryRpc: Send + Sync {
    /// Send one discovery request, bounded by `request.timeout_ms`.
    fn discover(&self, request: DiscoveryRequest, ssl: SslParameters)
        -> RpcFuture<'_, DiscoveryResponse>;
}

// -- Session ------------------------------------------------------------------

/// Everything needed to open one management session.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub endpoint: ConnectionEndpoint,
    pub user: Credential,
    /// `None` connects in plaintext.
    pub ssl: Option<SslParameters>,
    pub properties_file: Option<PathBuf>,
    pub timeout: Duration,
}

/// Identity of the management endpoint, returned on a successful open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerIndex {
    pub member: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
}

/// A live connection to the management endpoint.
#[derive(Clone)]
pub struct OpenedSession {
    pub index: ManagerIndex,
    pub membership: Arc<dyn MembershipView>,
    pub shared_config: Arc<dyn SharedConfigRpc>,
}

impl fmt::Debug for OpenedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedSession").field("index", &self.index).finish_non_exhaustive()
    }
}

pub trait SessionRpc: Send + Sync {
    /// Open an authenticated session. Fails with an authentication,
    /// security, or connectivity error.
    fn open(&self, request: OpenRequest) -> RpcFuture<'_, OpenedSession>;
}

// -- Membership ---------------------------------------------------------------

/// A locator that may host shared configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedConfigLocator {
    pub id: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub reachable: bool,
}

fn default_true() -> bool {
    true
}

impl fmt::Display for SharedConfigLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Wire form of one membership entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorEntry {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub shared_config: bool,
}

/// Wire form of the cluster membership view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    #[serde(default)]
    pub locators: Vec<LocatorEntry>,
    #[serde(default)]
    pub members: Vec<String>,
}

impl MembershipSnapshot {
    pub fn shared_config_locators(&self) -> Vec<SharedConfigLocator> {
        self.locators
            .iter()
            .filter(|l| l.shared_config)
            .map(|l| SharedConfigLocator { id: l.id.clone(), url: l.url.clone(), reachable: true })
            .collect()
    }
}

/// Current cluster view. Read fresh for every operation, never cached.
pub trait MembershipView: Send + Sync {
    fn shared_config_locators(&self) -> RpcFuture<'_, Vec<SharedConfigLocator>>;

    /// Identities of connected data-plane members.
    fn connected_members(&self) -> RpcFuture<'_, Vec<String>>;
}

// -- Shared configuration ------------------------------------------------------

/// One candidate's answer to a shared-configuration operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub success: bool,
    pub artifact: Option<ConfigArtifact>,
    pub message: String,
}

impl OperationOutcome {
    pub fn succeeded(artifact: Option<ConfigArtifact>, message: impl Into<String>) -> Self {
        Self { success: true, artifact, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, artifact: None, message: message.into() }
    }
}

/// Wire body of an export request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Wire body of an operation reply without payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReply {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Per-locator shared-configuration RPCs, invoked once per candidate.
pub trait SharedConfigRpc: Send + Sync {
    fn export<'a>(
        &'a self,
        locator: &'a SharedConfigLocator,
        group: Option<&'a str>,
    ) -> RpcFuture<'a, OperationOutcome>;

    fn import<'a>(
        &'a self,
        locator: &'a SharedConfigLocator,
        artifact: &'a ConfigArtifact,
    ) -> RpcFuture<'a, OperationOutcome>;

    /// Fetch one deployed code bundle.
    fn fetch_bundle<'a>(
        &'a self,
        locator: &'a SharedConfigLocator,
        group: &'a str,
        name: &'a str,
    ) -> RpcFuture<'a, OperationOutcome>;
}

/// JSON error envelope: `{"error":{"code","message"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
