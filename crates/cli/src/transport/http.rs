// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP/JSON implementation of the control-plane RPC traits over reqwest.

use std::path::Path;
use std::sync::{Arc, Once};
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::artifact::ConfigArtifact;
use crate::credential::{Credential, SslParameters};
use crate::endpoint::ConnectionEndpoint;
use crate::error::{Error, Result};
use crate::transport::{
    DirectoryRpc, DiscoveryRequest, DiscoveryResponse, ErrorEnvelope, ExportRequest,
    ManagerIndex, MembershipSnapshot, MembershipView, OpenRequest, OpenedSession,
    OperationOutcome, OperationReply, RpcFuture, SessionRpc, SharedConfigLocator,
    SharedConfigRpc,
};

pub const DISCOVERY_PATH: &str = "/locator/v1/manager";
pub const INDEX_PATH: &str = "/management/v1/index";
pub const MEMBERSHIP_PATH: &str = "/management/v1/membership";
pub const EXPORT_PATH: &str = "/config/v1/export";
pub const IMPORT_PATH: &str = "/config/v1/import";

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Build a client bounded by `timeout`, configured for TLS when `ssl` is set.
pub fn build_client(ssl: Option<&SslParameters>, timeout: Duration) -> Result<Client> {
    ensure_crypto();
    let mut builder = Client::builder().timeout(timeout).connect_timeout(timeout);

    if let Some(ssl) = ssl {
        if let Some(path) = ssl.truststore.identifier() {
            let pem = read_material(path, "trust-store")?;
            let roots = reqwest::Certificate::from_pem_bundle(&pem)
                .map_err(|e| Error::Security(format!("invalid trust-store {path}: {e}")))?;
            for root in roots {
                builder = builder.add_root_certificate(root);
            }
        }
        if let Some(path) = ssl.keystore.identifier() {
            let pem = read_material(path, "key-store")?;
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| Error::Security(format!("invalid key-store {path}: {e}")))?;
            builder = builder.identity(identity);
        }
        if let Some((min, max)) = tls_version_bounds(&ssl.protocol_list())? {
            builder = builder.min_tls_version(min).max_tls_version(max);
        }
        let ciphers = ssl.cipher_list();
        if !ciphers.is_empty() {
            debug!(?ciphers, "cipher preference recorded; rustls selects the suite");
        }
    }

    builder.build().map_err(|e| match ssl {
        Some(_) => Error::Security(format!("could not configure TLS: {e}")),
        None => Error::Connectivity(format!("could not build HTTP client: {e}")),
    })
}

fn read_material(path: &str, what: &str) -> Result<Vec<u8>> {
    std::fs::read(Path::new(path))
        .map_err(|e| Error::Security(format!("could not read {what} {path}: {e}")))
}

/// Map protocol names to the narrowest (min, max) TLS version range.
pub fn tls_version_bounds(
    protocols: &[String],
) -> Result<Option<(reqwest::tls::Version, reqwest::tls::Version)>> {
    let mut ranks = Vec::with_capacity(protocols.len());
    for name in protocols {
        match name.to_ascii_uppercase().as_str() {
            "ANY" | "TLS" => return Ok(None),
            "TLSV1.2" => ranks.push(2),
            "TLSV1.3" => ranks.push(3),
            _ => return Err(Error::Security(format!("unsupported TLS protocol {name:?}"))),
        }
    }
    let version = |rank: u8| {
        if rank == 3 {
            reqwest::tls::Version::TLS_1_3
        } else {
            reqwest::tls::Version::TLS_1_2
        }
    };
    match (ranks.iter().min(), ranks.iter().max()) {
        (Some(&lo), Some(&hi)) => Ok(Some((version(lo), version(hi)))),
        _ => Ok(None),
    }
}

fn with_credential(req: RequestBuilder, user: &Credential) -> RequestBuilder {
    match (user.identifier(), user.secret()) {
        (Some(id), secret) => req.basic_auth(id, secret),
        _ => req,
    }
}

/// Turn a non-success response into the matching error category.
async fn error_from_response(resp: Response) -> Error {
    let status = resp.status();
    let message = match resp.json::<ErrorEnvelope>().await {
        Ok(envelope) => envelope.error.message,
        Err(_) => status.to_string(),
    };
    match status {
        StatusCode::UNAUTHORIZED => Error::Authentication(message),
        StatusCode::FORBIDDEN => Error::Security(message),
        StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => Error::Precondition(message),
        s if s.is_server_error() => Error::Connectivity(format!("{status}: {message}")),
        _ => Error::Protocol(format!("{status}: {message}")),
    }
}

async fn checked(resp: Response) -> Result<Response> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(error_from_response(resp).await)
    }
}

// -- Discovery ----------------------------------------------------------------

/// Discovery over `POST /locator/v1/manager`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpDirectory;

impl DirectoryRpc for HttpDirectory {
    fn discover(
        &self,
        request: DiscoveryRequest,
        ssl: SslParameters,
    ) -> RpcFuture<'_, DiscoveryResponse> {
        Box::pin(async move {
            let tls = !ssl.is_empty();
            let client = build_client(
                tls.then_some(&ssl),
                Duration::from_millis(request.timeout_ms),
            )?;
            let locator = ConnectionEndpoint::new(&request.locator_host, request.locator_port);
            let url = format!("{}{DISCOVERY_PATH}", locator.base_url(tls));
            debug!(%url, "sending discovery request");
            let resp = checked(client.post(&url).json(&request).send().await?).await?;
            Ok(resp.json::<DiscoveryResponse>().await?)
        })
    }
}

// -- Session ------------------------------------------------------------------

/// Opens management sessions over `GET /management/v1/index`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpSessions;

impl SessionRpc for HttpSessions {
    fn open(&self, request: OpenRequest) -> RpcFuture<'_, OpenedSession> {
        Box::pin(async move {
            let tls = request.ssl.is_some();
            let client = build_client(request.ssl.as_ref(), request.timeout)?;
            let base = request.endpoint.base_url(tls);
            if let Some(path) = &request.properties_file {
                debug!(path = %path.display(), "session properties file");
            }

            let req = with_credential(client.get(format!("{base}{INDEX_PATH}")), &request.user);
            let resp = checked(req.send().await?).await?;
            let index = resp.json::<ManagerIndex>().await?;

            let api = ManagementApi { client, base, user: request.user };
            Ok(OpenedSession {
                index,
                membership: Arc::new(api.clone()),
                shared_config: Arc::new(api),
            })
        })
    }
}

/// Authenticated HTTP access to the management endpoint and its locators.
#[derive(Clone)]
pub struct ManagementApi {
    client: Client,
    base: String,
    user: Credential,
}

impl ManagementApi {
    async fn snapshot(&self) -> Result<MembershipSnapshot> {
        let req = with_credential(self.client.get(format!("{}{MEMBERSHIP_PATH}", self.base)), &self.user);
        let resp = checked(req.send().await?).await?;
        Ok(resp.json::<MembershipSnapshot>().await?)
    }

    fn locator_url(locator: &SharedConfigLocator, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&locator.url)
            .map_err(|e| Error::Protocol(format!("bad locator url {:?}: {e}", locator.url)))?;
        url.path_segments_mut()
            .map_err(|()| Error::Protocol(format!("locator url {:?} cannot be a base", locator.url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// A non-success reply becomes a failed outcome rather than an error.
    async fn failed_outcome(resp: Response) -> OperationOutcome {
        OperationOutcome::failed(error_from_response(resp).await.to_string())
    }
}

impl MembershipView for ManagementApi {
    fn shared_config_locators(&self) -> RpcFuture<'_, Vec<SharedConfigLocator>> {
        Box::pin(async move { Ok(self.snapshot().await?.shared_config_locators()) })
    }

    fn connected_members(&self) -> RpcFuture<'_, Vec<String>> {
        Box::pin(async move { Ok(self.snapshot().await?.members) })
    }
}

impl SharedConfigRpc for ManagementApi {
    fn export<'a>(
        &'a self,
        locator: &'a SharedConfigLocator,
        group: Option<&'a str>,
    ) -> RpcFuture<'a, OperationOutcome> {
        Box::pin(async move {
            let url = Self::locator_url(locator, &["config", "v1", "export"])?;
            let body = ExportRequest { group: group.map(str::to_owned) };
            let resp = with_credential(self.client.post(url), &self.user).json(&body).send().await?;
            if !resp.status().is_success() {
                return Ok(Self::failed_outcome(resp).await);
            }
            let artifact = ConfigArtifact::decode(resp.bytes().await?)?;
            let message = format!("exported {} from {locator}", artifact.name);
            Ok(OperationOutcome::succeeded(Some(artifact), message))
        })
    }

    fn import<'a>(
        &'a self,
        locator: &'a SharedConfigLocator,
        artifact: &'a ConfigArtifact,
    ) -> RpcFuture<'a, OperationOutcome> {
        Box::pin(async move {
            let url = Self::locator_url(locator, &["config", "v1", "import"])?;
            let resp = with_credential(self.client.post(url), &self.user)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(artifact.encode())
                .send()
                .await?;
            if !resp.status().is_success() {
                return Ok(Self::failed_outcome(resp).await);
            }
            let reply = resp.json::<OperationReply>().await?;
            Ok(OperationOutcome { success: reply.success, artifact: None, message: reply.message })
        })
    }

    fn fetch_bundle<'a>(
        &'a self,
        locator: &'a SharedConfigLocator,
        group: &'a str,
        name: &'a str,
    ) -> RpcFuture<'a, OperationOutcome> {
        Box::pin(async move {
            let url = Self::locator_url(locator, &["config", "v1", "bundles", group, name])?;
            let resp = with_credential(self.client.get(url), &self.user).send().await?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(OperationOutcome::failed(format!("{group}/{name} not found on {locator}")));
            }
            if !resp.status().is_success() {
                return Ok(Self::failed_outcome(resp).await);
            }
            let payload: Bytes = resp.bytes().await?;
            let message = format!("fetched {group}/{name} from {locator}");
            Ok(OperationOutcome::succeeded(Some(ConfigArtifact::new(name, payload)), message))
        })
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
