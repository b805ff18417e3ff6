// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end control-plane scenarios.
//!
//! Runs real `locus-locator` instances in-process on ephemeral ports and
//! drives the `locus` library against them over HTTP.

use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use locus::client::Client;
use locus::connect::{ConnectSettings, SessionEstablisher};
use locus::credential::CredentialNegotiator;
use locus::endpoint::ConnectionEndpoint;
use locus::locator::LocatorDirectoryClient;
use locus::prompt::Prompter;
use locus::transport::http::{HttpDirectory, HttpSessions};
use locus_locator::config::LocatorConfig;
use locus_locator::state::LocatorState;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Find a port nothing listens on by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// An in-process locator that shuts down on drop.
pub struct TestLocator {
    addr: SocketAddr,
    state: Arc<LocatorState>,
    shutdown: CancellationToken,
    _dir: tempfile::TempDir,
}

impl TestLocator {
    /// Start a locator with its own store, configured by `configure`.
    pub async fn start(
        id: &str,
        configure: impl FnOnce(&mut LocatorConfig),
    ) -> anyhow::Result<Self> {
        ensure_crypto();
        let dir = tempfile::tempdir()?;
        let mut config = LocatorConfig::test(dir.path().join("store"));
        config.id = Some(id.to_owned());
        configure(&mut config);
        config.validate()?;

        let shutdown = CancellationToken::new();
        let bound = locus_locator::bind(config, shutdown.clone()).await?;
        let addr = bound.addr;
        let state = Arc::clone(&bound.state);
        tokio::spawn(bound.serve());

        let locator = Self { addr, state, shutdown, _dir: dir };
        locator.wait_healthy(Duration::from_secs(5)).await?;
        Ok(locator)
    }

    pub fn endpoint(&self) -> ConnectionEndpoint {
        ConnectionEndpoint::new(self.addr.ip().to_string(), self.addr.port())
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// `--peer` value pointing at this locator.
    pub fn as_peer(&self) -> String {
        format!("{}={}", self.state.config.locator_id(), self.url())
    }

    pub fn state(&self) -> &Arc<LocatorState> {
        &self.state
    }

    /// Poll health until responsive.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let client = reqwest::Client::new();
        let url = format!("{}/health", self.url());
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("locator did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

impl Drop for TestLocator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// A client speaking HTTP, prompting through `prompter`, with no default
/// security properties lookup.
pub fn http_client(prompter: Arc<dyn Prompter>, fanout_timeout: Duration) -> Client {
    let establisher = SessionEstablisher::new(
        CredentialNegotiator::new(prompter).with_default_lookup(|| None),
        LocatorDirectoryClient::new(Arc::new(HttpDirectory)),
        Arc::new(HttpSessions),
        ConnectSettings { timeout: Duration::from_secs(5), ..Default::default() },
    );
    Client::new(establisher, fanout_timeout)
}
