// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference locator: discovery, management index, membership view, and
//! the shared configuration store.

pub mod config;
pub mod error;
pub mod state;
pub mod store;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::LocatorConfig;
use crate::state::LocatorState;
use crate::transport::build_router;

/// A locator bound to a listener, ready to serve.
pub struct BoundLocator {
    pub addr: SocketAddr,
    pub state: Arc<LocatorState>,
    listener: TcpListener,
}

/// Bind the listener and build state. The locator advertises itself at the
/// bound address, so `port` 0 works for tests.
pub async fn bind(
    mut config: LocatorConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<BoundLocator> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;
    if config.self_manager {
        config.manager_host = Some(addr.ip().to_string());
        config.manager_port = Some(addr.port());
    }
    let self_url = format!("http://{addr}");
    let state = Arc::new(LocatorState::new(config, self_url, shutdown)?);
    Ok(BoundLocator { addr, state, listener })
}

impl BoundLocator {
    /// Serve until the shutdown token is cancelled.
    pub async fn serve(self) -> anyhow::Result<()> {
        let shutdown = self.state.shutdown.clone();
        let router = build_router(self.state);
        axum::serve(self.listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;
        Ok(())
    }
}

/// Run the locator until shutdown.
pub async fn run(config: LocatorConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let locator = bind(config, shutdown.clone()).await?;
    tracing::info!(
        id = %locator.state.config.locator_id(),
        store = %locator.state.store.root().display(),
        "locus-locator listening on {}",
        locator.addr
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });
    locator.serve().await
}
