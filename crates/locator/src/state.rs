// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use locus::transport::{DiscoveryResponse, LocatorEntry, ManagerIndex, MembershipSnapshot};

use crate::config::{LocatorConfig, Peer};
use crate::store::ConfigStore;

/// Shared locator state.
pub struct LocatorState {
    pub config: LocatorConfig,
    pub store: ConfigStore,
    pub shutdown: CancellationToken,
    /// URL this locator is reachable at.
    pub self_url: String,
    peers: Vec<Peer>,
    members: RwLock<Vec<String>>,
}

impl LocatorState {
    pub fn new(
        config: LocatorConfig,
        self_url: String,
        shutdown: CancellationToken,
    ) -> anyhow::Result<Self> {
        let store = ConfigStore::open(&config.config_dir)?;
        let peers = config.peer_list()?;
        let members = RwLock::new(config.connected_members.clone());
        Ok(Self { config, store, shutdown, self_url, peers, members })
    }

    pub fn discovery(&self) -> DiscoveryResponse {
        match self.config.manager_port {
            Some(port) => DiscoveryResponse {
                manager_host: self
                    .config
                    .manager_host
                    .clone()
                    .unwrap_or_else(|| self.config.host.clone()),
                manager_port: port,
                manager_tls_enabled: self.config.manager_tls,
                failure_cause: None,
            },
            None => DiscoveryResponse {
                manager_host: String::new(),
                manager_port: 0,
                manager_tls_enabled: false,
                failure_cause: Some("no management endpoint is configured".to_owned()),
            },
        }
    }

    pub fn index(&self) -> ManagerIndex {
        ManagerIndex {
            member: self.config.locator_id(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            cluster: self.config.cluster.clone(),
        }
    }

    /// This locator plus every peer, all hosting shared configuration.
    pub fn membership(&self) -> MembershipSnapshot {
        let local = LocatorEntry {
            id: self.config.locator_id(),
            url: self.self_url.clone(),
            shared_config: true,
        };
        let peers = self
            .peers
            .iter()
            .map(|p| LocatorEntry { id: p.id.clone(), url: p.url.clone(), shared_config: true });
        MembershipSnapshot {
            locators: std::iter::once(local).chain(peers).collect(),
            members: self.members(),
        }
    }

    pub fn members(&self) -> Vec<String> {
        self.members.read().clone()
    }

    pub fn set_members(&self, members: Vec<String>) {
        *self.members.write() = members;
    }
}
