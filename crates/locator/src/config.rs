// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

/// Configuration for the reference locator.
#[derive(Debug, Clone, clap::Args)]
pub struct LocatorConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "LOCUS_LOCATOR_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 10334, env = "LOCUS_LOCATOR_PORT")]
    pub port: u16,

    /// Identity reported in membership and the management index.
    #[arg(long, env = "LOCUS_LOCATOR_ID")]
    pub id: Option<String>,

    /// Cluster name reported by the management index.
    #[arg(long, env = "LOCUS_LOCATOR_CLUSTER")]
    pub cluster: Option<String>,

    /// Advertised management host. Defaults to `--host`.
    #[arg(long, env = "LOCUS_LOCATOR_MANAGER_HOST")]
    pub manager_host: Option<String>,

    /// Advertised management port. Without it discovery reports no manager.
    #[arg(long, env = "LOCUS_LOCATOR_MANAGER_PORT")]
    pub manager_port: Option<u16>,

    /// Advertise this locator's own listener as the management endpoint.
    #[arg(long, env = "LOCUS_LOCATOR_SELF_MANAGER", conflicts_with = "manager_port")]
    pub self_manager: bool,

    /// Advertise the manager as TLS-enabled.
    #[arg(long, env = "LOCUS_LOCATOR_MANAGER_TLS")]
    pub manager_tls: bool,

    /// Directory holding the shared configuration store.
    #[arg(long, default_value = "locator-config", env = "LOCUS_LOCATOR_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Username required by management and configuration routes.
    #[arg(long, env = "LOCUS_LOCATOR_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "LOCUS_LOCATOR_PASSWORD")]
    pub password: Option<String>,

    /// Additional shared-configuration locator as `id=url`. Repeatable.
    #[arg(long = "peer", env = "LOCUS_LOCATOR_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Connected data-plane member. Repeatable.
    #[arg(long = "connected-member", env = "LOCUS_LOCATOR_MEMBERS", value_delimiter = ',')]
    pub connected_members: Vec<String>,
}

/// A peer locator from `--peer id=url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: String,
    pub url: String,
}

impl LocatorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.username.is_some() != self.password.is_some() {
            anyhow::bail!("--username and --password must be given together");
        }
        if self.self_manager && self.manager_port.is_some() {
            anyhow::bail!("--self-manager cannot be combined with --manager-port");
        }
        if self.manager_port == Some(0) {
            anyhow::bail!("--manager-port must not be 0");
        }
        self.peer_list()?;
        Ok(())
    }

    pub fn locator_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| format!("locator-{}", self.port))
    }

    pub fn peer_list(&self) -> anyhow::Result<Vec<Peer>> {
        self.peers
            .iter()
            .map(|raw| match raw.split_once('=') {
                Some((id, url)) if !id.trim().is_empty() && !url.trim().is_empty() => {
                    Ok(Peer { id: id.trim().to_owned(), url: url.trim().to_owned() })
                }
                _ => anyhow::bail!("invalid --peer {raw:?}: expected id=url"),
            })
            .collect()
    }

    /// Minimal config for tests: ephemeral port, store in `config_dir`.
    #[doc(hidden)]
    pub fn test(config_dir: PathBuf) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            id: Some("locator-test".into()),
            cluster: None,
            manager_host: None,
            manager_port: None,
            self_manager: false,
            manager_tls: false,
            config_dir,
            username: None,
            password: None,
            peers: vec![],
            connected_members: vec![],
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
