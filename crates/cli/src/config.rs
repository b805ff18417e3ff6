// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::connect::{ConnectRequest, ConnectSettings, TlsDowngradePolicy};
use crate::credential::{Credential, CredentialSources};
use crate::endpoint::{ConnectionEndpoint, DEFAULT_LOCATOR_PORT, DEFAULT_MANAGER_PORT};

/// Cluster control-plane client.
#[derive(Debug, Parser)]
#[command(name = "locus", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log format (json or text).
    #[arg(long, env = "LOCUS_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOCUS_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to the cluster and print the session description.
    Connect(ConnectCommand),
    /// Export the shared cluster configuration to a .zip archive.
    ExportSharedConfig(ExportCommand),
    /// Import a .zip archive as the shared cluster configuration.
    ImportSharedConfig(ImportCommand),
    /// Fetch a deployed code bundle from the shared configuration.
    FetchBundle(FetchBundleCommand),
}

#[derive(Debug, Args)]
pub struct ConnectCommand {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Debug, Args)]
pub struct ExportCommand {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Archive file name; must end in .zip.
    #[arg(long)]
    pub file: String,

    /// Directory to write the archive into.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Restrict the export to one group.
    #[arg(long)]
    pub group: Option<String>,
}

#[derive(Debug, Args)]
pub struct ImportCommand {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Path to the .zip archive to import.
    #[arg(long)]
    pub zip: PathBuf,
}

#[derive(Debug, Args)]
pub struct FetchBundleCommand {
    #[command(flatten)]
    pub connect: ConnectArgs,

    #[arg(long)]
    pub group: String,

    #[arg(long)]
    pub name: String,

    /// Directory to write the bundle into.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

/// Connection flags shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectArgs {
    /// Locator to discover the management endpoint from (host[port]).
    #[arg(long, env = "LOCUS_LOCATOR")]
    pub locator: Option<String>,

    /// Management endpoint to connect to directly (host[port]).
    #[arg(long, env = "LOCUS_MANAGER")]
    pub manager: Option<String>,

    #[arg(long, env = "LOCUS_USER")]
    pub user: Option<String>,

    #[arg(long, env = "LOCUS_PASSWORD")]
    pub password: Option<String>,

    /// PEM file with certificate chain and private key.
    #[arg(long)]
    pub key_store: Option<String>,

    #[arg(long)]
    pub key_store_password: Option<String>,

    /// PEM CA bundle.
    #[arg(long)]
    pub trust_store: Option<String>,

    #[arg(long)]
    pub trust_store_password: Option<String>,

    #[arg(long)]
    pub ciphers: Option<String>,

    /// TLS protocols, e.g. "TLSv1.2,TLSv1.3".
    #[arg(long)]
    pub protocols: Option<String>,

    /// Properties file with ssl-* and session properties.
    #[arg(long, env = "LOCUS_SECURITY_PROPERTIES")]
    pub security_properties_file: Option<PathBuf>,

    /// Request TLS for the connection.
    #[arg(long, env = "LOCUS_USE_SSL")]
    pub use_ssl: bool,

    /// Never prompt for TLS material.
    #[arg(long)]
    pub quiet: bool,

    /// What to do when the manager does not support TLS (allow or deny).
    #[arg(long, env = "LOCUS_TLS_DOWNGRADE", default_value = "allow")]
    pub tls_downgrade: String,

    // -- Duration overrides (skip from CLI; set by tests) -----------------
    #[clap(skip)]
    pub connect_timeout_ms: Option<u64>,
    #[clap(skip)]
    pub fanout_timeout_ms: Option<u64>,
}

fn env_duration_ms(var: &str, default: u64) -> Duration {
    let ms = std::env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default);
    Duration::from_millis(ms)
}

macro_rules! duration_field {
    ($method:ident, $field:ident, $env:literal, $default:expr) => {
        pub fn $method(&self) -> Duration {
            match self.$field {
                Some(ms) => Duration::from_millis(ms),
                None => env_duration_ms($env, $default),
            }
        }
    };
}

impl ConnectArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.locator.is_some() && self.manager.is_some() {
            anyhow::bail!("cannot specify both --locator and --manager");
        }
        if self.password.is_some() && self.user.is_none() {
            anyhow::bail!("--password requires --user");
        }
        self.locator_endpoint()?;
        self.manager_endpoint()?;
        self.tls_downgrade_policy()?;
        Ok(())
    }

    // -- Tuning knobs (field override → env var → compiled default) --------

    duration_field!(connect_timeout, connect_timeout_ms, "LOCUS_CONNECT_TIMEOUT_MS", 60_000);
    duration_field!(fanout_timeout, fanout_timeout_ms, "LOCUS_FANOUT_TIMEOUT_MS", 60_000);

    pub fn tls_downgrade_policy(&self) -> anyhow::Result<TlsDowngradePolicy> {
        self.tls_downgrade.parse()
    }

    pub fn locator_endpoint(&self) -> anyhow::Result<Option<ConnectionEndpoint>> {
        self.locator
            .as_deref()
            .map(|s| ConnectionEndpoint::parse_with_default(s, DEFAULT_LOCATOR_PORT))
            .transpose()
    }

    pub fn manager_endpoint(&self) -> anyhow::Result<Option<ConnectionEndpoint>> {
        self.manager
            .as_deref()
            .map(|s| ConnectionEndpoint::parse_with_default(s, DEFAULT_MANAGER_PORT))
            .transpose()
    }

    pub fn settings(&self) -> anyhow::Result<ConnectSettings> {
        Ok(ConnectSettings {
            timeout: self.connect_timeout(),
            tls_downgrade: self.tls_downgrade_policy()?,
        })
    }

    pub fn request(&self) -> anyhow::Result<ConnectRequest> {
        Ok(ConnectRequest {
            locator: self.locator_endpoint()?,
            manager: self.manager_endpoint()?,
            sources: CredentialSources {
                user: Credential::new(self.user.clone(), self.password.clone()),
                keystore: Credential::new(self.key_store.clone(), self.key_store_password.clone()),
                truststore: Credential::new(
                    self.trust_store.clone(),
                    self.trust_store_password.clone(),
                ),
                ciphers: self.ciphers.clone(),
                protocols: self.protocols.clone(),
                security_properties: self.security_properties_file.clone(),
                use_ssl: self.use_ssl,
                quiet: self.quiet,
            },
        })
    }

    /// Minimal arguments for tests: explicit manager, short timeouts.
    #[doc(hidden)]
    pub fn test(manager: &ConnectionEndpoint) -> Self {
        Self {
            manager: Some(format!("{}[{}]", manager.host(), manager.port())),
            tls_downgrade: "allow".into(),
            quiet: true,
            connect_timeout_ms: Some(2_000),
            fanout_timeout_ms: Some(2_000),
            ..Default::default()
        }
    }
}

impl Cli {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !matches!(self.log_format.as_str(), "json" | "text") {
            anyhow::bail!("invalid log format: {}", self.log_format);
        }
        self.connect_args().validate()?;
        match &self.command {
            Command::ExportSharedConfig(cmd) if cmd.file.trim().is_empty() => {
                anyhow::bail!("--file must not be empty")
            }
            Command::FetchBundle(cmd) if cmd.group.trim().is_empty() || cmd.name.trim().is_empty() => {
                anyhow::bail!("--group and --name must not be empty")
            }
            _ => Ok(()),
        }
    }

    pub fn connect_args(&self) -> &ConnectArgs {
        match &self.command {
            Command::Connect(cmd) => &cmd.connect,
            Command::ExportSharedConfig(cmd) => &cmd.connect,
            Command::ImportSharedConfig(cmd) => &cmd.connect,
            Command::FetchBundle(cmd) => &cmd.connect,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
