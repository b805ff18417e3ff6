// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential negotiation: merges explicit flags, a security properties
//! file, and (at most once each) interactive prompts into the identity and
//! TLS material for one connection attempt.
//!
//! Precedence is flags > properties file > nothing. The properties file is
//! only read when a path is given or TLS is requested.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::prompt::Prompter;
use crate::properties::{self, PropertyMap};

pub const SSL_KEYSTORE: &str = "ssl-keystore";
pub const SSL_KEYSTORE_PASSWORD: &str = "ssl-keystore-password";
pub const SSL_TRUSTSTORE: &str = "ssl-truststore";
pub const SSL_TRUSTSTORE_PASSWORD: &str = "ssl-truststore-password";
pub const SSL_CIPHERS: &str = "ssl-ciphers";
pub const SSL_PROTOCOLS: &str = "ssl-protocols";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An identifier/secret pair.
///
/// Valid iff both halves are present or both are absent. Identifier-only is
/// the incomplete state that triggers a secret prompt. Blank strings are
/// treated as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential {
    identifier: Option<String>,
    secret: Option<String>,
}

impl Credential {
    pub fn new(identifier: Option<String>, secret: Option<String>) -> Self {
        Self { identifier: non_blank(identifier), secret: non_blank(secret) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn has_identifier(&self) -> bool {
        self.identifier.is_some()
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.identifier.is_some() == self.secret.is_some()
    }

    /// Both halves present.
    pub fn is_complete(&self) -> bool {
        self.identifier.is_some() && self.secret.is_some()
    }

    /// Identifier present, secret still missing.
    pub fn needs_secret(&self) -> bool {
        self.identifier.is_some() && self.secret.is_none()
    }

    pub fn with_secret(self, secret: Option<String>) -> Self {
        Self::new(self.identifier, secret)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

/// TLS material for one connection. Empty means TLS inactive.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SslParameters {
    pub keystore: Credential,
    pub truststore: Credential,
    pub ciphers: Option<String>,
    pub protocols: Option<String>,
    /// Remaining security properties, passed through to the session.
    pub extra: PropertyMap,
}

impl SslParameters {
    pub fn is_empty(&self) -> bool {
        !self.keystore.has_identifier()
            && !self.truststore.has_identifier()
            && self.ciphers.is_none()
            && self.protocols.is_none()
            && self.extra.is_empty()
    }

    /// Split a merged property map into typed TLS fields and pass-through extras.
    pub fn from_properties(mut map: PropertyMap) -> Self {
        let mut take = |key: &str| non_blank(map.shift_remove(key));
        let keystore = Credential::new(take(SSL_KEYSTORE), take(SSL_KEYSTORE_PASSWORD));
        let truststore = Credential::new(take(SSL_TRUSTSTORE), take(SSL_TRUSTSTORE_PASSWORD));
        let ciphers = take(SSL_CIPHERS);
        let protocols = take(SSL_PROTOCOLS);
        Self { keystore, truststore, ciphers, protocols, extra: map }
    }

    /// Comma-separated protocol names, e.g. `TLSv1.2,TLSv1.3`.
    pub fn protocol_list(&self) -> Vec<String> {
        split_list(self.protocols.as_deref())
    }

    pub fn cipher_list(&self) -> Vec<String> {
        split_list(self.ciphers.as_deref())
    }
}

impl fmt::Debug for SslParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SslParameters")
            .field("keystore", &self.keystore)
            .field("truststore", &self.truststore)
            .field("ciphers", &self.ciphers)
            .field("protocols", &self.protocols)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split([',', ' '])
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

/// Explicit inputs for one negotiation, already resolved from flags/env.
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    pub user: Credential,
    pub keystore: Credential,
    pub truststore: Credential,
    pub ciphers: Option<String>,
    pub protocols: Option<String>,
    pub security_properties: Option<PathBuf>,
    pub use_ssl: bool,
    /// Skip the interactive TLS prompt round.
    pub quiet: bool,
}

/// Output of [`CredentialNegotiator::resolve`].
#[derive(Debug, Clone, Default)]
pub struct Negotiated {
    pub user: Credential,
    pub ssl: SslParameters,
    /// TLS was explicitly requested (as opposed to implied by material).
    pub tls_requested: bool,
    /// Properties file that was read, if any.
    pub properties_file: Option<PathBuf>,
}

impl Negotiated {
    /// TLS is active iff material is present or it was explicitly requested.
    pub fn ssl_active(&self) -> bool {
        self.tls_requested || !self.ssl.is_empty()
    }
}

type DefaultFileLookup = Arc<dyn Fn() -> Option<PathBuf> + Send + Sync>;

// ---------------------------------------------------------------------------
// Negotiator
// ---------------------------------------------------------------------------

/// Resolves identity and TLS material with minimal re-prompting.
#[derive(Clone)]
pub struct CredentialNegotiator {
    prompter: Arc<dyn Prompter>,
    locate_default: DefaultFileLookup,
}

impl CredentialNegotiator {
    pub fn new(prompter: Arc<dyn Prompter>) -> Self {
        Self { prompter, locate_default: Arc::new(properties::locate_default_from_env) }
    }

    /// Override how the default security properties file is found.
    pub fn with_default_lookup(
        mut self,
        lookup: impl Fn() -> Option<PathBuf> + Send + Sync + 'static,
    ) -> Self {
        self.locate_default = Arc::new(lookup);
        self
    }

    pub fn prompter(&self) -> &Arc<dyn Prompter> {
        &self.prompter
    }

    /// Merge all sources into a usable user credential and TLS parameters.
    pub fn resolve(&self, sources: &CredentialSources) -> Result<Negotiated> {
        let user = self.complete_user(sources.user.clone())?;

        let (mut merged, properties_file) = self.read_properties(sources);

        let mut keystore = sources.keystore.clone();
        let mut truststore = sources.truststore.clone();
        let mut ciphers = sources.ciphers.clone();
        let mut protocols = sources.protocols.clone();

        for round in 0..2 {
            let prompting = round > 0;
            if prompting {
                info!("TLS requested but no TLS configuration found; prompting");
                keystore = Credential::new(
                    Some(self.prompter.prompt_text("key-store")?),
                    keystore.secret().map(str::to_owned),
                );
            }
            keystore = self.complete_store(
                keystore,
                &merged,
                SSL_KEYSTORE_PASSWORD,
                "key-store password",
            )?;
            if keystore.is_complete() {
                put(&mut merged, SSL_KEYSTORE, keystore.identifier());
                put(&mut merged, SSL_KEYSTORE_PASSWORD, keystore.secret());
            }

            if prompting {
                truststore = Credential::new(
                    Some(self.prompter.prompt_text("trust-store")?),
                    truststore.secret().map(str::to_owned),
                );
            }
            truststore = self.complete_store(
                truststore,
                &merged,
                SSL_TRUSTSTORE_PASSWORD,
                "trust-store password",
            )?;
            if truststore.is_complete() {
                put(&mut merged, SSL_TRUSTSTORE, truststore.identifier());
                put(&mut merged, SSL_TRUSTSTORE_PASSWORD, truststore.secret());
            }

            if prompting {
                ciphers = Some(self.prompter.prompt_text("ssl-ciphers")?);
            }
            put(&mut merged, SSL_CIPHERS, ciphers.as_deref());

            if prompting {
                protocols = Some(self.prompter.prompt_text("ssl-protocols")?);
            }
            put(&mut merged, SSL_PROTOCOLS, protocols.as_deref());

            if !(sources.use_ssl && merged.is_empty()) {
                break;
            }
            if sources.quiet || !self.prompter.is_interactive() {
                debug!("TLS requested without configuration; skipping the TLS prompt");
                break;
            }
        }

        Ok(Negotiated {
            user,
            ssl: SslParameters::from_properties(merged),
            tls_requested: sources.use_ssl,
            properties_file,
        })
    }

    /// Prompt once for a missing user secret. A blank answer is rejected.
    fn complete_user(&self, user: Credential) -> Result<Credential> {
        if !user.needs_secret() {
            return Ok(user);
        }
        let secret = self.prompter.prompt_secret("password")?;
        let user = user.with_secret(Some(secret));
        if !user.has_secret() {
            return Err(Error::Authentication("a password must be specified".to_owned()));
        }
        Ok(user)
    }

    /// Fill a store password from the property map, else prompt once.
    fn complete_store(
        &self,
        store: Credential,
        merged: &PropertyMap,
        password_key: &str,
        label: &str,
    ) -> Result<Credential> {
        if !store.needs_secret() {
            return Ok(store);
        }
        let secret = match merged.get(password_key) {
            Some(from_file) => from_file.clone(),
            None => self.prompter.prompt_secret(label)?,
        };
        Ok(store.with_secret(Some(secret)))
    }

    fn read_properties(&self, sources: &CredentialSources) -> (PropertyMap, Option<PathBuf>) {
        if !sources.use_ssl && sources.security_properties.is_none() {
            return (PropertyMap::new(), None);
        }

        let path = match &sources.security_properties {
            Some(given) if given.is_file() => Some(given.clone()),
            Some(given) => {
                warn!(path = %given.display(), "security properties file not found");
                None
            }
            None => (self.locate_default)(),
        };

        match path {
            Some(path) => {
                debug!(path = %path.display(), "using security properties file");
                (properties::load_or_empty(&path), Some(path))
            }
            None => (PropertyMap::new(), None),
        }
    }
}

fn put(map: &mut PropertyMap, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        map.insert(key.to_owned(), value.to_owned());
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
