// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session establishment as an explicit state machine.
//!
//! ```text
//! Unstarted -> ResolvingEndpoint -> Authenticating -> Established
//!                     |                 |   ^
//!                     v                 v   | (one retry, prompted credential)
//!                   Failed <------------+---+
//! ```
//!
//! An authentication failure is retried at most [`MAX_AUTH_RETRIES`] times,
//! only when no identifier had been supplied, and always against the
//! endpoint that was already resolved.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::credential::{Credential, CredentialNegotiator, CredentialSources, Negotiated};
use crate::endpoint::{ConnectionEndpoint, DEFAULT_LOCATOR_PORT};
use crate::error::{Error, Result};
use crate::locator::LocatorDirectoryClient;
use crate::session::{SessionDescription, SessionHandle, SessionSlot};
use crate::transport::{OpenRequest, SessionRpc};

/// Upper bound on credential re-prompts per connect attempt.
pub const MAX_AUTH_RETRIES: u32 = 1;

/// Default bound on every connect-path network call.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(60_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Unstarted,
    ResolvingEndpoint,
    Authenticating,
    Established,
    Failed,
}

impl ConnectState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Established | Self::Failed)
    }
}

impl fmt::Display for ConnectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unstarted => "unstarted",
            Self::ResolvingEndpoint => "resolving-endpoint",
            Self::Authenticating => "authenticating",
            Self::Established => "established",
            Self::Failed => "failed",
        })
    }
}

/// What to do when TLS is in use but the manager does not support it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TlsDowngradePolicy {
    /// Continue in plaintext and record the downgrade.
    #[default]
    Allow,
    /// Fail with a security error.
    Deny,
}

impl fmt::Display for TlsDowngradePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

impl std::str::FromStr for TlsDowngradePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => anyhow::bail!("invalid TLS downgrade policy: {other}"),
        }
    }
}

/// Where to connect and with which inputs.
#[derive(Debug, Clone, Default)]
pub struct ConnectRequest {
    /// Locator to ask for the management endpoint.
    pub locator: Option<ConnectionEndpoint>,
    /// Explicit management endpoint; skips the locator.
    pub manager: Option<ConnectionEndpoint>,
    pub sources: CredentialSources,
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectSettings {
    pub timeout: Duration,
    pub tls_downgrade: TlsDowngradePolicy,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self { timeout: DEFAULT_CONNECT_TIMEOUT, tls_downgrade: TlsDowngradePolicy::default() }
    }
}

/// Trace of one connect call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectReport {
    /// Every state entered, in order.
    pub transitions: Vec<ConnectState>,
    pub auth_retries: u32,
    pub tls_downgraded: bool,
    pub endpoint: Option<ConnectionEndpoint>,
    /// An existing session was returned without connecting.
    pub reused: bool,
}

/// Called once when a connect attempt settles, success or failure.
pub type SettleHook = Arc<dyn Fn() + Send + Sync>;

struct SettleOnDrop(Option<SettleHook>);

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        if let Some(hook) = self.0.take() {
            hook();
        }
    }
}

/// Mutable state threaded through one attempt.
struct Attempt<'a> {
    request: &'a ConnectRequest,
    slot: &'a SessionSlot,
    negotiated: Negotiated,
    endpoint: Option<ConnectionEndpoint>,
    tls: bool,
    report: ConnectReport,
    established: Option<Arc<SessionHandle>>,
    failure: Option<Error>,
}

/// Drives discovery, negotiation, and authentication to an established session.
#[derive(Clone)]
pub struct SessionEstablisher {
    negotiator: CredentialNegotiator,
    directory: LocatorDirectoryClient,
    sessions: Arc<dyn SessionRpc>,
    settings: ConnectSettings,
    on_settle: Option<SettleHook>,
}

impl SessionEstablisher {
    pub fn new(
        negotiator: CredentialNegotiator,
        directory: LocatorDirectoryClient,
        sessions: Arc<dyn SessionRpc>,
        settings: ConnectSettings,
    ) -> Self {
        Self { negotiator, directory, sessions, settings, on_settle: None }
    }

    pub fn with_settle_hook(mut self, hook: SettleHook) -> Self {
        self.on_settle = Some(hook);
        self
    }

    /// Establish a session into `slot`, or return the one already there.
    ///
    /// On failure the slot is left untouched.
    pub async fn connect(
        &self,
        slot: &SessionSlot,
        request: &ConnectRequest,
    ) -> Result<(SessionDescription, ConnectReport)> {
        if let Some(existing) = slot.current() {
            debug!(endpoint = %existing.endpoint(), "already connected");
            let report = ConnectReport {
                transitions: vec![ConnectState::Established],
                endpoint: Some(existing.endpoint().clone()),
                reused: true,
                ..Default::default()
            };
            return Ok((existing.description(), report));
        }

        let _settle = SettleOnDrop(self.on_settle.clone());
        let mut attempt = Attempt {
            request,
            slot,
            negotiated: Negotiated::default(),
            endpoint: None,
            tls: false,
            report: ConnectReport::default(),
            established: None,
            failure: None,
        };

        let mut state = ConnectState::Unstarted;
        loop {
            attempt.report.transitions.push(state);
            match state {
                ConnectState::Established => break,
                ConnectState::Failed => {
                    let err = attempt
                        .failure
                        .take()
                        .unwrap_or_else(|| Error::Connectivity("connect failed".to_owned()));
                    warn!(err = %err, kind = %err.kind(), "connect failed");
                    return Err(err);
                }
                _ => {}
            }
            let from = state;
            state = match self.step(state, &mut attempt).await {
                Ok(next) => next,
                Err(e) => {
                    attempt.failure = Some(e);
                    ConnectState::Failed
                }
            };
            debug!(%from, to = %state, "connect transition");
        }

        let session = attempt
            .established
            .take()
            .ok_or_else(|| Error::Connectivity("no session after connect".to_owned()))?;
        info!(endpoint = %session.endpoint(), "successfully connected");
        Ok((session.description(), attempt.report))
    }

    async fn step(&self, state: ConnectState, attempt: &mut Attempt<'_>) -> Result<ConnectState> {
        match state {
            ConnectState::Unstarted => {
                attempt.negotiated = self.negotiate(attempt.request.sources.clone()).await?;
                Ok(ConnectState::ResolvingEndpoint)
            }
            ConnectState::ResolvingEndpoint => {
                self.resolve_endpoint(attempt).await?;
                Ok(ConnectState::Authenticating)
            }
            ConnectState::Authenticating => self.authenticate(attempt).await,
            terminal => Ok(terminal),
        }
    }

    async fn negotiate(&self, sources: CredentialSources) -> Result<Negotiated> {
        let negotiator = self.negotiator.clone();
        tokio::task::spawn_blocking(move || negotiator.resolve(&sources))
            .await
            .map_err(|e| Error::Aborted(format!("credential negotiation interrupted: {e}")))?
    }

    async fn resolve_endpoint(&self, attempt: &mut Attempt<'_>) -> Result<()> {
        let ssl_active = attempt.negotiated.ssl_active();

        let (endpoint, manager_tls) = match &attempt.request.manager {
            Some(manager) => (manager.clone(), ssl_active),
            None => {
                let locator = attempt
                    .request
                    .locator
                    .clone()
                    .unwrap_or_else(|| ConnectionEndpoint::new("localhost", DEFAULT_LOCATOR_PORT));
                if ssl_active {
                    info!(%locator, "connecting to locator via TLS");
                }
                let found = self
                    .directory
                    .query(&locator, self.settings.timeout, &attempt.negotiated.ssl)
                    .await
                    .map_err(|e| e.at_endpoint(&locator))?;
                (found.management_endpoint, found.manager_tls_enabled)
            }
        };

        if ssl_active && !manager_tls {
            if self.settings.tls_downgrade == TlsDowngradePolicy::Deny {
                return Err(Error::Security(
                    "TLS is in use but the management endpoint does not support it".to_owned(),
                )
                .at_endpoint(&endpoint));
            }
            info!(%endpoint, "management endpoint does not support TLS; connecting without TLS");
            attempt.report.tls_downgraded = true;
            attempt.tls = false;
        } else if ssl_active {
            if attempt.negotiated.ssl.is_empty() {
                return Err(Error::Security(
                    "TLS was requested but no TLS configuration was provided".to_owned(),
                )
                .at_endpoint(&endpoint));
            }
            debug!(%endpoint, "connecting to management endpoint via TLS");
            attempt.tls = true;
        }

        info!(%endpoint, "connecting to management endpoint");
        attempt.report.endpoint = Some(endpoint.clone());
        attempt.endpoint = Some(endpoint);
        Ok(())
    }

    async fn authenticate(&self, attempt: &mut Attempt<'_>) -> Result<ConnectState> {
        let endpoint = attempt
            .endpoint
            .clone()
            .ok_or_else(|| Error::Precondition("no management endpoint resolved".to_owned()))?;

        let request = OpenRequest {
            endpoint: endpoint.clone(),
            user: attempt.negotiated.user.clone(),
            ssl: attempt.tls.then(|| attempt.negotiated.ssl.clone()),
            properties_file: attempt.negotiated.properties_file.clone(),
            timeout: self.settings.timeout,
        };

        let opened = match tokio::time::timeout(self.settings.timeout, self.sessions.open(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Connectivity(format!(
                "no answer within {:?}",
                self.settings.timeout
            ))),
        };

        match opened {
            Ok(opened) => {
                let handle = SessionHandle::new(
                    endpoint,
                    attempt.tls,
                    attempt.report.tls_downgraded,
                    attempt.negotiated.user.identifier().map(str::to_owned),
                    opened,
                );
                let handle = Arc::new(handle);
                if let Some(previous) = attempt.slot.replace(Arc::clone(&handle)) {
                    debug!(previous = %previous.id(), "superseded session");
                }
                attempt.established = Some(handle);
                Ok(ConnectState::Established)
            }
            Err(e) if self.may_retry(&e, attempt) => {
                info!(err = %e, "authentication required; prompting for credentials");
                let prompted = self.prompt_for_user().await?;
                if !prompted.has_identifier() || !prompted.is_valid() {
                    return Err(e.at_endpoint(&endpoint));
                }
                attempt.negotiated.user = prompted;
                attempt.report.auth_retries += 1;
                Ok(ConnectState::Authenticating)
            }
            Err(e) => Err(e.at_endpoint(&endpoint)),
        }
    }

    fn may_retry(&self, err: &Error, attempt: &Attempt<'_>) -> bool {
        err.kind().is_authentication()
            && !attempt.negotiated.user.has_identifier()
            && attempt.report.auth_retries < MAX_AUTH_RETRIES
    }

    async fn prompt_for_user(&self) -> Result<Credential> {
        let prompter = Arc::clone(self.negotiator.prompter());
        tokio::task::spawn_blocking(move || -> Result<Credential> {
            let identifier = prompter.prompt_text("username")?;
            let secret = prompter.prompt_secret("password")?;
            Ok(Credential::new(Some(identifier), Some(secret)))
        })
        .await
        .map_err(|e| Error::Aborted(format!("credential prompt interrupted: {e}")))?
    }
}

#[cfg(test)]
#[path = "connect_tests.rs"]
mod tests;
