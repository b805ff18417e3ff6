// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client facade: owns the session slot and gates shared-configuration
//! operations on an established session.

use std::sync::Arc;
use std::time::Duration;

use crate::connect::{
    ConnectReport, ConnectRequest, ConnectSettings, SessionEstablisher, SettleHook,
};
use crate::credential::CredentialNegotiator;
use crate::error::{Error, Result};
use crate::locator::LocatorDirectoryClient;
use crate::prompt::Prompter;
use crate::session::{SessionDescription, SessionHandle, SessionSlot};
use crate::shared_config::SharedConfigCoordinator;
use crate::transport::http::{HttpDirectory, HttpSessions};

pub struct Client {
    slot: SessionSlot,
    establisher: SessionEstablisher,
    fanout_timeout: Duration,
}

impl Client {
    pub fn new(establisher: SessionEstablisher, fanout_timeout: Duration) -> Self {
        Self { slot: SessionSlot::new(), establisher, fanout_timeout }
    }

    /// A client speaking HTTP to locators and management endpoints.
    pub fn over_http(
        prompter: Arc<dyn Prompter>,
        settings: ConnectSettings,
        fanout_timeout: Duration,
    ) -> Self {
        let establisher = SessionEstablisher::new(
            CredentialNegotiator::new(prompter),
            LocatorDirectoryClient::new(Arc::new(HttpDirectory)),
            Arc::new(HttpSessions),
            settings,
        );
        Self::new(establisher, fanout_timeout)
    }

    /// Run `hook` once whenever a connect attempt settles.
    pub fn with_settle_hook(mut self, hook: SettleHook) -> Self {
        self.establisher = self.establisher.with_settle_hook(hook);
        self
    }

    pub async fn connect(
        &self,
        request: &ConnectRequest,
    ) -> Result<(SessionDescription, ConnectReport)> {
        self.establisher.connect(&self.slot, request).await
    }

    pub fn session(&self) -> Option<Arc<SessionHandle>> {
        self.slot.current()
    }

    /// Drop the active session, returning its description.
    pub fn disconnect(&self) -> Option<SessionDescription> {
        self.slot.clear().map(|s| s.description())
    }

    /// Shared-configuration operations against the active session.
    pub fn shared_config(&self) -> Result<SharedConfigCoordinator> {
        let session = self
            .slot
            .current()
            .ok_or_else(|| Error::Precondition("not connected".to_owned()))?;
        Ok(SharedConfigCoordinator::new(
            Arc::clone(session.membership()),
            Arc::clone(session.shared_config()),
            self.fanout_timeout,
        ))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
