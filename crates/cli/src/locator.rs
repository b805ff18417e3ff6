// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Locator directory client: asks one locator where the management
//! endpoint currently lives.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::credential::SslParameters;
use crate::endpoint::ConnectionEndpoint;
use crate::error::{Error, Result};
use crate::transport::http::ensure_crypto;
use crate::transport::{DirectoryRpc, DiscoveryRequest, DiscoveryResponse};

/// One locator's discovery answer, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorQueryResult {
    pub management_endpoint: ConnectionEndpoint,
    pub manager_tls_enabled: bool,
}

#[derive(Clone)]
pub struct LocatorDirectoryClient {
    rpc: Arc<dyn DirectoryRpc>,
}

impl LocatorDirectoryClient {
    pub fn new(rpc: Arc<dyn DirectoryRpc>) -> Self {
        Self { rpc }
    }

    /// Send one bounded discovery request to `locator`.
    pub async fn query(
        &self,
        locator: &ConnectionEndpoint,
        timeout: Duration,
        ssl: &SslParameters,
    ) -> Result<LocatorQueryResult> {
        ensure_crypto();

        info!(%locator, "connecting to locator");
        let request = DiscoveryRequest {
            locator_host: locator.host().to_owned(),
            locator_port: locator.port(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            properties: ssl.extra.clone(),
        };

        // The transport bounds itself too; this covers doubles that do not.
        let response = tokio::time::timeout(timeout, self.rpc.discover(request, ssl.clone()))
            .await
            .map_err(|_| {
                Error::Connectivity(format!("locator {locator} did not answer within {timeout:?}"))
            })??;

        let result = classify(response)?;
        debug!(
            %locator,
            manager = %result.management_endpoint,
            tls = result.manager_tls_enabled,
            "locator answered"
        );
        Ok(result)
    }
}

/// Blank host or port 0 is always a failure, whatever else the answer says.
pub fn classify(response: DiscoveryResponse) -> Result<LocatorQueryResult> {
    if response.manager_host.trim().is_empty() || response.manager_port == 0 {
        let message = match response.failure_cause.filter(|c| !c.trim().is_empty()) {
            Some(cause) => format!("management endpoint failed to start: {cause}"),
            None => "could not find a management endpoint via the locator".to_owned(),
        };
        return Err(Error::Discovery(message));
    }
    Ok(LocatorQueryResult {
        management_endpoint: ConnectionEndpoint::new(
            response.manager_host.trim(),
            response.manager_port,
        ),
        manager_tls_enabled: response.manager_tls_enabled,
    })
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;
