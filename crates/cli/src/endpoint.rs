// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host/port addressing for locators and management endpoints.
//!
//! Endpoints are written `host[port]` on the command line and in logs;
//! `host:port` is accepted as input too.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default port a locator listens on.
pub const DEFAULT_LOCATOR_PORT: u16 = 10334;

/// Default port a management endpoint listens on.
pub const DEFAULT_MANAGER_PORT: u16 = 1099;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionEndpoint {
    host: String,
    port: u16,
}

impl ConnectionEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Parse `host[port]`, `host:port`, or a bare `host` (using `default_port`).
    /// IPv6 literals are accepted bare, as `v6[port]`, or as `[v6]:port`.
    pub fn parse_with_default(s: &str, default_port: u16) -> anyhow::Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            anyhow::bail!("endpoint must not be empty");
        }

        let bracketed_v6 = s
            .strip_prefix('[')
            .and_then(|rest| rest.split_once(']'))
            .filter(|(host, _)| host.contains(':'));

        let (host, port) = if let Some((host, tail)) = bracketed_v6 {
            match tail {
                "" => (host, default_port),
                _ => match tail.strip_prefix(':') {
                    Some(port) => (host, parse_port(s, port)?),
                    None => anyhow::bail!("invalid endpoint {s:?}: expected [address]:port"),
                },
            }
        } else if let Some(open) = s.find('[') {
            let Some(rest) = s[open + 1..].strip_suffix(']') else {
                anyhow::bail!("invalid endpoint {s:?}: expected host[port]");
            };
            (&s[..open], parse_port(s, rest)?)
        } else if s.matches(':').count() > 1 {
            (s, default_port)
        } else if let Some((host, port)) = s.rsplit_once(':') {
            (host, parse_port(s, port)?)
        } else {
            (s, default_port)
        };

        if host.is_empty() {
            anyhow::bail!("invalid endpoint {s:?}: missing host");
        }
        Ok(Self::new(host, port))
    }

    /// Base URL for HTTP access to this endpoint.
    pub fn base_url(&self, tls: bool) -> String {
        let scheme = if tls { "https" } else { "http" };
        if self.host.contains(':') {
            format!("{scheme}://[{}]:{}", self.host, self.port)
        } else {
            format!("{scheme}://{}:{}", self.host, self.port)
        }
    }
}

fn parse_port(input: &str, port: &str) -> anyhow::Result<u16> {
    match port.trim().parse::<u16>() {
        Ok(0) | Err(_) => anyhow::bail!("invalid endpoint {input:?}: bad port {port:?}"),
        Ok(p) => Ok(p),
    }
}

impl FromStr for ConnectionEndpoint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_default(s, DEFAULT_LOCATOR_PORT)
    }
}

impl fmt::Display for ConnectionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.host, self.port)
    }
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
