// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure categories shared by every control-plane operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    ConfigSource,
    Authentication,
    Security,
    Connectivity,
    Precondition,
    Discovery,
    Aborted,
    Protocol,
    NoCandidateSucceeded,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigSource => "CONFIG_SOURCE",
            Self::Authentication => "AUTHENTICATION",
            Self::Security => "SECURITY",
            Self::Connectivity => "CONNECTIVITY",
            Self::Precondition => "PRECONDITION",
            Self::Discovery => "DISCOVERY",
            Self::Aborted => "ABORTED",
            Self::Protocol => "PROTOCOL",
            Self::NoCandidateSucceeded => "NO_CANDIDATE_SUCCEEDED",
        }
    }

    /// Whether a failure of this kind may trigger the single credential re-prompt.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate locator's failure, retained for diagnostics after a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    pub locator: String,
    pub reason: String,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.locator, self.reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not read configuration from {path}: {reason}")]
    ConfigSource { path: String, reason: String },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("security failure: {0}")]
    Security(String),

    #[error("connection failed: {0}")]
    Connectivity(String),

    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    Discovery(String),

    #[error("prompt aborted: {0}")]
    Aborted(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("{operation} failed: no locator succeeded ({} attempted)", failures.len())]
    NoCandidateSucceeded { operation: &'static str, failures: Vec<CandidateFailure> },

    #[error("could not connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Category of this error, looking through endpoint context.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigSource { .. } => ErrorKind::ConfigSource,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Security(_) => ErrorKind::Security,
            Self::Connectivity(_) => ErrorKind::Connectivity,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Discovery(_) => ErrorKind::Discovery,
            Self::Aborted(_) => ErrorKind::Aborted,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::NoCandidateSucceeded { .. } => ErrorKind::NoCandidateSucceeded,
            Self::Connect { source, .. } => source.kind(),
        }
    }

    /// Attach the endpoint an attempt was made against.
    pub fn at_endpoint(self, endpoint: impl fmt::Display) -> Self {
        match self {
            already @ Self::Connect { .. } => already,
            other => Self::Connect { endpoint: endpoint.to_string(), source: Box::new(other) },
        }
    }

    /// Per-candidate failures of a fan-out, empty for every other error.
    pub fn candidate_failures(&self) -> &[CandidateFailure] {
        match self {
            Self::NoCandidateSucceeded { failures, .. } => failures,
            Self::Connect { source, .. } => source.candidate_failures(),
            _ => &[],
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Connectivity(describe_chain(&e));
        }
        if is_tls_failure(&e) {
            return Self::Security(describe_chain(&e));
        }
        if e.is_decode() {
            return Self::Protocol(describe_chain(&e));
        }
        Self::Connectivity(describe_chain(&e))
    }
}

/// Render an error with its source chain on one line.
fn describe_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

fn is_tls_failure(e: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(e);
    while let Some(cause) = source {
        if cause.is::<rustls::Error>() {
            return true;
        }
        // io::Error::source() skips the wrapped error, so inspect it directly.
        if let Some(inner) = cause.downcast_ref::<std::io::Error>().and_then(|io| io.get_ref()) {
            if inner.is::<rustls::Error>() {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
