// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared-configuration fan-out: export, import, and bundle fetch across
//! every locator hosting shared configuration.
//!
//! One task per candidate, each under its own timeout. The first success
//! wins and the remaining tasks are aborted. Individual failures are logged
//! and kept for diagnostics; only "no candidate succeeded" is surfaced.
//! All local checks run before the candidate set is even read.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::artifact::{self, ConfigArtifact};
use crate::error::{CandidateFailure, Error, Result};
use crate::transport::{
    MembershipView, OperationOutcome, RpcFuture, SharedConfigLocator, SharedConfigRpc,
};

/// Default per-candidate timeout.
pub const DEFAULT_FANOUT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// The operation dispatched to each candidate.
#[derive(Debug, Clone)]
enum Dispatch {
    Export { group: Option<String> },
    Import(ConfigArtifact),
    Fetch { group: String, name: String },
}

impl Dispatch {
    fn name(&self) -> &'static str {
        match self {
            Self::Export { .. } => "export",
            Self::Import(_) => "import",
            Self::Fetch { .. } => "fetch-bundle",
        }
    }

    fn invoke<'a>(
        &'a self,
        rpc: &'a dyn SharedConfigRpc,
        locator: &'a SharedConfigLocator,
    ) -> RpcFuture<'a, OperationOutcome> {
        match self {
            Self::Export { group } => rpc.export(locator, group.as_deref()),
            Self::Import(artifact) => rpc.import(locator, artifact),
            Self::Fetch { group, name } => rpc.fetch_bundle(locator, group, name),
        }
    }

    /// Whether a successful outcome is usable for this operation.
    fn accepts(&self, outcome: &OperationOutcome) -> bool {
        match self {
            Self::Import(_) => true,
            Self::Export { .. } | Self::Fetch { .. } => outcome.artifact.is_some(),
        }
    }
}

/// The winning candidate of a fan-out.
#[derive(Debug, Clone)]
pub struct FanoutWinner {
    pub locator: String,
    pub outcome: OperationOutcome,
    /// Candidates that failed before the winner answered.
    pub failures: Vec<CandidateFailure>,
}

/// Result of a successful export or bundle fetch.
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub artifact: ConfigArtifact,
    pub locator: String,
    pub message: String,
    /// Where the artifact was written, when a directory was given.
    pub saved_to: Option<PathBuf>,
    pub failures: Vec<CandidateFailure>,
}

/// Result of a successful import.
#[derive(Debug, Clone)]
pub struct Imported {
    pub locator: String,
    pub message: String,
    pub failures: Vec<CandidateFailure>,
}

pub struct SharedConfigCoordinator {
    membership: Arc<dyn MembershipView>,
    rpc: Arc<dyn SharedConfigRpc>,
    timeout: Duration,
}

impl SharedConfigCoordinator {
    pub fn new(
        membership: Arc<dyn MembershipView>,
        rpc: Arc<dyn SharedConfigRpc>,
        timeout: Duration,
    ) -> Self {
        Self { membership, rpc, timeout }
    }

    /// Export the cluster configuration archive as `file_name`, optionally
    /// writing it into `dir`.
    pub async fn export(
        &self,
        file_name: &str,
        dir: Option<&Path>,
        group: Option<&str>,
    ) -> Result<Retrieved> {
        artifact::validate_archive_name(file_name)?;
        if let Some(dir) = dir {
            artifact::check_destination(dir)?;
        }

        let candidates = self.candidates().await?;
        let dispatch = Dispatch::Export { group: group.map(str::to_owned) };
        let winner = self.first_success(dispatch, candidates).await?;
        let payload = winner.outcome.artifact.map(|a| a.payload).unwrap_or_default();
        let artifact = ConfigArtifact::new(file_name, payload);
        let saved_to = dir.map(|d| artifact.save_to(d)).transpose()?;
        if let Some(path) = &saved_to {
            info!(path = %path.display(), "shared configuration exported");
        }
        Ok(Retrieved {
            artifact,
            locator: winner.locator,
            message: winner.outcome.message,
            saved_to,
            failures: winner.failures,
        })
    }

    /// Import the archive at `path` into the cluster configuration.
    ///
    /// Refused while any data-plane member is connected.
    pub async fn import(&self, path: &Path) -> Result<Imported> {
        let members = self.membership.connected_members().await?;
        if !members.is_empty() {
            return Err(Error::Precondition(format!(
                "cannot import cluster configuration while {} member(s) are running: {}",
                members.len(),
                members.join(", ")
            )));
        }

        let candidates = self.candidates().await?;
        if candidates.is_empty() {
            return Err(Error::Precondition(
                "no locators available with shared configuration".to_owned(),
            ));
        }

        artifact::check_import_source(path)?;
        let upload = ConfigArtifact::read_from(path).await?;
        debug!(name = %upload.name, bytes = upload.payload.len(), "importing archive");

        let winner = self.first_success(Dispatch::Import(upload), candidates).await?;
        Ok(Imported {
            locator: winner.locator,
            message: winner.outcome.message,
            failures: winner.failures,
        })
    }

    /// Fetch a deployed code bundle, optionally writing it into `dir`.
    pub async fn fetch_bundle(
        &self,
        group: &str,
        name: &str,
        dir: Option<&Path>,
    ) -> Result<Retrieved> {
        if group.trim().is_empty() || name.trim().is_empty() {
            return Err(Error::Precondition("bundle group and name must not be empty".to_owned()));
        }
        if let Some(dir) = dir {
            artifact::check_destination(dir)?;
        }

        let candidates = self.candidates().await?;
        let dispatch = Dispatch::Fetch { group: group.to_owned(), name: name.to_owned() };
        let winner = self.first_success(dispatch, candidates).await?;
        let payload = winner.outcome.artifact.map(|a| a.payload).unwrap_or_default();
        let artifact = ConfigArtifact::new(name, payload);
        let saved_to = dir.map(|d| artifact.save_to(d)).transpose()?;
        Ok(Retrieved {
            artifact,
            locator: winner.locator,
            message: winner.outcome.message,
            saved_to,
            failures: winner.failures,
        })
    }

    /// Read the candidate set fresh. Unreachable locators are skipped.
    async fn candidates(&self) -> Result<Vec<SharedConfigLocator>> {
        let all = self.membership.shared_config_locators().await?;
        let (reachable, skipped): (Vec<_>, Vec<_>) = all.into_iter().partition(|l| l.reachable);
        for locator in &skipped {
            debug!(%locator, "skipping unreachable locator");
        }
        Ok(reachable)
    }

    async fn first_success(
        &self,
        dispatch: Dispatch,
        candidates: Vec<SharedConfigLocator>,
    ) -> Result<FanoutWinner> {
        let operation = dispatch.name();
        let dispatch = Arc::new(dispatch);
        let mut tasks = JoinSet::new();

        for locator in candidates {
            let rpc = Arc::clone(&self.rpc);
            let dispatch = Arc::clone(&dispatch);
            let timeout = self.timeout;
            tasks.spawn(async move {
                let result = tokio::time::timeout(timeout, dispatch.invoke(rpc.as_ref(), &locator))
                    .await
                    .unwrap_or_else(|_| {
                        Err(Error::Connectivity(format!("no answer within {timeout:?}")))
                    });
                (locator, result)
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (locator, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    failures.push(record_failure(operation, "<task>", e.to_string()));
                    continue;
                }
            };
            match result {
                Ok(outcome) if outcome.success && dispatch.accepts(&outcome) => {
                    tasks.abort_all();
                    info!(%locator, operation, "candidate succeeded");
                    return Ok(FanoutWinner { locator: locator.id, outcome, failures });
                }
                Ok(outcome) if outcome.success => {
                    let reason = "reported success without an artifact".to_owned();
                    failures.push(record_failure(operation, &locator.id, reason));
                }
                Ok(outcome) => failures.push(record_failure(operation, &locator.id, outcome.message)),
                Err(e) => failures.push(record_failure(operation, &locator.id, e.to_string())),
            }
        }

        Err(Error::NoCandidateSucceeded { operation, failures })
    }
}

fn record_failure(operation: &str, locator: &str, reason: String) -> CandidateFailure {
    warn!(locator, operation, %reason, "candidate failed");
    CandidateFailure { locator: locator.to_owned(), reason }
}

#[cfg(test)]
#[path = "shared_config_tests.rs"]
mod tests;
