// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk shared configuration store.
//!
//! Layout under the config dir:
//! - `cluster-config.zip`: the cluster-wide archive
//! - `groups/<group>/cluster-config.zip`: per-group archives
//! - `bundles/<group>/<name>`: deployed code bundles

use std::path::{Path, PathBuf};

use bytes::Bytes;
use locus::artifact::ConfigArtifact;

/// File name of a stored configuration archive.
pub const ARCHIVE_NAME: &str = "cluster-config.zip";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The stored archive for `group`, or the cluster-wide one.
    pub fn archive(&self, group: Option<&str>) -> anyhow::Result<Option<ConfigArtifact>> {
        let dir = match group {
            Some(group) => self.root.join("groups").join(checked_segment(group)?),
            None => self.root.clone(),
        };
        read_optional(&dir.join(ARCHIVE_NAME))
            .map(|found| found.map(|payload| ConfigArtifact::new(ARCHIVE_NAME, payload)))
    }

    /// Replace the cluster-wide archive atomically.
    pub fn replace_archive(&self, payload: Bytes) -> anyhow::Result<PathBuf> {
        Ok(ConfigArtifact::new(ARCHIVE_NAME, payload).save_to(&self.root)?)
    }

    pub fn bundle(&self, group: &str, name: &str) -> anyhow::Result<Option<Bytes>> {
        read_optional(&self.bundle_path(group, name)?)
    }

    pub fn put_bundle(&self, group: &str, name: &str, payload: Bytes) -> anyhow::Result<PathBuf> {
        let dir = self.root.join("bundles").join(checked_segment(group)?);
        std::fs::create_dir_all(&dir)?;
        Ok(ConfigArtifact::new(checked_segment(name)?, payload).save_to(&dir)?)
    }

    fn bundle_path(&self, group: &str, name: &str) -> anyhow::Result<PathBuf> {
        Ok(self.root.join("bundles").join(checked_segment(group)?).join(checked_segment(name)?))
    }
}

/// Reject names that would escape the store.
fn checked_segment(segment: &str) -> anyhow::Result<&str> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\'])
        || segment.starts_with('.')
    {
        anyhow::bail!("invalid name {segment:?}");
    }
    Ok(segment)
}

fn read_optional(path: &Path) -> anyhow::Result<Option<Bytes>> {
    match std::fs::read(path) {
        Ok(data) => Ok(Some(Bytes::from(data))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow::anyhow!("could not read {}: {e}", path.display())),
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
