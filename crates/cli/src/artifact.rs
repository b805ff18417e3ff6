// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration artifacts and their binary framing.
//!
//! Frame layout: `u32` BE name length, UTF-8 name, `u64` BE payload length,
//! payload. Payloads are never re-encoded.

use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Extension required for cluster configuration archives.
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// A named, opaque configuration blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigArtifact {
    pub name: String,
    pub payload: Bytes,
}

impl ConfigArtifact {
    pub fn new(name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self { name: name.into(), payload: payload.into() }
    }

    /// Read an artifact from disk, named after the file.
    pub async fn read_from(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::Precondition(format!("{} is not a file", path.display())))?;
        let payload = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Precondition(format!("could not read {}: {e}", path.display())))?;
        Ok(Self::new(name, payload))
    }

    /// Write the payload under `dir/name` atomically (temp file + rename),
    /// creating `dir` if missing.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let target = dir.join(&self.name);
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = dir.join(format!(".{}.{}.{seq}.tmp", self.name, std::process::id()));
        let write = || -> std::io::Result<()> {
            std::fs::create_dir_all(dir)?;
            std::fs::write(&tmp, &self.payload)?;
            std::fs::rename(&tmp, &target)
        };
        if let Err(e) = write() {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::Precondition(format!("could not write {}: {e}", target.display())));
        }
        Ok(target)
    }

    /// Append this artifact's frame to `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(4 + self.name.len() + 8 + self.payload.len());
        buf.put_u32(self.name.len() as u32);
        buf.put_slice(self.name.as_bytes());
        buf.put_u64(self.payload.len() as u64);
        buf.put_slice(&self.payload);
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Decode exactly one frame; trailing bytes are an error.
    pub fn decode(mut data: Bytes) -> Result<Self> {
        let artifact = decode_frame(&mut data)?;
        if data.has_remaining() {
            return Err(Error::Protocol(format!("{} trailing bytes after frame", data.remaining())));
        }
        Ok(artifact)
    }
}

fn decode_frame(data: &mut Bytes) -> Result<ConfigArtifact> {
    let name_len = take_len(data, 4, "name length")? as usize;
    if name_len == 0 {
        return Err(Error::Protocol("artifact name is empty".to_owned()));
    }
    let name = take_bytes(data, name_len, "name")?;
    let name = String::from_utf8(name.to_vec())
        .map_err(|_| Error::Protocol("artifact name is not UTF-8".to_owned()))?;

    let payload_len = take_len(data, 8, "payload length")?;
    let payload_len = usize::try_from(payload_len)
        .map_err(|_| Error::Protocol(format!("payload length {payload_len} too large")))?;
    let payload = take_bytes(data, payload_len, "payload")?;
    Ok(ConfigArtifact { name, payload })
}

fn take_len(data: &mut Bytes, width: usize, what: &str) -> Result<u64> {
    if data.remaining() < width {
        return Err(truncated(what));
    }
    Ok(if width == 4 { u64::from(data.get_u32()) } else { data.get_u64() })
}

fn take_bytes(data: &mut Bytes, len: usize, what: &str) -> Result<Bytes> {
    if data.remaining() < len {
        return Err(truncated(what));
    }
    Ok(data.split_to(len))
}

fn truncated(what: &str) -> Error {
    Error::Protocol(format!("truncated artifact frame: missing {what}"))
}

/// Reject archive names that lack [`ARCHIVE_EXTENSION`].
pub fn validate_archive_name(name: &str) -> Result<()> {
    if name.len() <= ARCHIVE_EXTENSION.len() || !name.ends_with(ARCHIVE_EXTENSION) {
        return Err(Error::Precondition(format!(
            "invalid file type {name:?}: the file extension must be {ARCHIVE_EXTENSION}"
        )));
    }
    Ok(())
}

/// Check an export destination before any network call. An existing path
/// must be a writable directory; a missing one must sit under a directory it
/// can be created in. Nothing is created here.
pub fn check_destination(dir: &Path) -> Result<()> {
    let fail = |reason: String| Error::Precondition(format!("{}: {reason}", dir.display()));
    let existing = dir.ancestors().find(|p| !p.as_os_str().is_empty() && p.exists());
    let Some(existing) = existing else {
        // Relative path whose first component is missing: it lands in the cwd.
        return Ok(());
    };
    let meta = std::fs::metadata(existing).map_err(|e| fail(e.to_string()))?;
    if !meta.is_dir() {
        return Err(fail(if existing == dir {
            "not a directory".to_owned()
        } else {
            format!("{} is not a directory", existing.display())
        }));
    }
    if meta.permissions().readonly() {
        return Err(fail("directory is not writable".to_owned()));
    }
    Ok(())
}

/// Validate an import source before any network call.
pub fn check_import_source(path: &Path) -> Result<()> {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    validate_archive_name(&name)?;
    if !path.is_file() {
        return Err(Error::Precondition(format!("{} not found", path.display())));
    }
    Ok(())
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
