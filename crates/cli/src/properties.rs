// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Security properties files: plain `key=value` text.
//!
//! A key ending in [`MANAGER_SUFFIX`] applies only to the management
//! connection and overrides the unsuffixed key with the same base name;
//! the plain entry is dropped from the resulting map.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::Error;

/// Suffix marking a property as specific to the management connection.
pub const MANAGER_SUFFIX: &str = "-manager";

/// File name looked up when TLS is requested without an explicit file.
pub const DEFAULT_SECURITY_FILE: &str = "locus-security.properties";

/// Insertion-ordered property map.
pub type PropertyMap = IndexMap<String, String>;

/// Parse properties text into an ordered map. Later duplicates win.
pub fn parse(text: &str) -> Result<PropertyMap, String> {
    let mut map = PropertyMap::new();
    let mut lines = text.lines().enumerate();

    while let Some((idx, line)) = lines.next() {
        let mut logical = line.trim_start().to_owned();
        if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
            continue;
        }
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = match logical.find(['=', ':']) {
            Some(pos) => (&logical[..pos], &logical[pos + 1..]),
            None => (logical.as_str(), ""),
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("line {}: missing key", idx + 1));
        }
        map.insert(key.to_owned(), value.trim().to_owned());
    }
    Ok(map)
}

/// An odd number of trailing backslashes continues the line.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Apply manager-specific precedence: suffixed entries win over, and
/// replace, the plain entry sharing their base name.
pub fn prefer_manager_specific(raw: PropertyMap) -> PropertyMap {
    let specific: HashSet<String> = raw
        .keys()
        .filter_map(|k| k.strip_suffix(MANAGER_SUFFIX))
        .filter(|base| !base.is_empty())
        .map(str::to_owned)
        .collect();

    let mut out = PropertyMap::with_capacity(raw.len());
    for (key, value) in raw {
        match key.strip_suffix(MANAGER_SUFFIX).filter(|base| !base.is_empty()) {
            Some(base) => {
                out.insert(base.to_owned(), value);
            }
            None if specific.contains(&key) => {}
            None => {
                out.insert(key, value);
            }
        }
    }
    out
}

/// Read and parse a properties file, applying manager-specific precedence.
pub fn load(path: &Path) -> Result<PropertyMap, Error> {
    let config_err =
        |reason: String| Error::ConfigSource { path: path.display().to_string(), reason };

    let bytes = std::fs::read(path).map_err(|e| config_err(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| config_err("not valid UTF-8".to_owned()))?;
    let raw = parse(&text).map_err(config_err)?;
    Ok(prefer_manager_specific(raw))
}

/// Like [`load`], but a bad or unreadable file yields an empty map.
pub fn load_or_empty(path: &Path) -> PropertyMap {
    match load(path) {
        Ok(map) => {
            debug!(path = %path.display(), entries = map.len(), "loaded security properties");
            map
        }
        Err(e) => {
            warn!(err = %e, "ignoring security properties file");
            PropertyMap::new()
        }
    }
}

/// Find [`DEFAULT_SECURITY_FILE`] in the working directory, then in `home`.
pub fn locate_default(cwd: Option<&Path>, home: Option<&Path>) -> Option<PathBuf> {
    [cwd, home]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(DEFAULT_SECURITY_FILE))
        .find(|candidate| candidate.is_file())
}

/// [`locate_default`] against the process working directory and `$HOME`.
pub fn locate_default_from_env() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok();
    let home = std::env::var_os("HOME").map(PathBuf::from);
    locate_default(cwd.as_deref(), home.as_deref())
}

#[cfg(test)]
#[path = "properties_tests.rs"]
mod tests;
