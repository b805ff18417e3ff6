// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn archive_round_trips_through_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ConfigStore::open(dir.path().join("store"))?;
    assert!(store.archive(None)?.is_none());

    let path = store.replace_archive(Bytes::from_static(b"PK\x03\x04v1"))?;
    assert_eq!(path, store.root().join(ARCHIVE_NAME));
    store.replace_archive(Bytes::from_static(b"PK\x03\x04v2"))?;

    let archive = store.archive(None)?.unwrap();
    assert_eq!(archive.name, ARCHIVE_NAME);
    assert_eq!(&archive.payload[..], b"PK\x03\x04v2");

    // Only the archive remains; no temp files left behind.
    let entries: Vec<_> = std::fs::read_dir(store.root())?.collect::<Result<_, _>>()?;
    assert_eq!(entries.len(), 1);
    Ok(())
}

#[test]
fn group_archive_is_separate() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ConfigStore::open(dir.path())?;
    store.replace_archive(Bytes::from_static(b"cluster"))?;
    assert!(store.archive(Some("group1"))?.is_none());

    let group_dir = dir.path().join("groups").join("group1");
    std::fs::create_dir_all(&group_dir)?;
    std::fs::write(group_dir.join(ARCHIVE_NAME), b"group1")?;
    assert_eq!(&store.archive(Some("group1"))?.unwrap().payload[..], b"group1");
    Ok(())
}

#[test]
fn bundles_live_under_group() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ConfigStore::open(dir.path())?;
    store.put_bundle("group1", "app.jar", Bytes::from_static(b"jar"))?;

    assert_eq!(std::fs::read(dir.path().join("bundles/group1/app.jar"))?, b"jar");
    assert_eq!(store.bundle("group1", "app.jar")?, Some(Bytes::from_static(b"jar")));
    assert_eq!(store.bundle("group1", "other.jar")?, None);
    Ok(())
}

#[yare::parameterized(
    parent     = { "..", "app.jar" },
    nested     = { "group1", "../../etc/passwd" },
    hidden     = { "group1", ".secret" },
    backslash  = { "a\\b", "app.jar" },
)]
fn escaping_names_are_rejected(group: &str, name: &str) {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::open(dir.path()).unwrap();
    assert!(store.bundle(group, name).is_err());
}
