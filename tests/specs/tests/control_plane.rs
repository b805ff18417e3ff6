// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios: discovery, authentication, and shared
//! configuration fan-out against real in-process locators.

use std::time::Duration;

use bytes::Bytes;

use locus::connect::{ConnectRequest, ConnectState};
use locus::credential::Credential;
use locus::error::ErrorKind;
use locus::test_support::ScriptedPrompter;
use locus_specs::{free_port, http_client, TestLocator};

const FANOUT: Duration = Duration::from_secs(3);

fn via(locator: &TestLocator) -> ConnectRequest {
    ConnectRequest { locator: Some(locator.endpoint()), ..Default::default() }
}

fn secured(c: &mut locus_locator::config::LocatorConfig) {
    c.self_manager = true;
    c.username = Some("admin".into());
    c.password = Some("secret".into());
}

#[tokio::test]
async fn connect_through_locator_discovery() -> anyhow::Result<()> {
    let l1 = TestLocator::start("L1", |c| c.self_manager = true).await?;
    let prompter = ScriptedPrompter::new(Vec::<String>::new());
    let client = http_client(prompter.clone(), FANOUT);

    let (description, report) = client.connect(&via(&l1)).await?;

    assert_eq!(description.member, "L1");
    assert_eq!(description.endpoint, l1.endpoint().to_string());
    assert!(!description.tls);
    assert_eq!(report.transitions.last(), Some(&ConnectState::Established));
    assert_eq!(report.auth_retries, 0);
    assert_eq!(prompter.total_prompts(), 0);
    Ok(())
}

#[tokio::test]
async fn missing_manager_is_a_discovery_failure() -> anyhow::Result<()> {
    let l1 = TestLocator::start("L1", |_| {}).await?;
    let client = http_client(ScriptedPrompter::new(Vec::<String>::new()), FANOUT);

    let err = match client.connect(&via(&l1)).await {
        Ok(_) => anyhow::bail!("connect should fail without a manager"),
        Err(e) => e,
    };
    assert_eq!(err.kind(), ErrorKind::Discovery);
    assert!(err.to_string().contains("no management endpoint is configured"));
    assert!(client.session().is_none());
    Ok(())
}

#[tokio::test]
async fn anonymous_connect_prompts_once_then_succeeds() -> anyhow::Result<()> {
    let l1 = TestLocator::start("L1", secured).await?;
    let prompter = ScriptedPrompter::new(["admin", "secret"]);
    let client = http_client(prompter.clone(), FANOUT);

    let (_, report) = client.connect(&via(&l1)).await?;

    assert_eq!(report.auth_retries, 1);
    assert_eq!(prompter.labels(), ["username", "password"]);
    Ok(())
}

#[tokio::test]
async fn supplied_identity_is_never_reprompted() -> anyhow::Result<()> {
    let l1 = TestLocator::start("L1", secured).await?;
    let prompter = ScriptedPrompter::new(Vec::<String>::new());
    let client = http_client(prompter.clone(), FANOUT);
    let mut request = via(&l1);
    request.sources.user = Credential::new(Some("admin".into()), Some("wrong".into()));

    let err = match client.connect(&request).await {
        Ok(_) => anyhow::bail!("connect should fail"),
        Err(e) => e,
    };
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(prompter.total_prompts(), 0);
    Ok(())
}

#[tokio::test]
async fn unreachable_manager_names_endpoint() -> anyhow::Result<()> {
    let port = free_port()?;
    let client = http_client(ScriptedPrompter::new(Vec::<String>::new()), FANOUT);
    let request = ConnectRequest {
        manager: Some(locus::endpoint::ConnectionEndpoint::new("127.0.0.1", port)),
        ..Default::default()
    };

    let err = match client.connect(&request).await {
        Ok(_) => anyhow::bail!("connect should fail"),
        Err(e) => e,
    };
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert!(err.to_string().contains(&format!("127.0.0.1[{port}]")));
    Ok(())
}

#[tokio::test]
async fn import_reaches_every_locator_and_export_reads_it_back() -> anyhow::Result<()> {
    let l2 = TestLocator::start("L2", |_| {}).await?;
    let l1 = TestLocator::start("L1", |c| {
        c.self_manager = true;
        c.peers = vec![l2.as_peer()];
    })
    .await?;
    let client = http_client(ScriptedPrompter::new(Vec::<String>::new()), FANOUT);
    client.connect(&via(&l1)).await?;

    let dir = tempfile::tempdir()?;
    let payload = [0x50, 0x4b, 0x03, 0x04, 0x14, 0x00, 0xff, 0x00];
    let source = dir.path().join("cluster-config.zip");
    std::fs::write(&source, payload)?;

    let imported = client.shared_config()?.import(&source).await?;
    assert!(imported.message.contains(&format!("imported by {}", imported.locator)));

    // The remaining candidate may have been abandoned once a winner answered.
    let winner = if imported.locator == "L1" { &l1 } else { &l2 };
    let stored = winner.state().store.archive(None)?.map(|a| a.payload);
    assert_eq!(stored.as_deref(), Some(&payload[..]));

    let out = dir.path().join("exported");
    let retrieved =
        client.shared_config()?.export("cluster-config.zip", Some(&out), None).await?;
    assert_eq!(&retrieved.artifact.payload[..], &payload);
    assert_eq!(std::fs::read(out.join("cluster-config.zip"))?, payload);
    Ok(())
}

#[tokio::test]
async fn import_refused_while_members_run() -> anyhow::Result<()> {
    let l1 = TestLocator::start("L1", |c| {
        c.self_manager = true;
        c.connected_members = vec!["server-1".into()];
    })
    .await?;
    let client = http_client(ScriptedPrompter::new(Vec::<String>::new()), FANOUT);
    client.connect(&via(&l1)).await?;

    let dir = tempfile::tempdir()?;
    let source = dir.path().join("c.zip");
    std::fs::write(&source, b"PK")?;

    let err = match client.shared_config()?.import(&source).await {
        Ok(_) => anyhow::bail!("import should be refused"),
        Err(e) => e,
    };
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert!(l1.state().store.archive(None)?.is_none());
    Ok(())
}

#[tokio::test]
async fn export_survives_a_dead_peer() -> anyhow::Result<()> {
    let dead = format!("L2=http://127.0.0.1:{}", free_port()?);
    let l1 = TestLocator::start("L1", |c| {
        c.self_manager = true;
        c.peers = vec![dead];
    })
    .await?;
    l1.state().store.replace_archive(Bytes::from_static(b"PK-live"))?;
    let client = http_client(ScriptedPrompter::new(Vec::<String>::new()), FANOUT);
    client.connect(&via(&l1)).await?;

    let retrieved = client.shared_config()?.export("c.zip", None, None).await?;
    assert_eq!(retrieved.locator, "L1");
    assert_eq!(&retrieved.artifact.payload[..], b"PK-live");
    Ok(())
}

#[tokio::test]
async fn export_with_nothing_stored_fails_with_candidate_reasons() -> anyhow::Result<()> {
    let l1 = TestLocator::start("L1", |c| c.self_manager = true).await?;
    let client = http_client(ScriptedPrompter::new(Vec::<String>::new()), FANOUT);
    client.connect(&via(&l1)).await?;

    let err = match client.shared_config()?.export("c.zip", None, None).await {
        Ok(_) => anyhow::bail!("export should fail"),
        Err(e) => e,
    };
    assert_eq!(err.kind(), ErrorKind::NoCandidateSucceeded);
    let failures = err.candidate_failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].reason.contains("no cluster configuration stored"));
    Ok(())
}

#[tokio::test]
async fn bundle_fetch_with_credentials() -> anyhow::Result<()> {
    let l1 = TestLocator::start("L1", secured).await?;
    l1.state().store.put_bundle("group1", "app.jar", Bytes::from_static(b"jar-bytes"))?;
    let client = http_client(ScriptedPrompter::new(Vec::<String>::new()), FANOUT);
    let mut request = via(&l1);
    request.sources.user = Credential::new(Some("admin".into()), Some("secret".into()));
    client.connect(&request).await?;

    let dir = tempfile::tempdir()?;
    let retrieved = client.shared_config()?.fetch_bundle("group1", "app.jar", Some(dir.path())).await?;
    assert_eq!(std::fs::read(dir.path().join("app.jar"))?, b"jar-bytes");
    assert_eq!(retrieved.locator, "L1");

    let err = match client.shared_config()?.fetch_bundle("group1", "nope.jar", None).await {
        Ok(_) => anyhow::bail!("missing bundle should fail"),
        Err(e) => e,
    };
    assert!(err.candidate_failures()[0].reason.contains("not found"));
    Ok(())
}
