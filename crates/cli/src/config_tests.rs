// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use super::{Cli, Command, ConnectArgs};
use crate::connect::TlsDowngradePolicy;
use crate::endpoint::ConnectionEndpoint;

fn parse(args: &[&str]) -> Cli {
    Cli::parse_from(args)
}

#[test]
fn connect_via_locator() -> anyhow::Result<()> {
    let cli = parse(&["locus", "connect", "--locator", "locator1[10335]", "--user", "admin"]);
    cli.validate()?;
    let request = cli.connect_args().request()?;
    assert_eq!(request.locator, Some(ConnectionEndpoint::new("locator1", 10335)));
    assert!(request.manager.is_none());
    assert_eq!(request.sources.user.identifier(), Some("admin"));
    assert!(request.sources.user.needs_secret());
    Ok(())
}

#[test]
fn no_endpoint_leaves_both_unset() -> anyhow::Result<()> {
    let cli = parse(&["locus", "connect"]);
    cli.validate()?;
    let request = cli.connect_args().request()?;
    assert!(request.locator.is_none());
    assert!(request.manager.is_none());
    Ok(())
}

#[yare::parameterized(
    bare_locator  = { "--locator", "locator1", 10334 },
    bare_manager  = { "--manager", "node2", 1099 },
    colon_manager = { "--manager", "node2:41000", 41000 },
)]
fn endpoint_default_ports(flag: &str, value: &str, expected_port: u16) {
    let cli = parse(&["locus", "connect", flag, value]);
    let request = cli.connect_args().request().unwrap();
    let endpoint = request.locator.or(request.manager).unwrap();
    assert_eq!(endpoint.port(), expected_port);
}

#[yare::parameterized(
    both_endpoints   = { &["locus", "connect", "--locator", "a", "--manager", "b"], "both --locator and --manager" },
    password_no_user = { &["locus", "connect", "--password", "secret"], "--password requires --user" },
    bad_port         = { &["locus", "connect", "--locator", "a[0]"], "bad port" },
    bad_policy       = { &["locus", "connect", "--tls-downgrade", "maybe"], "invalid TLS downgrade policy" },
    bad_log_format   = { &["locus", "connect", "--log-format", "xml"], "invalid log format" },
    blank_bundle     = { &["locus", "fetch-bundle", "--group", " ", "--name", "app.jar"], "must not be empty" },
)]
fn invalid_config(args: &[&str], expected_substr: &str) {
    let cli = parse(args);
    crate::assert_err_contains!(cli.validate(), expected_substr);
}

#[test]
fn tls_flags_flow_into_sources() -> anyhow::Result<()> {
    let cli = parse(&[
        "locus",
        "connect",
        "--use-ssl",
        "--trust-store",
        "/etc/ca.pem",
        "--trust-store-password",
        "changeit",
        "--protocols",
        "TLSv1.3",
        "--security-properties-file",
        "/etc/locus.properties",
        "--tls-downgrade",
        "deny",
    ]);
    cli.validate()?;
    let args = cli.connect_args();
    let sources = args.request()?.sources;
    assert!(sources.use_ssl);
    assert!(sources.truststore.is_complete());
    assert_eq!(sources.protocols.as_deref(), Some("TLSv1.3"));
    assert_eq!(sources.security_properties, Some("/etc/locus.properties".into()));
    assert_eq!(args.settings()?.tls_downgrade, TlsDowngradePolicy::Deny);
    Ok(())
}

#[test]
fn subcommands_share_connect_flags() -> anyhow::Result<()> {
    let cli = parse(&[
        "locus",
        "export-shared-config",
        "--manager",
        "node2[41000]",
        "--file",
        "cluster-config.zip",
        "--dir",
        "/tmp/out",
    ]);
    cli.validate()?;
    assert_eq!(cli.connect_args().manager.as_deref(), Some("node2[41000]"));
    let Command::ExportSharedConfig(cmd) = &cli.command else {
        anyhow::bail!("expected export command");
    };
    assert_eq!(cmd.file, "cluster-config.zip");
    assert_eq!(cmd.dir, PathBuf::from("/tmp/out"));

    let cli = parse(&["locus", "import-shared-config", "--zip", "c.zip", "--locator", "l1"]);
    cli.validate()?;
    assert!(matches!(cli.command, Command::ImportSharedConfig(_)));
    Ok(())
}

#[test]
fn output_directory_defaults_to_working_directory() -> anyhow::Result<()> {
    let cli = parse(&["locus", "export-shared-config", "--locator", "l1", "--file", "c.zip"]);
    let Command::ExportSharedConfig(cmd) = &cli.command else {
        anyhow::bail!("expected export command");
    };
    assert_eq!(cmd.dir, PathBuf::from("."));

    let cli = parse(&["locus", "fetch-bundle", "--locator", "l1", "--group", "g", "--name", "a.jar"]);
    let Command::FetchBundle(cmd) = &cli.command else {
        anyhow::bail!("expected fetch-bundle command");
    };
    assert_eq!(cmd.dir, PathBuf::from("."));
    Ok(())
}

#[test]
fn duration_field_override_wins() {
    let args = ConnectArgs { connect_timeout_ms: Some(250), ..Default::default() };
    assert_eq!(args.connect_timeout(), Duration::from_millis(250));
}

#[test]
#[serial_test::serial]
fn duration_env_then_default() {
    let args = ConnectArgs::default();

    std::env::set_var("LOCUS_FANOUT_TIMEOUT_MS", "1500");
    assert_eq!(args.fanout_timeout(), Duration::from_millis(1500));

    std::env::set_var("LOCUS_FANOUT_TIMEOUT_MS", "soon");
    assert_eq!(args.fanout_timeout(), Duration::from_millis(60_000));

    std::env::remove_var("LOCUS_FANOUT_TIMEOUT_MS");
    assert_eq!(args.fanout_timeout(), Duration::from_millis(60_000));
}
