// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    brackets = { "node1[10334]", "node1", 10334 },
    colon = { "10.0.0.7:41000", "10.0.0.7", 41000 },
    bare_host = { "locator.local", "locator.local", DEFAULT_LOCATOR_PORT },
    padded = { "  node2[41000] ", "node2", 41000 },
    bare_ipv6 = { "fe80::1", "fe80::1", DEFAULT_LOCATOR_PORT },
    ipv6_brackets = { "fe80::1[41000]", "fe80::1", 41000 },
    ipv6_url_form = { "[::1]:41000", "::1", 41000 },
    ipv6_url_no_port = { "[::1]", "::1", DEFAULT_LOCATOR_PORT },
)]
fn parses(input: &str, host: &str, port: u16) {
    let parsed = input.parse::<ConnectionEndpoint>();
    assert!(
        matches!(parsed, Ok(ref ep) if ep.host() == host && ep.port() == port),
        "{input:?} parsed as {parsed:?}"
    );
}

#[yare::parameterized(
    empty = { "" },
    zero_port = { "node1[0]" },
    unterminated = { "node1[10334" },
    no_host = { "[10334]" },
    bad_port = { "node1:http" },
    ipv6_unclosed = { "[::1:41000" },
    ipv6_junk_tail = { "[::1]41000" },
)]
fn rejects(input: &str) {
    assert!(input.parse::<ConnectionEndpoint>().is_err());
}

#[test]
fn display_uses_bracket_form() {
    let ep = ConnectionEndpoint::new("node2", 41000);
    assert_eq!(ep.to_string(), "node2[41000]");
}

#[test]
fn base_url_follows_tls() {
    let ep = ConnectionEndpoint::new("node2", 41000);
    assert_eq!(ep.base_url(false), "http://node2:41000");
    assert_eq!(ep.base_url(true), "https://node2:41000");
}

#[test]
fn base_url_brackets_ipv6() {
    let ep = ConnectionEndpoint::new("fe80::1", 41000);
    assert_eq!(ep.base_url(false), "http://[fe80::1]:41000");
}
