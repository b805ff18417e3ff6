// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Arc;

use proptest::prelude::*;

use super::*;
use crate::error::ErrorKind;
use crate::test_support::ScriptedPrompter;

fn negotiator(prompter: &Arc<ScriptedPrompter>) -> CredentialNegotiator {
    CredentialNegotiator::new(prompter.clone()).with_default_lookup(|| None)
}

fn write_props(dir: &Path, text: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join("sec.properties");
    std::fs::write(&path, text)?;
    Ok(path)
}

fn opt(s: &Option<String>) -> Option<String> {
    s.clone()
}

proptest! {
    #[test]
    fn validity_matches_presence(id in proptest::option::of("[a-z]{1,8}"), secret in proptest::option::of("[a-z]{1,8}")) {
        let c = Credential::new(opt(&id), opt(&secret));
        prop_assert_eq!(c.is_valid(), id.is_none() == secret.is_none());
    }

    #[test]
    fn blank_halves_count_as_absent(id in "[ \t]{0,3}", secret in proptest::option::of("[a-z]{1,4}")) {
        let c = Credential::new(Some(id), opt(&secret));
        prop_assert!(!c.has_identifier());
        prop_assert_eq!(c.is_valid(), secret.is_none());
    }
}

#[test]
fn debug_redacts_secrets() {
    let c = Credential::new(Some("admin".into()), Some("hunter2".into()));
    let rendered = format!("{c:?}");
    assert!(rendered.contains("admin"));
    assert!(!rendered.contains("hunter2"));

    let ssl = SslParameters {
        keystore: Credential::new(Some("/ks.pem".into()), Some("storepass".into())),
        ..Default::default()
    };
    assert!(!format!("{ssl:?}").contains("storepass"));
}

#[test]
fn complete_credentials_do_not_prompt() -> anyhow::Result<()> {
    let prompter = ScriptedPrompter::new(Vec::<String>::new());
    let sources = CredentialSources {
        user: Credential::new(Some("admin".into()), Some("secret".into())),
        ..Default::default()
    };
    let out = negotiator(&prompter).resolve(&sources)?;
    assert!(out.user.is_complete());
    assert!(!out.ssl_active());
    assert_eq!(prompter.total_prompts(), 0);
    Ok(())
}

#[test]
fn missing_secret_prompts_exactly_once() -> anyhow::Result<()> {
    let prompter = ScriptedPrompter::new(["s3cret"]);
    let sources = CredentialSources {
        user: Credential::new(Some("admin".into()), None),
        ..Default::default()
    };
    let out = negotiator(&prompter).resolve(&sources)?;
    assert_eq!(out.user.secret(), Some("s3cret"));
    assert_eq!(prompter.secret_prompts(), 1);
    assert_eq!(prompter.text_prompts(), 0);
    Ok(())
}

#[test]
fn blank_secret_is_authentication_error() {
    let prompter = ScriptedPrompter::new(["   "]);
    let sources = CredentialSources {
        user: Credential::new(Some("admin".into()), None),
        ..Default::default()
    };
    let err = negotiator(&prompter).resolve(&sources);
    assert!(matches!(err, Err(ref e) if e.kind() == ErrorKind::Authentication), "{err:?}");
    assert_eq!(prompter.secret_prompts(), 1);
}

#[test]
fn exhausted_prompt_aborts() {
    let prompter = ScriptedPrompter::new(Vec::<String>::new());
    let sources = CredentialSources {
        user: Credential::new(Some("admin".into()), None),
        ..Default::default()
    };
    let err = negotiator(&prompter).resolve(&sources);
    assert!(matches!(err, Err(ref e) if e.kind() == ErrorKind::Aborted), "{err:?}");
}

#[test]
fn file_ignored_without_path_or_tls() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_props(dir.path(), "ssl-keystore=/ks.pem\n")?;
    let prompter = ScriptedPrompter::new(Vec::<String>::new());
    let out = negotiator(&prompter)
        .with_default_lookup(move || Some(path.clone()))
        .resolve(&CredentialSources::default())?;
    assert!(out.ssl.is_empty());
    assert!(out.properties_file.is_none());
    Ok(())
}

#[test]
fn flags_override_file_and_suffix_wins_in_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_props(
        dir.path(),
        "ssl-protocols=TLSv1.2\n\
         ssl-keystore=/plain.pem\n\
         ssl-keystore-manager=/manager.pem\n\
         ssl-keystore-password=filepass\n\
         custom-key=kept\n",
    )?;
    let prompter = ScriptedPrompter::new(Vec::<String>::new());
    let sources = CredentialSources {
        protocols: Some("TLSv1.3".into()),
        security_properties: Some(path),
        ..Default::default()
    };
    let out = negotiator(&prompter).resolve(&sources)?;
    assert_eq!(out.ssl.keystore.identifier(), Some("/manager.pem"));
    assert_eq!(out.ssl.keystore.secret(), Some("filepass"));
    assert_eq!(out.ssl.protocols.as_deref(), Some("TLSv1.3"));
    assert_eq!(out.ssl.extra.get("custom-key").map(String::as_str), Some("kept"));
    assert_eq!(prompter.total_prompts(), 0);
    Ok(())
}

#[test]
fn store_password_comes_from_file_before_prompting() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_props(dir.path(), "ssl-truststore-password=trustpass\n")?;
    let prompter = ScriptedPrompter::new(["keypass"]);
    let sources = CredentialSources {
        keystore: Credential::new(Some("/ks.pem".into()), None),
        truststore: Credential::new(Some("/ts.pem".into()), None),
        security_properties: Some(path),
        ..Default::default()
    };
    let out = negotiator(&prompter).resolve(&sources)?;
    assert_eq!(out.ssl.keystore.secret(), Some("keypass"));
    assert_eq!(out.ssl.truststore.secret(), Some("trustpass"));
    assert_eq!(prompter.secret_prompts(), 1);
    Ok(())
}

#[test]
fn tls_without_material_prompts_one_round() -> anyhow::Result<()> {
    let prompter =
        ScriptedPrompter::new(["/ks.pem", "kspass", "/ts.pem", "tspass", "", "TLSv1.3"]);
    let sources = CredentialSources { use_ssl: true, ..Default::default() };
    let out = negotiator(&prompter).resolve(&sources)?;
    assert_eq!(out.ssl.keystore.identifier(), Some("/ks.pem"));
    assert_eq!(out.ssl.truststore.secret(), Some("tspass"));
    assert_eq!(out.ssl.ciphers, None);
    assert_eq!(out.ssl.protocol_list(), vec!["TLSv1.3".to_owned()]);
    assert_eq!(prompter.text_prompts(), 4);
    assert_eq!(prompter.secret_prompts(), 2);
    Ok(())
}

#[test]
fn blank_prompt_round_is_not_repeated() -> anyhow::Result<()> {
    let prompter = ScriptedPrompter::new(["", "", "", ""]);
    let sources = CredentialSources { use_ssl: true, ..Default::default() };
    let out = negotiator(&prompter).resolve(&sources)?;
    assert!(out.ssl.is_empty());
    assert!(out.ssl_active());
    assert_eq!(prompter.total_prompts(), 4);
    Ok(())
}

#[test]
fn quiet_skips_tls_prompt_round() -> anyhow::Result<()> {
    let prompter = ScriptedPrompter::new(Vec::<String>::new());
    let sources = CredentialSources { use_ssl: true, quiet: true, ..Default::default() };
    let out = negotiator(&prompter).resolve(&sources)?;
    assert!(out.ssl.is_empty());
    assert_eq!(prompter.total_prompts(), 0);
    Ok(())
}

#[test]
fn non_interactive_skips_tls_prompt_round() -> anyhow::Result<()> {
    let negotiator =
        CredentialNegotiator::new(Arc::new(crate::prompt::NonInteractive)).with_default_lookup(|| None);
    let sources = CredentialSources { use_ssl: true, ..Default::default() };
    let out = negotiator.resolve(&sources)?;
    assert!(out.ssl.is_empty());
    assert!(out.ssl_active());
    Ok(())
}

#[test]
fn non_interactive_still_aborts_missing_password() {
    let negotiator =
        CredentialNegotiator::new(Arc::new(crate::prompt::NonInteractive)).with_default_lookup(|| None);
    let sources =
        CredentialSources { user: Credential::new(Some("admin".into()), None), ..Default::default() };
    let err = negotiator.resolve(&sources).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Aborted);
}

#[test]
fn default_file_found_when_tls_requested() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_props(dir.path(), "ssl-truststore=/ca.pem\n")?;
    let expected = path.clone();
    let prompter = ScriptedPrompter::new(Vec::<String>::new());
    let sources = CredentialSources { use_ssl: true, ..Default::default() };
    let out = negotiator(&prompter).with_default_lookup(move || Some(path.clone())).resolve(&sources)?;
    assert_eq!(out.ssl.truststore.identifier(), Some("/ca.pem"));
    assert_eq!(out.properties_file, Some(expected));
    assert_eq!(prompter.total_prompts(), 0);
    Ok(())
}

#[test]
fn missing_given_file_is_not_fatal() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let prompter = ScriptedPrompter::new(Vec::<String>::new());
    let sources = CredentialSources {
        security_properties: Some(dir.path().join("absent.properties")),
        ..Default::default()
    };
    let out = negotiator(&prompter).resolve(&sources)?;
    assert!(out.ssl.is_empty());
    assert!(out.properties_file.is_none());
    Ok(())
}

#[test]
fn properties_split_into_typed_fields() {
    let mut map = PropertyMap::new();
    map.insert(SSL_KEYSTORE.into(), "/ks.pem".into());
    map.insert(SSL_KEYSTORE_PASSWORD.into(), "pw".into());
    map.insert(SSL_CIPHERS.into(), "A, B".into());
    map.insert("other".into(), "1".into());
    let ssl = SslParameters::from_properties(map);
    assert_eq!(ssl.cipher_list(), vec!["A".to_owned(), "B".to_owned()]);
    assert_eq!(ssl.keystore, Credential::new(Some("/ks.pem".into()), Some("pw".into())));
    assert_eq!(ssl.extra.get("other").map(String::as_str), Some("1"));
    assert!(!ssl.extra.contains_key(SSL_CIPHERS));
}
