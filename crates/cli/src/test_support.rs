// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: scripted collaborators, call-count spies,
//! and assertion helpers.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::artifact::ConfigArtifact;
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::prompt::Prompter;
use crate::transport::{
    DirectoryRpc, DiscoveryRequest, DiscoveryResponse, ManagerIndex, MembershipView, OpenRequest,
    OpenedSession, OperationOutcome, RpcFuture, SessionRpc, SharedConfigLocator, SharedConfigRpc,
};

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

// -- Prompting ----------------------------------------------------------------

/// Answers prompts from a fixed script; running out aborts.
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    labels: Mutex<Vec<String>>,
    text_prompts: AtomicU32,
    secret_prompts: AtomicU32,
}

impl ScriptedPrompter {
    pub fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            labels: Mutex::new(Vec::new()),
            text_prompts: AtomicU32::new(0),
            secret_prompts: AtomicU32::new(0),
        })
    }

    pub fn text_prompts(&self) -> u32 {
        self.text_prompts.load(Ordering::SeqCst)
    }

    pub fn secret_prompts(&self) -> u32 {
        self.secret_prompts.load(Ordering::SeqCst)
    }

    pub fn total_prompts(&self) -> u32 {
        self.text_prompts() + self.secret_prompts()
    }

    /// Labels asked so far, in order.
    pub fn labels(&self) -> Vec<String> {
        self.labels.lock().clone()
    }

    fn next(&self, label: &str) -> Result<String> {
        self.labels.lock().push(label.to_owned());
        self.answers
            .lock()
            .pop_front()
            .ok_or_else(|| Error::Aborted(format!("{label}: script exhausted")))
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt_text(&self, label: &str) -> Result<String> {
        self.text_prompts.fetch_add(1, Ordering::SeqCst);
        self.next(label)
    }

    fn prompt_secret(&self, label: &str) -> Result<String> {
        self.secret_prompts.fetch_add(1, Ordering::SeqCst);
        self.next(label)
    }
}

// -- Discovery ----------------------------------------------------------------

type DiscoverFn = dyn Fn(&DiscoveryRequest) -> Result<DiscoveryResponse> + Send + Sync;

/// Locator double that answers every discovery request the same way.
pub struct MockDirectory {
    answer: Box<DiscoverFn>,
    calls: AtomicU32,
    last: Mutex<Option<DiscoveryRequest>>,
}

impl MockDirectory {
    pub fn new(
        answer: impl Fn(&DiscoveryRequest) -> Result<DiscoveryResponse> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self { answer: Box::new(answer), calls: AtomicU32::new(0), last: Mutex::new(None) })
    }

    /// Always report `host[port]` with the given TLS posture.
    pub fn manager(host: &str, port: u16, tls: bool) -> Arc<Self> {
        let response = DiscoveryResponse {
            manager_host: host.to_owned(),
            manager_port: port,
            manager_tls_enabled: tls,
            failure_cause: None,
        };
        Self::new(move |_| Ok(response.clone()))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<DiscoveryRequest> {
        self.last.lock().clone()
    }
}

impl DirectoryRpc for MockDirectory {
    fn discover(
        &self,
        request: DiscoveryRequest,
        _ssl: crate::credential::SslParameters,
    ) -> RpcFuture<'_, DiscoveryResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = (self.answer)(&request);
        *self.last.lock() = Some(request);
        Box::pin(async move { answer })
    }
}

// -- Membership ---------------------------------------------------------------

/// Membership view backed by mutable in-memory lists.
pub struct StaticMembership {
    locators: Mutex<Vec<SharedConfigLocator>>,
    members: Mutex<Vec<String>>,
    reads: AtomicU32,
}

impl StaticMembership {
    pub fn new(locator_ids: &[&str], members: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            locators: Mutex::new(locator_ids.iter().map(|id| mock_locator(id)).collect()),
            members: Mutex::new(members.iter().map(|m| m.to_string()).collect()),
            reads: AtomicU32::new(0),
        })
    }

    pub fn set_members(&self, members: &[&str]) {
        *self.members.lock() = members.iter().map(|m| m.to_string()).collect();
    }

    pub fn set_locators(&self, locator_ids: &[&str]) {
        *self.locators.lock() = locator_ids.iter().map(|id| mock_locator(id)).collect();
    }

    pub fn mark_unreachable(&self, locator_id: &str) {
        for locator in self.locators.lock().iter_mut().filter(|l| l.id == locator_id) {
            locator.reachable = false;
        }
    }

    /// Number of times either list was read.
    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }
}

pub fn mock_locator(id: &str) -> SharedConfigLocator {
    SharedConfigLocator { id: id.to_owned(), url: format!("http://{id}.invalid"), reachable: true }
}

impl MembershipView for StaticMembership {
    fn shared_config_locators(&self) -> RpcFuture<'_, Vec<SharedConfigLocator>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let locators = self.locators.lock().clone();
        Box::pin(async move { Ok(locators) })
    }

    fn connected_members(&self) -> RpcFuture<'_, Vec<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let members = self.members.lock().clone();
        Box::pin(async move { Ok(members) })
    }
}

// -- Shared configuration ------------------------------------------------------

/// What one scripted candidate does when called.
#[derive(Debug, Clone)]
pub enum CandidateScript {
    Succeed { artifact: Option<ConfigArtifact>, message: String },
    /// Answer with an unsuccessful outcome.
    Fail(String),
    /// Fail at the transport level.
    Error(String),
    /// Never answer.
    Hang,
}

impl CandidateScript {
    pub fn artifact(name: &str, payload: &[u8]) -> Self {
        Self::Succeed {
            artifact: Some(ConfigArtifact::new(name, payload.to_vec())),
            message: format!("sent {name}"),
        }
    }

    pub fn ok(message: &str) -> Self {
        Self::Succeed { artifact: None, message: message.to_owned() }
    }
}

/// Per-locator scripted shared-configuration RPCs with call-count spies.
#[derive(Default)]
pub struct MockSharedConfig {
    scripts: Mutex<HashMap<String, (Duration, CandidateScript)>>,
    exports: AtomicU32,
    imports: AtomicU32,
    fetches: AtomicU32,
    imported: Mutex<Vec<(String, ConfigArtifact)>>,
    export_groups: Mutex<Vec<Option<String>>>,
}

impl MockSharedConfig {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(self: &Arc<Self>, locator: &str, script: CandidateScript) -> Arc<Self> {
        self.on_after(locator, Duration::ZERO, script)
    }

    /// Script `locator` to act after `delay`.
    pub fn on_after(
        self: &Arc<Self>,
        locator: &str,
        delay: Duration,
        script: CandidateScript,
    ) -> Arc<Self> {
        self.scripts.lock().insert(locator.to_owned(), (delay, script));
        Arc::clone(self)
    }

    pub fn export_calls(&self) -> u32 {
        self.exports.load(Ordering::SeqCst)
    }

    pub fn import_calls(&self) -> u32 {
        self.imports.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> u32 {
        self.export_calls() + self.import_calls() + self.fetch_calls()
    }

    /// Artifacts received by import, with the locator that received them.
    pub fn imported(&self) -> Vec<(String, ConfigArtifact)> {
        self.imported.lock().clone()
    }

    pub fn export_groups(&self) -> Vec<Option<String>> {
        self.export_groups.lock().clone()
    }

    fn play(&self, locator: &SharedConfigLocator) -> RpcFuture<'static, OperationOutcome> {
        let scripted = self.scripts.lock().get(&locator.id).cloned();
        let id = locator.id.clone();
        Box::pin(async move {
            let Some((delay, script)) = scripted else {
                return Ok(OperationOutcome::failed(format!("{id}: unscripted")));
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match script {
                CandidateScript::Succeed { artifact, message } => {
                    Ok(OperationOutcome::succeeded(artifact, message))
                }
                CandidateScript::Fail(message) => Ok(OperationOutcome::failed(message)),
                CandidateScript::Error(message) => Err(Error::Connectivity(message)),
                CandidateScript::Hang => {
                    std::future::pending::<()>().await;
                    Ok(OperationOutcome::failed("unreachable"))
                }
            }
        })
    }
}

impl SharedConfigRpc for MockSharedConfig {
    fn export<'a>(
        &'a self,
        locator: &'a SharedConfigLocator,
        group: Option<&'a str>,
    ) -> RpcFuture<'a, OperationOutcome> {
        self.exports.fetch_add(1, Ordering::SeqCst);
        self.export_groups.lock().push(group.map(str::to_owned));
        self.play(locator)
    }

    fn import<'a>(
        &'a self,
        locator: &'a SharedConfigLocator,
        artifact: &'a ConfigArtifact,
    ) -> RpcFuture<'a, OperationOutcome> {
        self.imports.fetch_add(1, Ordering::SeqCst);
        self.imported.lock().push((locator.id.clone(), artifact.clone()));
        self.play(locator)
    }

    fn fetch_bundle<'a>(
        &'a self,
        locator: &'a SharedConfigLocator,
        _group: &'a str,
        _name: &'a str,
    ) -> RpcFuture<'a, OperationOutcome> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.play(locator)
    }
}

// -- Session ------------------------------------------------------------------

type OpenFn = dyn Fn(&OpenRequest) -> Result<()> + Send + Sync;

/// Management endpoint double. Records every open attempt.
pub struct MockSessionRpc {
    check: Box<OpenFn>,
    requests: Mutex<Vec<OpenRequest>>,
    membership: Arc<StaticMembership>,
    shared_config: Arc<MockSharedConfig>,
}

impl MockSessionRpc {
    pub fn new(check: impl Fn(&OpenRequest) -> Result<()> + Send + Sync + 'static) -> Self {
        Self {
            check: Box::new(check),
            requests: Mutex::new(Vec::new()),
            membership: StaticMembership::new(&[], &[]),
            shared_config: MockSharedConfig::new(),
        }
    }

    /// Accept any open.
    pub fn accepting() -> Self {
        Self::new(|_| Ok(()))
    }

    /// Accept only the given identifier/secret; anything else is an
    /// authentication failure.
    pub fn requiring(identifier: &str, secret: &str) -> Self {
        let expected = Credential::new(Some(identifier.to_owned()), Some(secret.to_owned()));
        Self::new(move |req| {
            if req.user == expected {
                Ok(())
            } else {
                Err(Error::Authentication("invalid username or password".to_owned()))
            }
        })
    }

    /// Reject every open with an authentication failure.
    pub fn rejecting() -> Self {
        Self::new(|_| Err(Error::Authentication("authentication required".to_owned())))
    }

    pub fn with_membership(mut self, membership: Arc<StaticMembership>) -> Self {
        self.membership = membership;
        self
    }

    pub fn with_shared_config(mut self, shared_config: Arc<MockSharedConfig>) -> Self {
        self.shared_config = shared_config;
        self
    }

    pub fn open_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<OpenRequest> {
        self.requests.lock().clone()
    }
}

impl SessionRpc for MockSessionRpc {
    fn open(&self, request: OpenRequest) -> RpcFuture<'_, OpenedSession> {
        let outcome = (self.check)(&request);
        let index = ManagerIndex {
            member: format!("manager@{}", request.endpoint),
            version: "test".to_owned(),
            cluster: None,
        };
        self.requests.lock().push(request);
        let opened = outcome.map(|()| OpenedSession {
            index,
            membership: self.membership.clone(),
            shared_config: self.shared_config.clone(),
        });
        Box::pin(async move { opened })
    }
}
