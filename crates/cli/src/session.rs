// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The established management session and the slot that holds it.
//!
//! A client holds at most one session. The slot swaps whole `Arc`s under a
//! lock, so readers see either the old session or the new one.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::endpoint::ConnectionEndpoint;
use crate::transport::{ManagerIndex, MembershipView, OpenedSession, SharedConfigRpc};

/// A fully established management session.
pub struct SessionHandle {
    id: Uuid,
    endpoint: ConnectionEndpoint,
    tls: bool,
    tls_downgraded: bool,
    user: Option<String>,
    index: ManagerIndex,
    membership: Arc<dyn MembershipView>,
    shared_config: Arc<dyn SharedConfigRpc>,
}

impl SessionHandle {
    pub fn new(
        endpoint: ConnectionEndpoint,
        tls: bool,
        tls_downgraded: bool,
        user: Option<String>,
        opened: OpenedSession,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint,
            tls,
            tls_downgraded,
            user,
            index: opened.index,
            membership: opened.membership,
            shared_config: opened.shared_config,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn endpoint(&self) -> &ConnectionEndpoint {
        &self.endpoint
    }

    pub fn membership(&self) -> &Arc<dyn MembershipView> {
        &self.membership
    }

    pub fn shared_config(&self) -> &Arc<dyn SharedConfigRpc> {
        &self.shared_config
    }

    pub fn description(&self) -> SessionDescription {
        SessionDescription {
            id: self.id.to_string(),
            endpoint: self.endpoint.to_string(),
            member: self.index.member.clone(),
            version: self.index.version.clone(),
            tls: self.tls,
            tls_downgraded: self.tls_downgraded,
            user: self.user.clone(),
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("tls", &self.tls)
            .field("member", &self.index.member)
            .finish_non_exhaustive()
    }
}

/// Printable summary of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionDescription {
    pub id: String,
    pub endpoint: String,
    pub member: String,
    pub version: String,
    pub tls: bool,
    pub tls_downgraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connected to {} at {}", self.member, self.endpoint)?;
        if self.tls {
            f.write_str(" over TLS")?;
        } else if self.tls_downgraded {
            f.write_str(" without TLS (manager does not support it)")?;
        }
        Ok(())
    }
}

/// Holder of the single active session.
#[derive(Default)]
pub struct SessionSlot {
    current: RwLock<Option<Arc<SessionHandle>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<SessionHandle>> {
        self.current.read().clone()
    }

    pub fn is_established(&self) -> bool {
        self.current.read().is_some()
    }

    /// Install `next`, returning the session it superseded.
    pub fn replace(&self, next: Arc<SessionHandle>) -> Option<Arc<SessionHandle>> {
        self.current.write().replace(next)
    }

    pub fn clear(&self) -> Option<Arc<SessionHandle>> {
        self.current.write().take()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
