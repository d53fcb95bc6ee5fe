//! Per-request security context.
//!
//! The context travels in the request's extensions: one instance per
//! request, created empty by the authentication middleware, set at most once
//! on successful validation, read by downstream authorization checks, and
//! dropped with the request. There is no process-global "current user".

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use crate::store::AccountStatus;
use crate::token::Claims;
use crate::types::{Authority, Subject};

/// The authenticated caller bound to the current request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub subject: Subject,
    pub authorities: HashSet<Authority>,
    pub status: AccountStatus,
    pub claims: Claims,
}

/// Request-scoped holder of "who is the caller, what can they do".
///
/// Cloning shares the same underlying slot, so the middleware and the
/// handlers of one request observe the same state; contexts of different
/// requests share nothing.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    slot: Arc<OnceLock<AuthenticatedUser>>,
}

impl SecurityContext {
    /// An empty (anonymous) context.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bind the authenticated caller. A no-op when already set.
    pub fn set(&self, user: AuthenticatedUser) {
        let _ = self.slot.set(user);
    }

    /// The authenticated caller, or `None` for anonymous requests.
    pub fn get(&self) -> Option<&AuthenticatedUser> {
        self.slot.get()
    }

    /// The caller's subject, when authenticated.
    pub fn subject(&self) -> Option<&Subject> {
        self.get().map(|u| &u.subject)
    }

    /// Whether a caller has been bound.
    pub fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }

    /// Whether the caller holds the given authority. Anonymous callers hold
    /// none.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.get()
            .map(|u| u.authorities.contains(authority))
            .unwrap_or(false)
    }
}
