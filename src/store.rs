//! Identity storage.
//!
//! Persistence of user records is an external collaborator; the core talks to
//! it through the narrow [`IdentityStore`] trait. The in-memory
//! implementation backs the bundled server and the test suite.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::types::{Authority, PasswordHash, Subject, UserId};

/// Account-status flags checked during token validation.
///
/// A token is only accepted when every flag is in its permissive state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountStatus {
    pub enabled: bool,
    pub account_non_expired: bool,
    pub account_non_locked: bool,
    pub credentials_non_expired: bool,
}

impl AccountStatus {
    /// A fully usable account; registration sets every flag this way.
    pub fn active() -> Self {
        Self {
            enabled: true,
            account_non_expired: true,
            account_non_locked: true,
            credentials_non_expired: true,
        }
    }

    /// Whether every flag permits authentication.
    pub fn is_usable(&self) -> bool {
        self.enabled
            && self.account_non_expired
            && self.account_non_locked
            && self.credentials_non_expired
    }
}

impl Default for AccountStatus {
    fn default() -> Self {
        Self::active()
    }
}

/// A stored user: credential record plus identity attributes.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: UserId,
    pub username: Subject,
    pub password_hash: PasswordHash,
    pub authorities: HashSet<Authority>,
    pub status: AccountStatus,
}

/// Fields for creating a user; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Subject,
    pub password_hash: PasswordHash,
    pub authorities: HashSet<Authority>,
    pub status: AccountStatus,
}

/// Resolve-by-subject repository abstraction.
///
/// Errors from these methods signal infrastructure failure and classify as
/// `Unavailable` at the request layer, never as a credential failure.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up a user by username.
    async fn find_by_subject(&self, subject: &str) -> Result<Option<UserRecord>>;

    /// Look up a user by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>>;

    /// Look up every user whose id appears in `ids`. Missing ids are
    /// silently absent from the result; the caller decides what an empty
    /// result means.
    async fn find_all_by_ids(&self, ids: &HashSet<UserId>) -> Result<Vec<UserRecord>>;

    /// Insert a new user, assigning an id. Fails when the username is taken.
    async fn insert(&self, user: NewUser) -> Result<UserRecord>;

    /// Replace an existing record, keyed by its id.
    async fn update(&self, record: UserRecord) -> Result<UserRecord>;
}

/// In-memory identity store for single-process deployments and tests.
pub struct MemoryIdentityStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
    next_id: AtomicU64,
}

impl MemoryIdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.username.as_str() == subject)
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_all_by_ids(&self, ids: &HashSet<UserId>) -> Result<Vec<UserRecord>> {
        let users = self.users.read().await;
        let mut found: Vec<UserRecord> = users
            .values()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect();
        found.sort_by_key(|u| u.id);
        Ok(found)
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.username.as_str() == user.username.as_str())
        {
            anyhow::bail!("username `{}` already exists", user.username);
        }

        let id = UserId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = UserRecord {
            id,
            username: user.username,
            password_hash: user.password_hash,
            authorities: user.authorities,
            status: user.status,
        };
        users.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, record: UserRecord) -> Result<UserRecord> {
        let mut users = self.users.write().await;
        if !users.contains_key(&record.id) {
            anyhow::bail!("no user with id {}", record.id);
        }
        users.insert(record.id, record.clone());
        Ok(record)
    }
}
