//! User service: login, registration, and subject-scoped lookups.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::SecurityContext;
use crate::error::AuthError;
use crate::guard::require_self_or_admin;
use crate::password::PasswordHasher;
use crate::store::{AccountStatus, IdentityStore, NewUser, UserRecord};
use crate::token::TokenIssuer;
use crate::types::{Authority, Subject, UserId};
use crate::verifier::CredentialVerifier;

/// Public projection of a user, safe for cross-service consumption.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: UserId,
    pub username: Subject,
}

impl From<&UserRecord> for PublicUser {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username.clone(),
        }
    }
}

/// Partial update of a stored user. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Service-layer operations over identities.
pub struct UserService {
    store: Arc<dyn IdentityStore>,
    hasher: Arc<dyn PasswordHasher>,
    verifier: CredentialVerifier,
    issuer: Arc<TokenIssuer>,
}

impl UserService {
    /// Assemble the service from its collaborators.
    pub fn new(
        store: Arc<dyn IdentityStore>,
        hasher: Arc<dyn PasswordHasher>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        let verifier = CredentialVerifier::new(store.clone(), hasher.clone());
        Self {
            store,
            hasher,
            verifier,
            issuer,
        }
    }

    /// Verify credentials and issue a token.
    ///
    /// Unknown-username and wrong-password both surface as `Unauthorized`
    /// so the response cannot be used to probe which usernames exist.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let user = self.verifier.verify(username, password).await.map_err(|e| match e {
            AuthError::NotFound => AuthError::Unauthorized,
            other => other,
        })?;

        let token = self
            .issuer
            .issue(&user)
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        info!(subject = %user.username, "login succeeded");
        Ok(token)
    }

    /// Register a new user with a hashed password and a fully usable
    /// account status.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        authorities: HashSet<Authority>,
    ) -> Result<UserRecord, AuthError> {
        let password_hash = self
            .hasher
            .hash(password)
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        if self
            .store
            .find_by_subject(username)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?
            .is_some()
        {
            return Err(AuthError::Conflict);
        }

        let record = self
            .store
            .insert(NewUser {
                username: Subject::new(username),
                password_hash,
                authorities,
                status: AccountStatus::active(),
            })
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        info!(subject = %record.username, id = %record.id, "user registered");
        Ok(record)
    }

    /// Update username and/or password of an existing user. The caller must
    /// be the user being updated or an admin.
    pub async fn update(
        &self,
        ctx: &SecurityContext,
        id: UserId,
        update: UserUpdate,
    ) -> Result<UserRecord, AuthError> {
        let mut record = self
            .store
            .find_by_id(id)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?
            .ok_or(AuthError::NotFound)?;

        require_self_or_admin(ctx, record.username.as_str())?;

        if let Some(username) = update.username {
            record.username = Subject::new(username);
        }
        if let Some(password) = update.password {
            record.password_hash = self
                .hasher
                .hash(&password)
                .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        }

        let record = self
            .store
            .update(record)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        info!(subject = %record.username, id = %record.id, "user updated");
        Ok(record)
    }

    /// Subject-scoped detail lookup, gated by the self-or-admin guard.
    pub async fn find_by_username(
        &self,
        ctx: &SecurityContext,
        username: &str,
    ) -> Result<UserRecord, AuthError> {
        require_self_or_admin(ctx, username)?;

        self.store
            .find_by_subject(username)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?
            .ok_or(AuthError::NotFound)
    }

    /// Resolve a username to its id for sibling services.
    pub async fn find_id_by_username(&self, username: &str) -> Result<UserId, AuthError> {
        self.store
            .find_by_subject(username)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?
            .map(|u| u.id)
            .ok_or(AuthError::NotFound)
    }

    /// Bulk public lookup by id set.
    ///
    /// All-or-nothing: when no id matches, the whole call is `NotFound`
    /// rather than an empty list.
    pub async fn find_by_id_public(
        &self,
        ids: &HashSet<UserId>,
    ) -> Result<Vec<PublicUser>, AuthError> {
        let found = self
            .store
            .find_all_by_ids(ids)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        if found.is_empty() {
            return Err(AuthError::NotFound);
        }

        Ok(found.iter().map(PublicUser::from).collect())
    }
}
