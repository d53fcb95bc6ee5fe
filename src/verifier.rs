//! Credential verification for login.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::AuthError;
use crate::password::PasswordHasher;
use crate::store::{IdentityStore, UserRecord};

/// Checks a presented username/password pair against stored credentials.
///
/// Read-only: no lockout counters, no side effects beyond the lookup.
pub struct CredentialVerifier {
    store: Arc<dyn IdentityStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl CredentialVerifier {
    /// Create a verifier over the identity store and hashing primitive.
    pub fn new(store: Arc<dyn IdentityStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { store, hasher }
    }

    /// Verify credentials, yielding the stored identity on success.
    ///
    /// `NotFound` and `Unauthorized` stay distinct here for logging; the
    /// login path collapses them before anything reaches the caller.
    pub async fn verify(&self, username: &str, password: &str) -> Result<UserRecord, AuthError> {
        let user = self
            .store
            .find_by_subject(username)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?
            .ok_or_else(|| {
                debug!(subject = %username, "credential check failed: unknown subject");
                AuthError::NotFound
            })?;

        if !self.hasher.matches(password, &user.password_hash) {
            warn!(subject = %username, "credential check failed: password mismatch");
            return Err(AuthError::Unauthorized);
        }

        Ok(user)
    }
}
