//! Request-time token validation.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::store::UserRecord;
use crate::token::claims::ClaimsCodec;

/// Validates a raw token against a resolved identity.
///
/// Side-effect free and safe to call concurrently from many requests: the
/// only shared state is the read-only codec.
pub struct TokenValidator {
    codec: Arc<ClaimsCodec>,
}

impl TokenValidator {
    /// Create a validator over the shared codec.
    pub fn new(codec: Arc<ClaimsCodec>) -> Self {
        Self { codec }
    }

    /// Check a token against the identity it claims to belong to.
    ///
    /// Checks run in order: decode (structure + signature), subject match,
    /// expiry, account-status flags. Any failure yields `false`; this
    /// function never raises to the caller.
    pub fn validate(&self, token: &str, user: &UserRecord) -> bool {
        let claims = match self.codec.decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "token rejected: decode failed");
                return false;
            }
        };

        if claims.subject() != user.username.as_str() {
            debug!(
                subject = %user.username,
                claimed = %claims.subject(),
                "token rejected: subject mismatch"
            );
            return false;
        }

        if claims.is_expired(Utc::now()) {
            debug!(subject = %user.username, jti = %claims.jti, "token rejected: expired");
            return false;
        }

        if !user.status.is_usable() {
            debug!(subject = %user.username, "token rejected: account not usable");
            return false;
        }

        true
    }
}
