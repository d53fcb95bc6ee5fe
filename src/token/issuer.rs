//! Token issuance.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::store::UserRecord;
use crate::token::claims::{ClaimsCodec, CodecError};

/// Issues signed tokens for verified identities.
///
/// The expiry window is fixed at construction from the `token_ttl`
/// configuration value.
pub struct TokenIssuer {
    codec: Arc<ClaimsCodec>,
    ttl: chrono::Duration,
}

impl TokenIssuer {
    /// Create an issuer with the given time-to-live for new tokens.
    pub fn new(codec: Arc<ClaimsCodec>, ttl: Duration) -> Self {
        Self {
            codec,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1)),
        }
    }

    /// Produce a signed token carrying the user's subject, the issuance
    /// time, and the configured expiry offset.
    pub fn issue(&self, user: &UserRecord) -> Result<String, CodecError> {
        let now = Utc::now();
        let token = self.codec.encode(&user.username, now, now + self.ttl)?;
        debug!(subject = %user.username, "token issued");
        Ok(token)
    }
}
