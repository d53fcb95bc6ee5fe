//! Signed claims codec.

use std::fmt;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Subject;

/// Claims embedded in every token this service issues.
///
/// This is the only trusted carrier of subject and expiry after validation.
/// Claims are reconstructed per decode call and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Standard JWT subject: the username.
    pub sub: String,
    /// Token id (UUID v4) for audit log correlation.
    pub jti: String,
    /// Issued-at (Unix timestamp, seconds).
    pub iat: i64,
    /// Expiry (Unix timestamp, seconds).
    pub exp: i64,
}

impl Claims {
    /// The subject this token was issued to.
    pub fn subject(&self) -> &str {
        &self.sub
    }

    /// Whether the token's expiry has passed at `now`.
    ///
    /// Expiry is checked here, not during decode, so the validator owns the
    /// ordering of its checks and an expired-but-authentic token remains
    /// distinguishable from a forged one in logs.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp < now.timestamp()
    }
}

/// Codec failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The token structure could not be parsed.
    Malformed,
    /// The token parsed but its signature did not verify.
    InvalidSignature,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "token is malformed"),
            Self::InvalidSignature => write!(f, "token signature is invalid"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Encodes and decodes signed tokens over the shared signing secret.
///
/// Constructed once at startup; the keys are read-only afterwards, so the
/// codec is safe to share across concurrent requests behind an `Arc`.
pub struct ClaimsCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl ClaimsCodec {
    /// Build a codec from the process-wide signing secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is the validator's check, sequenced after the subject
        // comparison; decode must succeed for expired tokens.
        validation.validate_exp = false;
        validation.required_spec_claims = Default::default();

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Produce a signed token for `subject` with the given validity window.
    pub fn encode(
        &self,
        subject: &Subject,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, CodecError> {
        let claims = Claims {
            sub: subject.as_str().to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&jsonwebtoken::Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| CodecError::Malformed)
    }

    /// Decode a token, verifying structure and signature.
    ///
    /// Any mutation of the encoded payload invalidates the signature and
    /// yields `InvalidSignature`; unparseable input yields `Malformed`.
    pub fn decode(&self, token: &str) -> Result<Claims, CodecError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => CodecError::InvalidSignature,
                _ => CodecError::Malformed,
            })
    }
}
