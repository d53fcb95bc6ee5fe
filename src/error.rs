//! Error taxonomy for the authentication core.

use std::fmt;

/// Authentication and authorization errors.
///
/// Token decode failures (`Malformed`, `InvalidSignature`) are deliberately
/// absent here: they live in [`crate::token::CodecError`] and never cross the
/// request boundary; the middleware collapses them to an anonymous context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No record exists for the requested subject or id.
    NotFound,
    /// Credentials were presented and rejected.
    Unauthorized,
    /// The caller is authenticated but not allowed to perform the operation.
    Forbidden(String),
    /// The username is already taken.
    Conflict,
    /// A dependency (identity store) failed or exceeded its deadline.
    /// Infrastructure failure, distinct from any credential failure.
    Unavailable(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Not found"),
            Self::Unauthorized => write!(f, "Invalid credentials"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            Self::Conflict => write!(f, "Username already exists"),
            Self::Unavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}
