//! Pluggable password hashing primitive.
//!
//! The verifier never compares hashes itself; it delegates to this trait so
//! the algorithm can be swapped without touching the authentication flow.
//! The bundled implementation uses bcrypt, whose verification is resistant
//! to timing leaks.

use std::fmt;

use crate::types::PasswordHash;

/// Failure to produce a hash.
#[derive(Debug, Clone)]
pub struct HashError(String);

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "password hashing failed: {}", self.0)
    }
}

impl std::error::Error for HashError {}

/// Hashing primitive consumed by the credential verifier and user service.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password for storage.
    fn hash(&self, plaintext: &str) -> Result<PasswordHash, HashError>;

    /// Compare a plaintext password against a stored hash.
    ///
    /// A malformed stored hash never verifies.
    fn matches(&self, plaintext: &str, hash: &PasswordHash) -> bool;
}

/// bcrypt-backed hasher.
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Hasher at the library's default cost.
    pub fn new() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Hasher at an explicit cost. Low costs are for tests only.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<PasswordHash, HashError> {
        bcrypt::hash(plaintext, self.cost)
            .map(PasswordHash::new)
            .map_err(|e| HashError(e.to_string()))
    }

    fn matches(&self, plaintext: &str, hash: &PasswordHash) -> bool {
        bcrypt::verify(plaintext, hash.as_str()).unwrap_or(false)
    }
}
