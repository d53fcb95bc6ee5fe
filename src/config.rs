//! Runtime configuration.

use std::collections::HashSet;
use std::time::Duration;
use std::{env, fs, path::PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::types::{Authority, PasswordHash, Subject};

/// Default validity window for issued tokens.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Default deadline for the per-request identity lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Authentication configuration, established at startup and read-only
/// afterwards. The signing secret is not reloadable without a restart.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared signing secret for the claims codec.
    pub secret: String,
    /// Duration since issuance after which a token is no longer valid.
    pub token_ttl: Duration,
    /// Deadline for the identity lookup performed per request; exceeding it
    /// classifies as `Unavailable`, not as a credential failure.
    pub lookup_timeout: Duration,
}

impl AuthConfig {
    /// Configuration with default TTL and lookup deadline.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            token_ttl: DEFAULT_TOKEN_TTL,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Override the token time-to-live.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Override the identity-lookup deadline.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Short SHA-256 fingerprint of the signing secret, loggable at startup
    /// so operators can confirm which secret is loaded without exposing it.
    pub fn secret_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..8].to_string()
    }
}

/// A user entry in the seed file.
///
/// Seed files carry password hashes (produced with `gateward hash-password`),
/// never plaintext passwords.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub username: Subject,
    pub password_hash: PasswordHash,
    #[serde(default)]
    pub authorities: HashSet<Authority>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    users: Vec<SeedUser>,
}

/// Locate the user seed file: `GATEWARD_USERS` env var, then
/// `$XDG_CONFIG_HOME/gateward/users.json`, then `./users.json`.
pub fn resolve_seed_path() -> anyhow::Result<PathBuf> {
    if let Ok(p) = env::var("GATEWARD_USERS") {
        return Ok(PathBuf::from(p));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("gateward").join("users.json");
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let candidate = PathBuf::from("users.json");
    if candidate.exists() {
        return Ok(candidate);
    }

    Err(anyhow::anyhow!(
        "Could not find users.json (set GATEWARD_USERS or create ./users.json)"
    ))
}

/// Load seed users from a JSON file.
pub fn load_seed_users(path: &PathBuf) -> anyhow::Result<Vec<SeedUser>> {
    let raw = fs::read_to_string(path)?;
    let file: SeedFile = serde_json::from_str(&raw)?;
    Ok(file.users)
}
