// Core modules
mod config;
mod context;
mod error;
mod guard;
mod middleware;
mod password;
mod store;
mod token;
mod types;
mod users;
mod verifier;

// HTTP surface
pub mod api;
pub mod server;

// Re-export key types and functions
pub use config::{AuthConfig, SeedUser, load_seed_users, resolve_seed_path};
pub use context::{AuthenticatedUser, SecurityContext};
pub use error::AuthError;
pub use guard::{ADMIN_AUTHORITY, require_self_or_admin};
pub use password::{BcryptHasher, HashError, PasswordHasher};
pub use store::{AccountStatus, IdentityStore, MemoryIdentityStore, NewUser, UserRecord};
pub use token::{Claims, ClaimsCodec, CodecError, TokenIssuer, TokenValidator};
pub use types::{Authority, PasswordHash, Subject, UserId};
pub use users::{PublicUser, UserService, UserUpdate};
pub use verifier::CredentialVerifier;

use std::sync::Arc;

use api::AppState;

/// Convenience function to assemble the application state from configuration
/// and an identity store.
///
/// Wires the claims codec, validator, issuer, and user service around the
/// shared signing secret; the result is cheap to clone into the router and
/// middleware.
pub fn build_state(
    config: &AuthConfig,
    store: Arc<dyn IdentityStore>,
    hasher: Arc<dyn PasswordHasher>,
) -> AppState {
    let codec = Arc::new(ClaimsCodec::new(&config.secret));
    let validator = Arc::new(TokenValidator::new(codec.clone()));
    let issuer = Arc::new(TokenIssuer::new(codec.clone(), config.token_ttl));
    let users = Arc::new(UserService::new(store.clone(), hasher, issuer));

    AppState {
        users,
        store,
        codec,
        validator,
        lookup_timeout: config.lookup_timeout,
    }
}
