//! Declarative authorization checks for service-layer operations.

use tracing::warn;

use crate::context::SecurityContext;
use crate::error::AuthError;

/// Authority label granting access to other users' resources.
pub const ADMIN_AUTHORITY: &str = "admin";

/// Require that the caller is `target` or holds the admin authority.
///
/// Anonymous callers always fail; the middleware's fail-open policy relies
/// on guards like this one being the layer that actually denies access.
pub fn require_self_or_admin(ctx: &SecurityContext, target: &str) -> Result<(), AuthError> {
    match ctx.get() {
        Some(user) if user.subject.as_str() == target => Ok(()),
        Some(user) if user.authorities.contains(ADMIN_AUTHORITY) => Ok(()),
        Some(user) => {
            warn!(
                subject = %user.subject,
                target = %target,
                "access denied: not the owner and not an admin"
            );
            Err(AuthError::Forbidden(
                "you are not allowed to view this user's details".to_string(),
            ))
        }
        None => {
            warn!(target = %target, "access denied: anonymous caller");
            Err(AuthError::Forbidden(
                "authentication required for this operation".to_string(),
            ))
        }
    }
}
