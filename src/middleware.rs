//! Authentication middleware.
//!
//! Runs once per inbound request, ahead of routing: extracts the bearer
//! token, validates it against the resolved identity, and populates the
//! request's [`SecurityContext`]. The middleware never terminates the chain
//! on an authentication failure; it fails open to an anonymous context and
//! leaves denial to the downstream authorization guards. The one exception
//! is infrastructure failure of the identity lookup (error or elapsed
//! deadline), which ends the request with 503, never 401.

use axum::{
    Json,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::{HeaderMap, StatusCode, header};
use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, error};

use crate::api::AppState;
use crate::context::{AuthenticatedUser, SecurityContext};
use crate::store::IdentityStore;

/// Per-request authentication pass.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let ctx = SecurityContext::empty();
    let token = bearer_token(req.headers()).map(str::to_string);

    if let Some(token) = token {
        match state.codec.decode(&token) {
            Ok(claims) => {
                let lookup = timeout(
                    state.lookup_timeout,
                    state.store.find_by_subject(claims.subject()),
                )
                .await;

                match lookup {
                    Err(_) => {
                        error!(subject = %claims.sub, "identity lookup exceeded deadline");
                        return unavailable();
                    }
                    Ok(Err(e)) => {
                        error!(subject = %claims.sub, error = %e, "identity lookup failed");
                        return unavailable();
                    }
                    Ok(Ok(None)) => {
                        debug!(subject = %claims.sub, "unknown subject, continuing anonymous");
                    }
                    Ok(Ok(Some(user))) => {
                        if state.validator.validate(&token, &user) {
                            debug!(subject = %user.username, jti = %claims.jti, "request authenticated");
                            ctx.set(AuthenticatedUser {
                                subject: user.username.clone(),
                                authorities: user.authorities.clone(),
                                status: user.status,
                                claims,
                            });
                        }
                        // rejection reasons are logged by the validator
                    }
                }
            }
            Err(e) => {
                debug!(error = %e, "bearer token rejected, continuing anonymous");
            }
        }
    }

    req.extensions_mut().insert(ctx);
    next.run(req).await
}

/// Pull the bearer token out of the `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": "service unavailable"})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_missing_header_yields_none() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_non_bearer_scheme_yields_none() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_scheme_is_case_sensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers), None);
    }
}
