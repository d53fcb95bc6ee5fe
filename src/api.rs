//! HTTP surface of the authentication core.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::context::SecurityContext;
use crate::error::AuthError;
use crate::middleware::authenticate;
use crate::store::{AccountStatus, IdentityStore, UserRecord};
use crate::token::{ClaimsCodec, TokenValidator};
use crate::types::{Authority, Subject, UserId};
use crate::users::{UserService, UserUpdate};

/// Shared state behind every route and the authentication middleware.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub store: Arc<dyn IdentityStore>,
    pub codec: Arc<ClaimsCodec>,
    pub validator: Arc<TokenValidator>,
    pub lookup_timeout: Duration,
}

/// API-level errors; wraps the auth taxonomy and adds request-shape
/// failures.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    BadRequest(String),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::Auth(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Auth(AuthError::NotFound) => (StatusCode::NOT_FOUND, "not found".to_string()),
            Self::Auth(AuthError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "invalid credentials".to_string())
            }
            Self::Auth(AuthError::Forbidden(msg)) => (StatusCode::FORBIDDEN, msg),
            Self::Auth(AuthError::Conflict) => {
                (StatusCode::CONFLICT, "username already exists".to_string())
            }
            Self::Auth(AuthError::Unavailable(detail)) => {
                // Detail stays in the logs, not in the response body.
                error!(detail = %detail, "request failed on unavailable dependency");
                (StatusCode::SERVICE_UNAVAILABLE, "service unavailable".to_string())
            }
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(json!({"error": message}))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub authorities: HashSet<Authority>,
}

/// Detail view of a user; never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserDetail {
    pub id: UserId,
    pub username: Subject,
    pub authorities: HashSet<Authority>,
    #[serde(flatten)]
    pub status: AccountStatus,
}

impl From<&UserRecord> for UserDetail {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username.clone(),
            authorities: record.authorities.clone(),
            status: record.status,
        }
    }
}

/// Build the router with tracing, CORS, and the authentication middleware
/// installed ahead of every route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/users", post(register))
        .route("/me", get(me))
        .route("/users/{username}", get(get_user).patch(update_user))
        .route("/users/{username}/id", get(get_user_id))
        .route("/users/public/{ids}", get(get_public))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(axum_middleware::from_fn_with_state(state.clone(), authenticate)),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.users.login(&payload.username, &payload.password).await?;
    Ok(Json(TokenResponse { token }))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserDetail>), ApiError> {
    let record = state
        .users
        .register(&payload.username, &payload.password, payload.authorities)
        .await?;
    Ok((StatusCode::CREATED, Json(UserDetail::from(&record))))
}

async fn me(Extension(ctx): Extension<SecurityContext>) -> Result<Json<serde_json::Value>, ApiError> {
    let user = ctx.get().ok_or(AuthError::Unauthorized).map_err(ApiError::from)?;
    Ok(Json(json!({
        "subject": user.subject,
        "authorities": user.authorities,
    })))
}

async fn get_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(username): Path<String>,
) -> Result<Json<UserDetail>, ApiError> {
    let record = state.users.find_by_username(&ctx, &username).await?;
    Ok(Json(UserDetail::from(&record)))
}

async fn update_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(username): Path<String>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserDetail>, ApiError> {
    let id = state.users.find_id_by_username(&username).await?;
    let record = state.users.update(&ctx, id, update).await?;
    Ok(Json(UserDetail::from(&record)))
}

async fn get_user_id(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = state.users.find_id_by_username(&username).await?;
    Ok(Json(json!({"id": id})))
}

async fn get_public(
    State(state): State<AppState>,
    Path(ids): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ids: HashSet<UserId> = ids
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<u64>()
                .map(UserId::new)
                .map_err(|_| ApiError::BadRequest(format!("invalid user id: `{}`", s.trim())))
        })
        .collect::<Result<_, _>>()?;

    let users = state.users.find_by_id_public(&ids).await?;
    let count = users.len();
    Ok(Json(json!({
        "users": users,
        "count": count,
    })))
}
