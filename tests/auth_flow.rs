//! End-to-end tests driving the router through the full authentication
//! pipeline: login, token submission, context population, guards, and the
//! fail-open/unavailable edges.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use gateward::api::AppState;
use gateward::{
    AccountStatus, AuthConfig, Authority, BcryptHasher, IdentityStore, MemoryIdentityStore,
    NewUser, PasswordHasher, Subject, UserId, UserRecord, build_state,
};

const SECRET: &str = "integration-test-signing-secret";

async fn seeded_state() -> AppState {
    let hasher = Arc::new(BcryptHasher::with_cost(4));
    let store = Arc::new(MemoryIdentityStore::new());

    for (name, password, authorities) in [
        ("alice", "wonderland", vec![]),
        ("bob", "builder", vec![]),
        ("carol", "charming", vec!["admin"]),
    ] {
        store
            .insert(NewUser {
                username: Subject::new(name),
                password_hash: hasher.hash(password).unwrap(),
                authorities: authorities.into_iter().map(Authority::new).collect(),
                status: AccountStatus::active(),
            })
            .await
            .unwrap();
    }

    build_state(&AuthConfig::new(SECRET), store, hasher)
}

async fn app() -> Router {
    gateward::api::router(seeded_state().await)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            json!({"username": username, "password": password}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn login_then_me_resolves_subject() -> Result<()> {
    let app = app().await;
    let token = login(&app, "alice", "wonderland").await;

    let response = app.clone().oneshot(get_with_token("/me", &token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["subject"], "alice");
    Ok(())
}

#[tokio::test]
async fn anonymous_me_is_unauthorized() -> Result<()> {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/me").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn tampered_subject_claim_resolves_to_anonymous() -> Result<()> {
    let app = app().await;
    let token = login(&app, "alice", "wonderland").await;

    // Rewrite the payload segment so the token claims to be bob; the
    // signature no longer matches and the request must fall back to
    // anonymous, which /me rejects.
    let mut parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3);
    let payload = String::from_utf8(URL_SAFE_NO_PAD.decode(parts[1])?)?;
    let forged_payload = payload.replace("alice", "bob");
    assert_ne!(payload, forged_payload);
    let forged = URL_SAFE_NO_PAD.encode(forged_payload.as_bytes());
    parts[1] = &forged;
    let forged_token = parts.join(".");

    let response = app
        .clone()
        .oneshot(get_with_token("/me", &forged_token))
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn flipping_one_signature_byte_resolves_to_anonymous() -> Result<()> {
    let app = app().await;
    let token = login(&app, "alice", "wonderland").await;

    let mut bytes = token.into_bytes();
    let last = bytes.len() - 1;
    bytes[last] = if bytes[last] == b'A' { b'B' } else { b'A' };
    let corrupted = String::from_utf8(bytes)?;

    let response = app
        .clone()
        .oneshot(get_with_token("/me", &corrupted))
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_indistinguishable() -> Result<()> {
    let app = app().await;

    let wrong_password = app
        .clone()
        .oneshot(post_json(
            "/login",
            json!({"username": "bob", "password": "breaker"}),
        ))
        .await?;
    let unknown_user = app
        .clone()
        .oneshot(post_json(
            "/login",
            json!({"username": "nobody", "password": "anything"}),
        ))
        .await?;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(wrong_password).await,
        body_json(unknown_user).await
    );
    Ok(())
}

#[tokio::test]
async fn expired_token_resolves_to_anonymous() -> Result<()> {
    let state = seeded_state().await;
    let app = gateward::api::router(state.clone());

    let now = chrono::Utc::now();
    let token = state
        .codec
        .encode(
            &Subject::new("alice"),
            now - chrono::Duration::hours(2),
            now - chrono::Duration::hours(1),
        )
        .unwrap();

    let response = app.clone().oneshot(get_with_token("/me", &token)).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn self_or_admin_guard_on_user_detail() -> Result<()> {
    let app = app().await;
    let alice = login(&app, "alice", "wonderland").await;
    let carol = login(&app, "carol", "charming").await;

    // Self access.
    let response = app
        .clone()
        .oneshot(get_with_token("/users/alice", &alice))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["username"], "alice");

    // Admin access to someone else's details.
    let response = app
        .clone()
        .oneshot(get_with_token("/users/alice", &carol))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Plain user reading someone else's details.
    let response = app
        .clone()
        .oneshot(get_with_token("/users/bob", &alice))
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Anonymous caller.
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/users/alice").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn concurrent_requests_do_not_share_context() -> Result<()> {
    let app = app().await;
    let alice = login(&app, "alice", "wonderland").await;
    let bob = login(&app, "bob", "builder").await;

    let (a, b) = tokio::join!(
        app.clone().oneshot(get_with_token("/me", &alice)),
        app.clone().oneshot(get_with_token("/me", &bob)),
    );

    assert_eq!(body_json(a?).await["subject"], "alice");
    assert_eq!(body_json(b?).await["subject"], "bob");
    Ok(())
}

#[tokio::test]
async fn register_then_login_roundtrip() -> Result<()> {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/users",
            json!({"username": "dave", "password": "excavator"}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let detail = body_json(response).await;
    assert_eq!(detail["username"], "dave");
    assert_eq!(detail["enabled"], true);
    assert!(detail.get("password_hash").is_none());

    let token = login(&app, "dave", "excavator").await;
    let response = app.clone().oneshot(get_with_token("/me", &token)).await?;
    assert_eq!(body_json(response).await["subject"], "dave");
    Ok(())
}

#[tokio::test]
async fn register_duplicate_username_conflicts() -> Result<()> {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(post_json(
            "/users",
            json!({"username": "alice", "password": "whatever"}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn public_bulk_lookup_is_all_or_nothing() -> Result<()> {
    let app = app().await;

    // Resolve alice's id first.
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/users/alice/id").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let id = body_json(response).await["id"].as_u64().unwrap();

    // Known id (plus one unknown) returns the found subset.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/users/public/{},999", id))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["users"][0]["username"], "alice");

    // No matching id at all is NotFound, not an empty list.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/public/999")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Unparseable ids are a bad request.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/public/abc")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn update_rotates_password_via_api() -> Result<()> {
    let app = app().await;
    let alice = login(&app, "alice", "wonderland").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/users/alice")
                .header(header::AUTHORIZATION, format!("Bearer {}", alice))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"password": "looking-glass"}).to_string()))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Old password is out, new one works.
    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            json!({"username": "alice", "password": "wonderland"}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    login(&app, "alice", "looking-glass").await;
    Ok(())
}

/// Identity store that fails every call, standing in for an unreachable
/// backing service.
struct FailingStore;

#[async_trait]
impl IdentityStore for FailingStore {
    async fn find_by_subject(&self, _subject: &str) -> Result<Option<UserRecord>> {
        anyhow::bail!("backing store unreachable")
    }

    async fn find_by_id(&self, _id: UserId) -> Result<Option<UserRecord>> {
        anyhow::bail!("backing store unreachable")
    }

    async fn find_all_by_ids(&self, _ids: &HashSet<UserId>) -> Result<Vec<UserRecord>> {
        anyhow::bail!("backing store unreachable")
    }

    async fn insert(&self, _user: NewUser) -> Result<UserRecord> {
        anyhow::bail!("backing store unreachable")
    }

    async fn update(&self, _record: UserRecord) -> Result<UserRecord> {
        anyhow::bail!("backing store unreachable")
    }
}

#[tokio::test]
async fn store_outage_is_unavailable_not_unauthorized() -> Result<()> {
    // A healthy app issues the token; a broken one receives it.
    let healthy = app().await;
    let token = login(&healthy, "alice", "wonderland").await;

    let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptHasher::with_cost(4));
    let broken_state = build_state(&AuthConfig::new(SECRET), Arc::new(FailingStore), hasher);
    let broken = gateward::api::router(broken_state);

    // Authenticated request: the lookup failure is infrastructure, not a
    // credential problem.
    let response = broken.clone().oneshot(get_with_token("/me", &token)).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Login against the broken store is also 503, never a credential error.
    let response = broken
        .clone()
        .oneshot(post_json(
            "/login",
            json!({"username": "alice", "password": "wonderland"}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

/// Identity store that hangs long enough to trip any reasonable deadline.
struct SlowStore;

#[async_trait]
impl IdentityStore for SlowStore {
    async fn find_by_subject(&self, _subject: &str) -> Result<Option<UserRecord>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn find_by_id(&self, _id: UserId) -> Result<Option<UserRecord>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn find_all_by_ids(&self, _ids: &HashSet<UserId>) -> Result<Vec<UserRecord>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }

    async fn insert(&self, _user: NewUser) -> Result<UserRecord> {
        anyhow::bail!("read-only")
    }

    async fn update(&self, _record: UserRecord) -> Result<UserRecord> {
        anyhow::bail!("read-only")
    }
}

#[tokio::test]
async fn lookup_deadline_is_unavailable_not_unauthorized() -> Result<()> {
    let healthy = app().await;
    let token = login(&healthy, "alice", "wonderland").await;

    let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptHasher::with_cost(4));
    let config = AuthConfig::new(SECRET).with_lookup_timeout(Duration::from_millis(50));
    let slow = gateward::api::router(build_state(&config, Arc::new(SlowStore), hasher));

    let response = slow.clone().oneshot(get_with_token("/me", &token)).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn unknown_subject_token_fails_open_to_anonymous() -> Result<()> {
    // Token signed with the right secret but for a subject the store has
    // never heard of: the request continues anonymously rather than erroring.
    let state = seeded_state().await;
    let app = gateward::api::router(state.clone());

    let now = chrono::Utc::now();
    let token = state
        .codec
        .encode(&Subject::new("ghost"), now, now + chrono::Duration::hours(1))
        .unwrap();

    let response = app.clone().oneshot(get_with_token("/me", &token)).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unprotected routes still serve anonymous callers.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn health_is_open() -> Result<()> {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
    Ok(())
}
