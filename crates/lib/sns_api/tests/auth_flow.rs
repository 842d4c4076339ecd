//! Integration test: build the router over in-memory repositories and drive
//! the auth endpoints end to end.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use serde_json::{Value, json};
use sns_api::config::ApiConfig;
use sns_api::{AppState, router};
use sns_core::auth::memory::{MemoryRefreshTokenRepository, MemoryUserDirectory};
use sns_core::auth::password::hash_password;
use sns_core::auth::{JwtSecret, SessionConfig};
use sns_core::config::Deployment;
use sns_core::models::auth::{NewUser, UserStatus};
use tower::ServiceExt;

struct Harness {
    app: Router,
    users: Arc<MemoryUserDirectory>,
    state: AppState,
}

fn harness() -> Harness {
    let secret = JwtSecret::new("api-integration-secret", Deployment::Test).expect("secret");
    let config = ApiConfig::new(Deployment::Test, SessionConfig::new(secret));
    let users = Arc::new(MemoryUserDirectory::new());
    let state = AppState::new(
        config,
        Arc::new(MemoryRefreshTokenRepository::new()),
        users.clone(),
    );
    Harness {
        app: router(state.clone()),
        users,
        state,
    }
}

fn add_user(users: &MemoryUserDirectory, email: &str, status: UserStatus) -> i64 {
    users
        .insert(
            NewUser {
                email: email.into(),
                username: email.split('@').next().expect("local part").into(),
                password_hash: hash_password("password123").expect("hash"),
            },
            status,
        )
        .expect("insert")
        .id
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("response")
}

async fn json_body(resp: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}

fn set_cookies(resp: &Response<Body>) -> Vec<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().expect("ascii").to_string())
        .collect()
}

async fn login(app: &Router, email: &str) -> Value {
    let resp = send(
        app,
        post_json(
            "/api/v1/auth/login",
            json!({"email": email, "password": "password123"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await
}

#[tokio::test]
async fn health_endpoint_returns_expected_shape() {
    let h = harness();
    let resp = send(
        &h.app,
        Request::builder().uri("/health").body(Body::empty()).expect("request"),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert!(resp.headers().contains_key("x-ratelimit-remaining"));
    let json = json_body(resp).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn register_creates_pending_account() {
    let h = harness();
    let resp = send(
        &h.app,
        post_json(
            "/api/v1/auth/register",
            json!({"email": "new@example.com", "username": "newbie", "password": "password123"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = json_body(resp).await;
    assert_eq!(json["status"], "pending");
    assert_eq!(json["username"], "newbie");

    let dup = send(
        &h.app,
        post_json(
            "/api/v1/auth/register",
            json!({"email": "new@example.com", "username": "other", "password": "password123"}),
        ),
    )
    .await;
    assert_eq!(dup.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(dup).await["error"], "conflict");
}

#[tokio::test]
async fn register_validates_input() {
    let h = harness();
    let resp = send(
        &h.app,
        post_json(
            "/api/v1/auth/register",
            json!({"email": "bad", "username": "x", "password": "short"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "validation_error");
}

#[tokio::test]
async fn login_sets_cookies_and_returns_pair() {
    let h = harness();
    add_user(&h.users, "alice@example.com", UserStatus::Approved);

    let resp = send(
        &h.app,
        post_json(
            "/api/v1/auth/login",
            json!({"email": "alice@example.com", "password": "password123"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookies = set_cookies(&resp);
    assert!(cookies.iter().any(|c| c.starts_with("access_token=") && c.contains("HttpOnly")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=") && c.contains("Max-Age=604800")));

    let json = json_body(resp).await;
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["expires_in"], 3600);
    assert_eq!(json["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let h = harness();
    add_user(&h.users, "alice@example.com", UserStatus::Approved);

    for body in [
        json!({"email": "alice@example.com", "password": "nope-nope"}),
        json!({"email": "ghost@example.com", "password": "password123"}),
    ] {
        let resp = send(&h.app, post_json("/api/v1/auth/login", body)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["message"], "Invalid email or password");
    }
}

#[tokio::test]
async fn me_accepts_bearer_and_cookie() {
    let h = harness();
    let id = add_user(&h.users, "alice@example.com", UserStatus::Approved);
    let tokens = login(&h.app, "alice@example.com").await;
    let access = tokens["access_token"].as_str().expect("access");

    let bearer = Request::builder()
        .uri("/api/v1/auth/me")
        .header(AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::empty())
        .expect("request");
    let resp = send(&h.app, bearer).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["id"], id);

    let cookie = Request::builder()
        .uri("/api/v1/auth/me")
        .header(COOKIE, format!("access_token={access}"))
        .body(Body::empty())
        .expect("request");
    assert_eq!(send(&h.app, cookie).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn me_rejects_missing_and_forged_tokens() {
    let h = harness();
    let missing = Request::builder()
        .uri("/api/v1/auth/me")
        .body(Body::empty())
        .expect("request");
    assert_eq!(send(&h.app, missing).await.status(), StatusCode::UNAUTHORIZED);

    let forged = Request::builder()
        .uri("/api/v1/auth/me")
        .header(AUTHORIZATION, "Bearer not.a.jwt")
        .body(Body::empty())
        .expect("request");
    assert_eq!(send(&h.app, forged).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn inactive_account_is_forbidden_and_cookies_cleared() {
    let h = harness();
    let id = add_user(&h.users, "pending@example.com", UserStatus::Pending);
    let tokens = login(&h.app, "pending@example.com").await;
    let access = tokens["access_token"].as_str().expect("access");

    let req = Request::builder()
        .uri("/api/v1/auth/me")
        .header(AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::empty())
        .expect("request");
    let resp = send(&h.app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(set_cookies(&resp).iter().all(|c| c.contains("Max-Age=0")));
    assert_eq!(set_cookies(&resp).len(), 2);

    h.users.set_status(id, UserStatus::Approved);
    let req = Request::builder()
        .uri("/api/v1/auth/me")
        .header(AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::empty())
        .expect("request");
    assert_eq!(send(&h.app, req).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_rotates_and_rejects_replay() {
    let h = harness();
    add_user(&h.users, "alice@example.com", UserStatus::Approved);
    let first = login(&h.app, "alice@example.com").await;
    let r1 = first["refresh_token"].as_str().expect("refresh").to_string();

    let resp = send(
        &h.app,
        post_json("/api/v1/auth/refresh", json!({"refresh_token": r1})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second = json_body(resp).await;
    let r2 = second["refresh_token"].as_str().expect("refresh").to_string();
    assert_ne!(r1, r2);

    let replay = send(
        &h.app,
        post_json("/api/v1/auth/refresh", json!({"refresh_token": r1})),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(set_cookies(&replay).len(), 2);

    // The refresh cookie takes precedence over the body.
    let via_cookie = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/refresh")
        .header(COOKIE, format!("refresh_token={r2}"))
        .body(Body::empty())
        .expect("request");
    assert_eq!(send(&h.app, via_cookie).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_token_is_unauthorized() {
    let h = harness();
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/refresh")
        .body(Body::empty())
        .expect("request");
    assert_eq!(send(&h.app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_always_succeeds_and_revokes() {
    let h = harness();
    add_user(&h.users, "alice@example.com", UserStatus::Approved);
    let tokens = login(&h.app, "alice@example.com").await;
    let refresh = tokens["refresh_token"].as_str().expect("refresh").to_string();

    for _ in 0..2 {
        let resp = send(
            &h.app,
            post_json("/api/v1/auth/logout", json!({"refresh_token": refresh})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(set_cookies(&resp).len(), 2);
    }

    let bare = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/logout")
        .body(Body::empty())
        .expect("request");
    assert_eq!(send(&h.app, bare).await.status(), StatusCode::OK);

    assert!(h.state.sessions.store().validate(&refresh).await.is_err());
}

#[tokio::test]
async fn revoke_all_ends_every_session_of_the_caller() {
    let h = harness();
    add_user(&h.users, "alice@example.com", UserStatus::Approved);
    add_user(&h.users, "bob@example.com", UserStatus::Approved);
    let phone = login(&h.app, "alice@example.com").await;
    let laptop = login(&h.app, "alice@example.com").await;
    let bob = login(&h.app, "bob@example.com").await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/revoke-all")
        .header(
            AUTHORIZATION,
            format!("Bearer {}", phone["access_token"].as_str().expect("access")),
        )
        .body(Body::empty())
        .expect("request");
    let resp = send(&h.app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["revoked"], 2);

    for (tokens, expected) in [
        (&phone, StatusCode::UNAUTHORIZED),
        (&laptop, StatusCode::UNAUTHORIZED),
        (&bob, StatusCode::OK),
    ] {
        let resp = send(
            &h.app,
            post_json(
                "/api/v1/auth/refresh",
                json!({"refresh_token": tokens["refresh_token"]}),
            ),
        )
        .await;
        assert_eq!(resp.status(), expected);
    }
}
