//! End-to-end tests for the HTTP API against an in-memory database.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use gpm_auth::{AuthConfig, LogNotifier};
use gpm_core::models::credential::Credential;
use gpm_core::models::practice::{CreatePractice, SubscriptionTier};
use gpm_core::models::user::{CreateUser, UserRole};
use gpm_core::repository::{PracticeRepository, UserRepository};
use gpm_db::repository::{SurrealPracticeRepository, SurrealUserRepository};
use gpm_db::{DbConfig, DbManager};
use gpm_server::routes::FORGOT_PASSWORD_MESSAGE;
use gpm_server::{AppState, router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

const PASSWORD: &str = "correct-horse-battery";

struct TestApp {
    app: Router,
    db: DbManager,
}

fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "api-test-secret-0123456789abcdef".into(),
        ..Default::default()
    }
}

async fn spawn_app() -> TestApp {
    let db = DbManager::connect(&DbConfig {
        url: "mem://".into(),
        ..Default::default()
    })
    .await
    .unwrap();
    gpm_db::run_migrations(db.client()).await.unwrap();

    let state = AppState::new(db.client().clone(), auth_config(), Arc::new(LogNotifier));
    TestApp {
        app: router(state),
        db,
    }
}

impl TestApp {
    async fn practice(&self, slug: &str, trial_ends_at: Option<DateTime<Utc>>) -> Uuid {
        let repo = SurrealPracticeRepository::new(self.db.client().clone());
        let practice = repo
            .create(CreatePractice {
                name: format!("{slug} practice"),
                slug: slug.into(),
                trial_ends_at,
                subscription_tier: if trial_ends_at.is_some() {
                    SubscriptionTier::Trial
                } else {
                    SubscriptionTier::Professional
                },
                metadata: None,
            })
            .await
            .unwrap();
        practice.id
    }

    async fn user(&self, practice_id: Uuid, email: &str, role: UserRole) {
        let repo = SurrealUserRepository::new(self.db.client().clone());
        repo.create(CreateUser {
            practice_id,
            email: email.into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            role,
            credential: gpm_auth::credential::new_credential(PASSWORD, None).unwrap(),
        })
        .await
        .unwrap();
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .post_json("/api/auth/login", json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["accessToken"].as_str().unwrap().to_string()
    }

    async fn get_authed(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(
            Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header("x-device-fingerprint", "abc123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn post_authed(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app().await;
    let (status, body) = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn login_returns_token_and_profile() {
    let app = spawn_app().await;
    let practice_id = app.practice("riverside", None).await;
    app.user(practice_id, "ada@riverside.example", UserRole::Doctor)
        .await;

    let (status, body) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "ada@riverside.example", "password": PASSWORD }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["expiresIn"], 28_800);
    assert_eq!(body["user"]["email"], "ada@riverside.example");
    assert_eq!(body["user"]["role"], "doctor");
    assert_eq!(body["user"]["practiceId"], practice_id.to_string());
    assert!(body["user"].get("credential").is_none());
}

#[tokio::test]
async fn login_failures_are_uniform() {
    let app = spawn_app().await;
    let practice_id = app.practice("riverside", None).await;
    app.user(practice_id, "ada@riverside.example", UserRole::Doctor)
        .await;

    let (s1, b1) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "ada@riverside.example", "password": "nope" }),
        )
        .await;
    let (s2, b2) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "ghost@riverside.example", "password": PASSWORD }),
        )
        .await;

    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s1, s2);
    assert_eq!(b1, b2);
    assert_eq!(b1["error"], "Invalid credentials");
}

#[tokio::test]
async fn legacy_seed_account_can_log_in() {
    let app = spawn_app().await;
    let practice_id = app.practice("riverside", None).await;
    SurrealUserRepository::new(app.db.client().clone())
        .create(CreateUser {
            practice_id,
            email: "demo@riverside.example".into(),
            first_name: "Demo".into(),
            last_name: "User".into(),
            role: UserRole::Receptionist,
            credential: Credential::from_stored(&STANDARD.encode("demo1234")),
        })
        .await
        .unwrap();

    let (status, _) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "demo@riverside.example", "password": "demo1234" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_login_body_is_bad_request() {
    let app = spawn_app().await;
    let (status, body) = app
        .post_json("/api/auth/login", json!({ "email": "x@y.z" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = spawn_app().await;

    for uri in ["/api/auth/me", "/api/practice/trial-status"] {
        let (status, body) = app
            .send(Request::get(uri).body(Body::empty()).unwrap())
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body, json!({ "error": "Unauthenticated", "code": "UNAUTHENTICATED" }));
    }

    let (status, _) = app.get_authed("/api/auth/me", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_profile() {
    let app = spawn_app().await;
    let practice_id = app.practice("riverside", None).await;
    app.user(practice_id, "ada@riverside.example", UserRole::Nurse)
        .await;
    let token = app.login("ada@riverside.example").await;

    let (status, body) = app.get_authed("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@riverside.example");
    assert_eq!(body["role"], "nurse");
}

#[tokio::test]
async fn active_trial_reports_hours_remaining() {
    let app = spawn_app().await;
    let practice_id = app
        .practice("riverside", Some(Utc::now() + Duration::hours(10)))
        .await;
    app.user(practice_id, "ada@riverside.example", UserRole::Doctor)
        .await;
    let token = app.login("ada@riverside.example").await;

    let (status, body) = app.get_authed("/api/practice/trial-status", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isTrial"], true);
    assert_eq!(body["trialExpired"], false);
    assert_eq!(body["hoursRemaining"], 10);
    assert_eq!(body["practiceName"], "riverside practice");

    let (status, _) = app.get_authed("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn expired_trial_blocks_staff_but_not_exempt_routes() {
    let app = spawn_app().await;
    let practice_id = app
        .practice("lapsed", Some(Utc::now() - Duration::hours(1)))
        .await;
    app.user(practice_id, "doc@lapsed.example", UserRole::Doctor)
        .await;
    let token = app.login("doc@lapsed.example").await;

    let (status, body) = app.get_authed("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "TRIAL_EXPIRED");

    let (status, body) = app.get_authed("/api/practice/trial-status", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trialExpired"], true);
    assert_eq!(body["hoursRemaining"], 0);

    let (status, body) = app.post_authed("/api/auth/logout", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out");
}

#[tokio::test]
async fn expired_trial_does_not_block_admins() {
    let app = spawn_app().await;
    let practice_id = app
        .practice("lapsed", Some(Utc::now() - Duration::hours(1)))
        .await;
    app.user(practice_id, "admin@lapsed.example", UserRole::Admin)
        .await;
    let token = app.login("admin@lapsed.example").await;

    let (status, body) = app.get_authed("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn forgot_password_does_not_reveal_accounts() {
    let app = spawn_app().await;
    let practice_id = app.practice("riverside", None).await;
    app.user(practice_id, "ada@riverside.example", UserRole::Doctor)
        .await;

    let known = app
        .post_json(
            "/api/auth/forgot-password",
            json!({ "email": "ada@riverside.example" }),
        )
        .await;
    let unknown = app
        .post_json(
            "/api/auth/forgot-password",
            json!({ "email": "ghost@riverside.example" }),
        )
        .await;

    assert_eq!(known.0, StatusCode::OK);
    assert_eq!(known, unknown);
    assert_eq!(known.1["message"], FORGOT_PASSWORD_MESSAGE);
}

#[tokio::test]
async fn reset_password_with_bad_token_is_bad_request() {
    let app = spawn_app().await;
    let (status, body) = app
        .post_json(
            "/api/auth/reset-password",
            json!({ "token": "bogus", "password": "long-enough-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}
