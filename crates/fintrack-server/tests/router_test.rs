//! End-to-end router tests against an embedded SurrealDB.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use fintrack_auth::config::AuthConfig;
use fintrack_auth::mailer::{MailerError, OutboundMailer};
use fintrack_db::{DbConfig, DbManager};
use fintrack_server::config::RevocationStore;
use fintrack_server::{AppState, router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tower::ServiceExt;

#[derive(Default)]
struct RecordingMailer {
    bodies: Mutex<Vec<String>>,
}

impl RecordingMailer {
    fn last(&self) -> String {
        self.bodies.lock().last().cloned().expect("no mail sent")
    }

    fn last_code(&self) -> String {
        let body = self.last();
        let (_, rest) = body.split_once("code is: ").expect("not an OTP mail");
        rest.chars().take(6).collect()
    }

    fn last_link_token(&self) -> String {
        let body = self.last();
        let (_, rest) = body.split_once("token=").expect("not a link mail");
        rest.split_whitespace().next().unwrap_or_default().to_string()
    }
}

impl OutboundMailer for RecordingMailer {
    fn deliver(&self, _to: &str, _subject: &str, body: String) -> Result<(), MailerError> {
        self.bodies.lock().push(body);
        Ok(())
    }
}

fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "0123456789abcdef0123456789abcdef".into(),
        ..AuthConfig::default()
    }
}

async fn app_with(store: RevocationStore, config: AuthConfig) -> (Router, Arc<RecordingMailer>) {
    let db = DbManager::connect(&DbConfig::default()).await.unwrap();
    fintrack_db::run_migrations(db.client()).await.unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::new(db.client().clone(), config, mailer.clone(), store).unwrap();
    (router(state), mailer)
}

async fn app(store: RevocationStore) -> (Router, Arc<RecordingMailer>) {
    app_with(store, test_config()).await
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_with_token(uri: &str, token: &str, body: Body) -> Request<Body> {
    Request::post(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

/// Sign up and verify `ann@x.com` with password `secret`.
async fn verified_account(app: &Router, mailer: &RecordingMailer) {
    let (status, _) = send(
        app,
        post_json(
            "/api/auth/signup",
            json!({"name": "Ann", "email": "ann@x.com", "password": "secret"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/auth/verify-email?token={}", mailer.last_link_token());
    let (status, body) = send(app, get_with_token(&uri, None)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

/// Password login; returns the provisional token.
async fn login(app: &Router) -> String {
    let (status, body) = send(
        app,
        post_json(
            "/api/auth/login",
            json!({"email": "ann@x.com", "password": "secret"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let login: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(login["verified"], json!(false));
    assert_eq!(login["roles"], json!(["ROLE_USER"]));
    login["token"].as_str().unwrap().to_string()
}

/// Redeem the most recently mailed code; returns the verified token.
async fn verify_otp(app: &Router, mailer: &RecordingMailer) -> String {
    let (status, body) = send(
        app,
        post_json(
            "/api/auth/verify-otp",
            json!({"email": "ann@x.com", "otp": mailer.last_code()}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let verified: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(verified["verified"], json!(true));
    verified["token"].as_str().unwrap().to_string()
}

/// Signup, verify and log in; returns the OTP-verified token.
async fn logged_in(app: &Router, mailer: &RecordingMailer) -> String {
    verified_account(app, mailer).await;
    login(app).await;
    verify_otp(app, mailer).await
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = app(RevocationStore::Memory).await;
    let (status, body) = send(&app, get_with_token("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn full_session_lifecycle() {
    for store in [RevocationStore::Memory, RevocationStore::Database] {
        let (app, mailer) = app(store).await;
        let token = logged_in(&app, &mailer).await;

        let (status, body) = send(&app, get_with_token("/api/user/me", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        let me: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(me["email"], json!("ann@x.com"));
        assert_eq!(me["step_up"], json!(true));

        let logout = post_with_token("/api/auth/logout", &token, Body::empty());
        let (status, _) = send(&app, logout).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, get_with_token("/api/user/me", Some(&token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn protected_route_statuses() {
    let (app, _) = app(RevocationStore::Memory).await;

    let (status, _) = send(&app, get_with_token("/api/user/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get_with_token("/api/user/me", Some("not.a.jwt"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn provisional_token_stays_valid_after_otp() {
    let (app, mailer) = app(RevocationStore::Memory).await;
    verified_account(&app, &mailer).await;
    let provisional = login(&app).await;
    let full = verify_otp(&app, &mailer).await;
    assert_ne!(provisional, full);

    let (status, body) = send(&app, get_with_token("/api/user/me", Some(&provisional))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let me: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(me["step_up"], json!(false));
}

#[tokio::test]
async fn required_step_up_guards_only_protected_routes() {
    let config = AuthConfig {
        require_step_up: true,
        ..test_config()
    };
    let (app, mailer) = app_with(RevocationStore::Memory, config).await;
    verified_account(&app, &mailer).await;
    let provisional = login(&app).await;

    let (status, _) = send(&app, get_with_token("/api/user/me", Some(&provisional))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let resend = post_with_token(
        "/api/auth/send-otp",
        &provisional,
        Body::from(json!({"email": "ann@x.com"}).to_string()),
    );
    let (status, body) = send(&app, resend).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let full = verify_otp(&app, &mailer).await;
    let (status, _) = send(&app, get_with_token("/api/user/me", Some(&full))).await;
    assert_eq!(status, StatusCode::OK);

    let logout = post_with_token("/api/auth/logout", &provisional, Body::empty());
    let (status, body) = send(&app, logout).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = send(&app, get_with_token("/api/user/me", Some(&provisional))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_bearer_token_is_forbidden() {
    let (app, _) = app(RevocationStore::Memory).await;
    let req = Request::get("/api/user/me")
        .header(AUTHORIZATION, "Bearer ")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_errors_are_bad_request() {
    let (app, _) = app(RevocationStore::Memory).await;
    send(
        &app,
        post_json(
            "/api/auth/signup",
            json!({"name": "Ann", "email": "ann@x.com", "password": "secret"}),
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            json!({"email": "ann@x.com", "password": "secret"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Please verify your email before logging in.");

    let (status, _) = send(
        &app,
        post_json(
            "/api/auth/signup",
            json!({"name": "Ann", "email": "ann@x.com", "password": "secret"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_without_token_is_bad_request() {
    let (app, _) = app(RevocationStore::Memory).await;
    let req = Request::post("/api/auth/logout").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid or missing token");
}

#[tokio::test]
async fn reset_requests_do_not_reveal_accounts() {
    let (app, _) = app(RevocationStore::Memory).await;

    let req = Request::post("/api/auth/password-reset-request")
        .body(Body::from("ghost@x.com"))
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        post_json("/api/auth/forgot-password", json!({"email": "ghost@x.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn password_reset_link_round_trip() {
    let (app, mailer) = app(RevocationStore::Memory).await;
    logged_in(&app, &mailer).await;

    let req = Request::post("/api/auth/password-reset-request")
        .body(Body::from("\"ann@x.com\""))
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/auth/password-reset?token={}", mailer.last_link_token());
    let req = Request::post(uri.as_str())
        .body(Body::from("newpw"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let req = Request::post(uri.as_str())
        .body(Body::from("again"))
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json(
            "/api/auth/login",
            json!({"email": "ann@x.com", "password": "newpw"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn otp_reset_round_trip() {
    let (app, mailer) = app(RevocationStore::Memory).await;
    logged_in(&app, &mailer).await;

    let (status, _) = send(
        &app,
        post_json("/api/auth/forgot-password", json!({"email": "ann@x.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/reset-password-with-otp",
            json!({
                "email": "ann@x.com",
                "otp": mailer.last_code(),
                "newPassword": "newpw",
                "confirmPassword": "newpw",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}
