//! Route table.

mod auth;
mod user;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::middleware::authenticate;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let auth = Router::new()
        .route("/signup", post(auth::signup))
        .route("/verify-email", get(auth::verify_email))
        .route("/login", post(auth::login))
        .route("/send-otp", post(auth::send_otp))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/logout", post(auth::logout))
        .route("/password-reset-request", post(auth::password_reset_request))
        .route("/password-reset", post(auth::password_reset))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password-with-otp", post(auth::reset_password_with_otp));

    let user = Router::new().route("/me", get(user::me));

    Router::new()
        .nest("/api/auth", auth)
        .nest("/api/user", user)
        .route("/health", get(health))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            authenticate,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
