//! fintrack server: axum routes over the session service.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ServerArgs;
pub use routes::router;
pub use state::AppState;
