//! fintrack server: application entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fintrack_auth::mailer::{LogMailer, OutboundMailer, SmtpMailer};
use fintrack_db::DbManager;
use fintrack_server::{AppState, ServerArgs, router};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fintrack=info".parse()?))
        .json()
        .init();

    let args = ServerArgs::parse();
    info!("Starting fintrack server...");

    let db = DbManager::connect(&args.db_config())
        .await
        .context("failed to connect to SurrealDB")?;
    fintrack_db::run_migrations(db.client())
        .await
        .context("failed to apply migrations")?;

    let mailer: Arc<dyn OutboundMailer> = match args.smtp_config() {
        Some(smtp) => Arc::new(SmtpMailer::new(&smtp).context("invalid SMTP configuration")?),
        None => {
            warn!("no SMTP host configured; outbound mail is written to the log");
            Arc::new(LogMailer)
        }
    };

    let state = AppState::new(
        db.client().clone(),
        args.auth_config(),
        mailer,
        args.revocation_store,
    )
    .context("invalid auth configuration")?;

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(addr = %args.listen, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("fintrack server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
