//! Command-line and environment configuration.

use std::net::SocketAddr;

use clap::{Parser, ValueEnum};
use fintrack_auth::config::AuthConfig;
use fintrack_auth::mailer::SmtpConfig;
use fintrack_db::DbConfig;

/// Where revoked bearer tokens are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RevocationStore {
    /// Process memory; cleared on restart.
    Memory,
    /// The SurrealDB `revoked_token` table.
    Database,
}

#[derive(Debug, Parser)]
#[command(name = "fintrack-server", version, about = "fintrack authentication API")]
pub struct ServerArgs {
    #[arg(long, env = "FINTRACK_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    #[arg(long, env = "FINTRACK_DB_URL", default_value = "mem://")]
    pub db_url: String,

    #[arg(long, env = "FINTRACK_DB_NAMESPACE", default_value = "fintrack")]
    pub db_namespace: String,

    #[arg(long, env = "FINTRACK_DB_DATABASE", default_value = "main")]
    pub db_database: String,

    #[arg(long, env = "FINTRACK_DB_USERNAME")]
    pub db_username: Option<String>,

    #[arg(long, env = "FINTRACK_DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// HMAC secret for bearer tokens, at least 32 bytes.
    #[arg(long, env = "FINTRACK_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "FINTRACK_JWT_ISSUER", default_value = "fintrack")]
    pub jwt_issuer: String,

    #[arg(long, env = "FINTRACK_TOKEN_LIFETIME_SECS", default_value_t = 86_400)]
    pub token_lifetime_secs: u64,

    #[arg(long, env = "FINTRACK_PASSWORD_PEPPER", hide_env_values = true)]
    pub password_pepper: Option<String>,

    #[arg(long, env = "FINTRACK_MIN_PASSWORD_LENGTH", default_value_t = 1)]
    pub min_password_length: usize,

    /// Base URL of the web client, used in emailed links.
    #[arg(long, env = "FINTRACK_APP_BASE_URL", default_value = "http://localhost:5173")]
    pub app_base_url: String,

    /// Refuse provisional (pre-OTP) tokens on protected routes.
    #[arg(long, env = "FINTRACK_REQUIRE_STEP_UP")]
    pub require_step_up: bool,

    #[arg(long, env = "FINTRACK_REVOCATION_STORE", value_enum, default_value_t = RevocationStore::Memory)]
    pub revocation_store: RevocationStore,

    /// SMTP relay host. Without it, mail is written to the log.
    #[arg(long, env = "FINTRACK_SMTP_HOST")]
    pub smtp_host: Option<String>,

    #[arg(long, env = "FINTRACK_SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    #[arg(long, env = "FINTRACK_SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    #[arg(long, env = "FINTRACK_SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    #[arg(long, env = "FINTRACK_MAIL_FROM", default_value = "Expense Tracker <no-reply@localhost>")]
    pub mail_from: String,
}

impl ServerArgs {
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.jwt_secret.clone(),
            jwt_issuer: self.jwt_issuer.clone(),
            access_token_lifetime_secs: self.token_lifetime_secs,
            pepper: self.password_pepper.clone(),
            min_password_length: self.min_password_length,
            app_base_url: self.app_base_url.clone(),
            require_step_up: self.require_step_up,
            ..AuthConfig::default()
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.db_url.clone(),
            namespace: self.db_namespace.clone(),
            database: self.db_database.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
        }
    }

    pub fn smtp_config(&self) -> Option<SmtpConfig> {
        self.smtp_host.as_ref().map(|host| SmtpConfig {
            host: host.clone(),
            port: self.smtp_port,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            from: self.mail_from.clone(),
        })
    }
}
