//! Outbound mail contract and its implementations.
//!
//! Delivery is fire-and-forget from the caller's point of view: the auth
//! flows log a failed delivery and carry on, so the response never
//! reveals whether an address exists.

use std::time::Duration;

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Out-of-band delivery of verification links, OTP codes and reset links.
///
/// Implementors provide [`deliver`](OutboundMailer::deliver); the
/// message templates are shared.
pub trait OutboundMailer: Send + Sync {
    fn deliver(&self, to: &str, subject: &str, body: String) -> Result<(), MailerError>;

    fn send_verification(&self, email: &str, link: &str) -> Result<(), MailerError> {
        self.deliver(
            email,
            "Verify Your Email - Expense Tracker",
            format!(
                "Welcome to Expense Tracker!\n\n\
                 Please verify your email by opening the link below:\n{link}\n\n\
                 This link will expire in 24 hours."
            ),
        )
    }

    fn send_otp(&self, email: &str, code: &str) -> Result<(), MailerError> {
        self.deliver(
            email,
            "Your Verification Code",
            format!(
                "Your verification code is: {code}\n\n\
                 If you didn't request this code, please ignore this email."
            ),
        )
    }

    fn send_password_reset(&self, email: &str, link: &str) -> Result<(), MailerError> {
        self.deliver(
            email,
            "Password Reset Request",
            format!("To reset your password, open the link: {link}"),
        )
    }
}

/// Swallow a delivery failure after logging it.
pub(crate) fn log_failure(kind: &'static str, to: &str, result: Result<(), MailerError>) {
    if let Err(e) = result {
        warn!(kind, to_email = %to, error = %e, "outbound mail failed");
    }
}

/// Development mailer that writes messages to the log instead of
/// sending them. Message bodies contain live secrets; never use it in
/// production.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl OutboundMailer for LogMailer {
    fn deliver(&self, to: &str, subject: &str, body: String) -> Result<(), MailerError> {
        info!(to_email = %to, subject = %subject, body = %body, "outbound mail stub");
        Ok(())
    }
}

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    /// Submission port, STARTTLS (default 587).
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// `From:` header, e.g. `Expense Tracker <no-reply@example.com>`.
    pub from: String,
}

/// SMTP delivery over STARTTLS.
///
/// Each message is sent on tokio's blocking pool when a runtime is
/// available, so `deliver` returns as soon as the message is built.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailerError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| MailerError::InvalidAddress(format!("{}: {e}", config.from)))?;

        let mut builder = SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| MailerError::Transport(e.to_string()))?
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

impl OutboundMailer for SmtpMailer {
    fn deliver(&self, to: &str, subject: &str, body: String) -> Result<(), MailerError> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|e| MailerError::InvalidAddress(format!("{to}: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| MailerError::Build(e.to_string()))?;

        let transport = self.transport.clone();
        let to = to.to_owned();
        let send = move || match transport.send(&message) {
            Ok(_) => debug!(to_email = %to, "mail delivered"),
            Err(e) => warn!(to_email = %to, error = %e, "mail delivery failed"),
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(send);
            }
            Err(_) => send(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Capture {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    impl OutboundMailer for Capture {
        fn deliver(&self, to: &str, subject: &str, body: String) -> Result<(), MailerError> {
            self.sent.lock().push((to.into(), subject.into(), body));
            Ok(())
        }
    }

    #[test]
    fn templates_embed_payload() {
        let capture = Capture::default();
        capture.send_otp("ann@x.com", "042137").unwrap();
        capture
            .send_verification("ann@x.com", "http://app/verify-email?token=t")
            .unwrap();
        capture
            .send_password_reset("ann@x.com", "http://app/reset-password?token=r")
            .unwrap();

        let sent = capture.sent.lock();
        assert_eq!(sent.len(), 3);
        assert!(sent[0].2.contains("042137"));
        assert!(sent[1].2.contains("verify-email?token=t"));
        assert!(sent[2].2.contains("reset-password?token=r"));
        assert!(sent.iter().all(|(to, _, _)| to == "ann@x.com"));
    }

    #[test]
    fn smtp_mailer_rejects_bad_from() {
        let config = SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: None,
            password: None,
            from: "not an address".into(),
        };
        assert!(matches!(
            SmtpMailer::new(&config),
            Err(MailerError::InvalidAddress(_))
        ));
    }
}
