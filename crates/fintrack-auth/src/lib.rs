//! fintrack auth: password hashing, bearer tokens, revocation, OTP
//! step-up and account recovery.

pub mod challenge;
pub mod config;
pub mod error;
pub mod gate;
pub mod mailer;
pub mod password;
pub mod recovery;
pub mod revocation;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use gate::{AuthenticationGate, GateRejection};
pub use revocation::InMemoryRevocationRegistry;
pub use service::{LoginOutput, SessionService, SignupInput};
pub use token::{SessionClaims, TokenCodec};
