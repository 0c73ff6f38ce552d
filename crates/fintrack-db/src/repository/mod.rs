//! SurrealDB repository implementations.

mod challenge;
mod principal;
mod recovery;
mod revocation;
mod role;

pub use challenge::SurrealChallengeRepository;
pub use principal::SurrealPrincipalRepository;
pub use recovery::SurrealRecoveryTokenRepository;
pub use revocation::SurrealRevocationRegistry;
pub use role::SurrealRoleRepository;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbError;

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| DbError::Decode(format!("timestamp out of range: {secs}")))
}
