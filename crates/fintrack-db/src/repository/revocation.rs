//! Durable [`RevocationRegistry`] backed by SurrealDB.
//!
//! Tokens are stored by SHA-256 digest; the record id is the digest,
//! so revoking twice is a no-op.

use chrono::Utc;
use fintrack_core::error::FintrackResult;
use fintrack_core::repository::RevocationRegistry;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use surrealdb::{Connection, Surreal};

use crate::error::DbError;

#[derive(Debug, Deserialize)]
struct CountRow {
    total: u64,
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[derive(Clone)]
pub struct SurrealRevocationRegistry<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRevocationRegistry<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RevocationRegistry for SurrealRevocationRegistry<C> {
    async fn revoke(&self, token: &str) -> FintrackResult<()> {
        self.db
            .query(
                "UPSERT type::thing('revoked_token', $digest) \
                 SET revoked_at = $now RETURN NONE",
            )
            .bind(("digest", digest(token)))
            .bind(("now", Utc::now().timestamp()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("revoked_token", e))?;

        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> FintrackResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM type::thing('revoked_token', $digest) GROUP ALL",
            )
            .bind(("digest", digest(token)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().is_some_and(|r| r.total > 0))
    }
}
