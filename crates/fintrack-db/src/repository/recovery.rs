//! SurrealDB implementation of [`RecoveryTokenRepository`].

use chrono::Utc;
use fintrack_core::error::FintrackResult;
use fintrack_core::models::recovery::{CreateRecoveryToken, RecoveryToken};
use fintrack_core::repository::RecoveryTokenRepository;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};

use super::{from_unix, parse_uuid};
use crate::error::DbError;

#[derive(Debug, Deserialize)]
struct RecoveryRow {
    owner_id: String,
    token_hash: String,
    expires_at: i64,
    created_at: i64,
}

impl RecoveryRow {
    fn try_into_token(self) -> Result<RecoveryToken, DbError> {
        Ok(RecoveryToken {
            owner_id: parse_uuid(&self.owner_id, "owner")?,
            token_hash: self.token_hash,
            expires_at: from_unix(self.expires_at)?,
            created_at: from_unix(self.created_at)?,
        })
    }
}

fn first(rows: Vec<RecoveryRow>) -> Result<Option<RecoveryToken>, DbError> {
    rows.into_iter()
        .next()
        .map(RecoveryRow::try_into_token)
        .transpose()
}

/// Keyed by owner: requesting a new link invalidates the previous one.
#[derive(Clone)]
pub struct SurrealRecoveryTokenRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRecoveryTokenRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RecoveryTokenRepository for SurrealRecoveryTokenRepository<C> {
    async fn upsert_for_owner(&self, input: CreateRecoveryToken) -> FintrackResult<RecoveryToken> {
        let token = RecoveryToken {
            owner_id: input.owner_id,
            token_hash: input.token_hash,
            expires_at: input.expires_at,
            created_at: Utc::now(),
        };

        self.db
            .query(
                "UPSERT type::thing('recovery_token', $owner_id) CONTENT { \
                 owner_id: $owner_id, token_hash: $token_hash, \
                 expires_at: $expires_at, created_at: $created_at \
                 } RETURN NONE",
            )
            .bind(("owner_id", token.owner_id.to_string()))
            .bind(("token_hash", token.token_hash.clone()))
            .bind(("expires_at", token.expires_at.timestamp()))
            .bind(("created_at", token.created_at.timestamp()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("recovery_token", e))?;

        Ok(token)
    }

    async fn take_by_hash(&self, token_hash: &str) -> FintrackResult<Option<RecoveryToken>> {
        let mut result = self
            .db
            .query("DELETE recovery_token WHERE token_hash = $token_hash RETURN BEFORE")
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RecoveryRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows)?)
    }
}
