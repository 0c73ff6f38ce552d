//! SurrealDB implementation of [`ChallengeRepository`].
//!
//! The record id is the owner's id, so an upsert replaces the previous
//! challenge in one statement and concurrent issuers leave exactly one
//! row behind. Redemption is a conditional `DELETE ... RETURN BEFORE`:
//! of several concurrent redeemers at most one gets the row back.

use chrono::Utc;
use fintrack_core::error::FintrackResult;
use fintrack_core::models::challenge::{ChallengePurpose, CreateChallenge, StepUpChallenge};
use fintrack_core::repository::ChallengeRepository;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};
use uuid::Uuid;

use super::{from_unix, parse_uuid};
use crate::error::DbError;

#[derive(Debug, Deserialize)]
struct ChallengeRow {
    challenge_id: String,
    owner_id: String,
    code_hash: String,
    purpose: String,
    expires_at: i64,
    created_at: i64,
}

impl ChallengeRow {
    fn try_into_challenge(self) -> Result<StepUpChallenge, DbError> {
        let purpose = ChallengePurpose::parse(&self.purpose)
            .ok_or_else(|| DbError::Decode(format!("unknown purpose: {}", self.purpose)))?;
        Ok(StepUpChallenge {
            id: parse_uuid(&self.challenge_id, "challenge")?,
            owner_id: parse_uuid(&self.owner_id, "owner")?,
            code_hash: self.code_hash,
            purpose,
            expires_at: from_unix(self.expires_at)?,
            created_at: from_unix(self.created_at)?,
        })
    }
}

fn first(rows: Vec<ChallengeRow>) -> Result<Option<StepUpChallenge>, DbError> {
    rows.into_iter()
        .next()
        .map(ChallengeRow::try_into_challenge)
        .transpose()
}

#[derive(Clone)]
pub struct SurrealChallengeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealChallengeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ChallengeRepository for SurrealChallengeRepository<C> {
    async fn upsert_for_owner(&self, input: CreateChallenge) -> FintrackResult<StepUpChallenge> {
        let challenge = StepUpChallenge {
            id: Uuid::new_v4(),
            owner_id: input.owner_id,
            code_hash: input.code_hash,
            purpose: input.purpose,
            expires_at: input.expires_at,
            created_at: Utc::now(),
        };

        self.db
            .query(
                "UPSERT type::thing('challenge', $owner_id) CONTENT { \
                 challenge_id: $challenge_id, owner_id: $owner_id, \
                 code_hash: $code_hash, purpose: $purpose, \
                 expires_at: $expires_at, created_at: $created_at \
                 } RETURN NONE",
            )
            .bind(("owner_id", challenge.owner_id.to_string()))
            .bind(("challenge_id", challenge.id.to_string()))
            .bind(("code_hash", challenge.code_hash.clone()))
            .bind(("purpose", challenge.purpose.as_str()))
            .bind(("expires_at", challenge.expires_at.timestamp()))
            .bind(("created_at", challenge.created_at.timestamp()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("challenge", e))?;

        Ok(challenge)
    }

    async fn take_matching(
        &self,
        owner_id: Uuid,
        code_hash: &str,
        purpose: ChallengePurpose,
    ) -> FintrackResult<Option<StepUpChallenge>> {
        let mut result = self
            .db
            .query(
                "DELETE type::thing('challenge', $owner_id) \
                 WHERE code_hash = $code_hash AND purpose = $purpose \
                 RETURN BEFORE",
            )
            .bind(("owner_id", owner_id.to_string()))
            .bind(("code_hash", code_hash.to_string()))
            .bind(("purpose", purpose.as_str()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChallengeRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows)?)
    }
}
