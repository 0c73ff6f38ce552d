//! SurrealDB implementation of [`PrincipalRepository`].
//!
//! Passwords arrive already hashed; this layer never sees plaintext.

use chrono::Utc;
use fintrack_core::error::FintrackResult;
use fintrack_core::models::principal::{CreatePrincipal, DEFAULT_CURRENCY, Principal};
use fintrack_core::repository::PrincipalRepository;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};
use uuid::Uuid;

use super::{from_unix, parse_uuid};
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, Deserialize)]
struct PrincipalRow {
    record_id: String,
    name: String,
    email: String,
    password_hash: String,
    email_verified: bool,
    verification_token_hash: Option<String>,
    verification_expires_at: Option<i64>,
    roles: Vec<String>,
    currency: String,
    created_at: i64,
    updated_at: i64,
}

impl PrincipalRow {
    fn try_into_principal(self) -> Result<Principal, DbError> {
        Ok(Principal {
            id: parse_uuid(&self.record_id, "principal")?,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            email_verified: self.email_verified,
            verification_token_hash: self.verification_token_hash,
            verification_expires_at: self.verification_expires_at.map(from_unix).transpose()?,
            roles: self.roles,
            currency: self.currency,
            created_at: from_unix(self.created_at)?,
            updated_at: from_unix(self.updated_at)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Principal repository.
#[derive(Clone)]
pub struct SurrealPrincipalRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPrincipalRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select_one(
        &self,
        filter: &str,
        key: &'static str,
        value: String,
    ) -> FintrackResult<Principal> {
        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM principal WHERE {filter} LIMIT 1"
            ))
            .bind((key, value.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: format!("{key}={value}"),
        })?;

        Ok(row.try_into_principal()?)
    }
}

impl<C: Connection> PrincipalRepository for SurrealPrincipalRepository<C> {
    async fn create(&self, input: CreatePrincipal) -> FintrackResult<Principal> {
        let id = Uuid::new_v4();
        let now = Utc::now().timestamp();

        self.db
            .query(
                "CREATE type::thing('principal', $id) SET \
                 name = $name, email = $email, \
                 password_hash = $password_hash, \
                 email_verified = false, \
                 verification_token_hash = $verification_token_hash, \
                 verification_expires_at = $verification_expires_at, \
                 roles = $roles, currency = $currency, \
                 created_at = $now, updated_at = $now \
                 RETURN NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("verification_token_hash", input.verification_token_hash))
            .bind((
                "verification_expires_at",
                input.verification_expires_at.map(|t| t.timestamp()),
            ))
            .bind(("roles", input.roles))
            .bind(("currency", DEFAULT_CURRENCY))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("principal", e))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> FintrackResult<Principal> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::thing('principal', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id_str,
        })?;

        Ok(row.try_into_principal()?)
    }

    async fn get_by_email(&self, email: &str) -> FintrackResult<Principal> {
        self.select_one("email = $email", "email", email.to_string())
            .await
    }

    async fn get_by_verification_token_hash(&self, token_hash: &str) -> FintrackResult<Principal> {
        self.select_one(
            "verification_token_hash = $token_hash",
            "token_hash",
            token_hash.to_string(),
        )
        .await
    }

    async fn exists_by_email(&self, email: &str) -> FintrackResult<bool> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM principal WHERE email = $email GROUP ALL")
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().is_some_and(|r| r.total > 0))
    }

    async fn save(&self, principal: &Principal) -> FintrackResult<Principal> {
        self.db
            .query(
                "UPDATE type::thing('principal', $id) SET \
                 name = $name, email = $email, \
                 password_hash = $password_hash, \
                 email_verified = $email_verified, \
                 verification_token_hash = $verification_token_hash, \
                 verification_expires_at = $verification_expires_at, \
                 roles = $roles, currency = $currency, \
                 updated_at = $now \
                 RETURN NONE",
            )
            .bind(("id", principal.id.to_string()))
            .bind(("name", principal.name.clone()))
            .bind(("email", principal.email.clone()))
            .bind(("password_hash", principal.password_hash.clone()))
            .bind(("email_verified", principal.email_verified))
            .bind((
                "verification_token_hash",
                principal.verification_token_hash.clone(),
            ))
            .bind((
                "verification_expires_at",
                principal.verification_expires_at.map(|t| t.timestamp()),
            ))
            .bind(("roles", principal.roles.clone()))
            .bind(("currency", principal.currency.clone()))
            .bind(("now", Utc::now().timestamp()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("principal", e))?;

        self.get_by_id(principal.id).await
    }
}
