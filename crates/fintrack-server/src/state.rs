//! Shared application state.

use std::sync::Arc;

use fintrack_auth::config::AuthConfig;
use fintrack_auth::error::AuthError;
use fintrack_auth::gate::AuthenticationGate;
use fintrack_auth::mailer::OutboundMailer;
use fintrack_auth::revocation::InMemoryRevocationRegistry;
use fintrack_auth::service::SessionService;
use fintrack_core::error::FintrackResult;
use fintrack_core::repository::RevocationRegistry;
use fintrack_db::repository::{
    SurrealChallengeRepository, SurrealPrincipalRepository, SurrealRecoveryTokenRepository,
    SurrealRevocationRegistry, SurrealRoleRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

use crate::config::RevocationStore;

/// Revocation registry selected at startup.
#[derive(Clone)]
pub enum Revocations {
    Memory(InMemoryRevocationRegistry),
    Database(SurrealRevocationRegistry<Any>),
}

impl Revocations {
    pub fn new(store: RevocationStore, db: &Surreal<Any>) -> Self {
        match store {
            RevocationStore::Memory => Self::Memory(InMemoryRevocationRegistry::new()),
            RevocationStore::Database => Self::Database(SurrealRevocationRegistry::new(db.clone())),
        }
    }
}

impl RevocationRegistry for Revocations {
    async fn revoke(&self, token: &str) -> FintrackResult<()> {
        match self {
            Self::Memory(r) => r.revoke(token).await,
            Self::Database(r) => r.revoke(token).await,
        }
    }

    async fn is_revoked(&self, token: &str) -> FintrackResult<bool> {
        match self {
            Self::Memory(r) => r.is_revoked(token).await,
            Self::Database(r) => r.is_revoked(token).await,
        }
    }
}

pub type Service = SessionService<
    SurrealPrincipalRepository<Any>,
    SurrealRoleRepository<Any>,
    SurrealChallengeRepository<Any>,
    SurrealRecoveryTokenRepository<Any>,
    Revocations,
>;

pub type Gate = AuthenticationGate<SurrealPrincipalRepository<Any>, Revocations>;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Service>,
    pub gate: Arc<Gate>,
}

impl AppState {
    /// Wire the session service and request gate over one database.
    pub fn new(
        db: Surreal<Any>,
        config: AuthConfig,
        mailer: Arc<dyn OutboundMailer>,
        revocation_store: RevocationStore,
    ) -> Result<Self, AuthError> {
        let service = SessionService::new(
            SurrealPrincipalRepository::new(db.clone()),
            SurrealRoleRepository::new(db.clone()),
            SurrealChallengeRepository::new(db.clone()),
            SurrealRecoveryTokenRepository::new(db.clone()),
            Revocations::new(revocation_store, &db),
            mailer,
            config,
        )?;
        let gate = service.gate();

        Ok(Self {
            service: Arc::new(service),
            gate: Arc::new(gate),
        })
    }
}
