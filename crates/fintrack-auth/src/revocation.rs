//! Process-local bearer token revocation.
//!
//! Entries live for the lifetime of the process and are never pruned,
//! so a revoked token stays rejected until restart. This only holds for
//! a single instance; deployments running more than one instance must
//! use a shared [`RevocationRegistry`] such as the SurrealDB-backed one
//! in `fintrack-db`.

use std::collections::HashSet;
use std::sync::Arc;

use fintrack_core::error::FintrackResult;
use fintrack_core::repository::RevocationRegistry;
use parking_lot::RwLock;

/// In-memory revocation set, cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRevocationRegistry {
    revoked: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryRevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn revoke_sync(&self, token: &str) {
        self.revoked.write().insert(token.to_owned());
    }

    fn is_revoked_sync(&self, token: &str) -> bool {
        self.revoked.read().contains(token)
    }
}

impl RevocationRegistry for InMemoryRevocationRegistry {
    async fn revoke(&self, token: &str) -> FintrackResult<()> {
        self.revoke_sync(token);
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> FintrackResult<bool> {
        Ok(self.is_revoked_sync(token))
    }
}
