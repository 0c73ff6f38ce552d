//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Implementations live in
//! `fintrack-db` (SurrealDB) and, for revocation, `fintrack-auth`
//! (process-local memory).

use uuid::Uuid;

use crate::error::FintrackResult;
use crate::models::{
    challenge::{ChallengePurpose, CreateChallenge, StepUpChallenge},
    principal::{CreatePrincipal, Principal},
    recovery::{CreateRecoveryToken, RecoveryToken},
    role::Role,
};

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub trait PrincipalRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePrincipal,
    ) -> impl Future<Output = FintrackResult<Principal>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = FintrackResult<Principal>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = FintrackResult<Principal>> + Send;
    fn get_by_verification_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = FintrackResult<Principal>> + Send;
    fn exists_by_email(&self, email: &str) -> impl Future<Output = FintrackResult<bool>> + Send;
    /// Persist every mutable field of an existing principal.
    fn save(&self, principal: &Principal)
    -> impl Future<Output = FintrackResult<Principal>> + Send;
}

pub trait RoleRepository: Send + Sync {
    fn get_by_name(&self, name: &str) -> impl Future<Output = FintrackResult<Role>> + Send;
}

// ---------------------------------------------------------------------------
// One-shot credentials
// ---------------------------------------------------------------------------

/// Storage for step-up challenges, at most one per owner.
pub trait ChallengeRepository: Send + Sync {
    /// Replace the owner's challenge (if any) with a new one in a single
    /// atomic write.
    fn upsert_for_owner(
        &self,
        input: CreateChallenge,
    ) -> impl Future<Output = FintrackResult<StepUpChallenge>> + Send;

    /// Atomically delete and return the owner's challenge if both the
    /// code hash and purpose match. Returns `None` when nothing matched;
    /// a non-matching challenge is left in place.
    fn take_matching(
        &self,
        owner_id: Uuid,
        code_hash: &str,
        purpose: ChallengePurpose,
    ) -> impl Future<Output = FintrackResult<Option<StepUpChallenge>>> + Send;
}

/// Storage for password-reset link tokens, at most one per owner.
pub trait RecoveryTokenRepository: Send + Sync {
    fn upsert_for_owner(
        &self,
        input: CreateRecoveryToken,
    ) -> impl Future<Output = FintrackResult<RecoveryToken>> + Send;

    /// Atomically delete and return the token with this hash.
    fn take_by_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = FintrackResult<Option<RecoveryToken>>> + Send;
}

// ---------------------------------------------------------------------------
// Bearer token revocation
// ---------------------------------------------------------------------------

/// Record of bearer tokens invalidated before their natural expiry.
///
/// Implementations own their synchronization: a `revoke` that has
/// returned must be observed by every later `is_revoked` from any task
/// or thread. Tokens are compared byte-for-byte, without normalization.
pub trait RevocationRegistry: Send + Sync {
    /// Idempotent.
    fn revoke(&self, token: &str) -> impl Future<Output = FintrackResult<()>> + Send;
    fn is_revoked(&self, token: &str) -> impl Future<Output = FintrackResult<bool>> + Send;
}
