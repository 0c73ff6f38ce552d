//! Integration tests for the repository implementations using
//! in-memory SurrealDB.

use chrono::{Duration, Utc};
use fintrack_core::error::FintrackError;
use fintrack_core::models::challenge::{ChallengePurpose, CreateChallenge};
use fintrack_core::models::principal::CreatePrincipal;
use fintrack_core::models::recovery::CreateRecoveryToken;
use fintrack_core::repository::{
    ChallengeRepository, PrincipalRepository, RecoveryTokenRepository, RevocationRegistry,
    RoleRepository,
};
use fintrack_db::repository::{
    SurrealChallengeRepository, SurrealPrincipalRepository, SurrealRecoveryTokenRepository,
    SurrealRevocationRegistry, SurrealRoleRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    fintrack_db::run_migrations(&db).await.unwrap();
    db
}

fn new_principal(email: &str) -> CreatePrincipal {
    CreatePrincipal {
        name: "Ann".into(),
        email: email.into(),
        password_hash: "$argon2id$placeholder".into(),
        roles: vec!["ROLE_USER".into()],
        verification_token_hash: Some("vhash".into()),
        verification_expires_at: Some(Utc::now() + Duration::hours(24)),
    }
}

// -----------------------------------------------------------------------
// Principals
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_principal() {
    let repo = SurrealPrincipalRepository::new(setup().await);

    let p = repo.create(new_principal("ann@x.com")).await.unwrap();
    assert_eq!(p.email, "ann@x.com");
    assert!(!p.email_verified);
    assert_eq!(p.currency, "USD");
    assert_eq!(p.roles, vec!["ROLE_USER".to_string()]);

    let by_id = repo.get_by_id(p.id).await.unwrap();
    assert_eq!(by_id.email, p.email);

    let by_email = repo.get_by_email("ann@x.com").await.unwrap();
    assert_eq!(by_email.id, p.id);

    let by_token = repo.get_by_verification_token_hash("vhash").await.unwrap();
    assert_eq!(by_token.id, p.id);
}

#[tokio::test]
async fn missing_principal_is_not_found() {
    let repo = SurrealPrincipalRepository::new(setup().await);

    let err = repo.get_by_email("ghost@x.com").await.unwrap_err();
    assert!(err.is_not_found());
    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn exists_by_email_reports_registration() {
    let repo = SurrealPrincipalRepository::new(setup().await);

    assert!(!repo.exists_by_email("ann@x.com").await.unwrap());
    repo.create(new_principal("ann@x.com")).await.unwrap();
    assert!(repo.exists_by_email("ann@x.com").await.unwrap());
}

#[tokio::test]
async fn duplicate_email_is_already_exists() {
    let repo = SurrealPrincipalRepository::new(setup().await);

    repo.create(new_principal("ann@x.com")).await.unwrap();
    let err = repo.create(new_principal("ann@x.com")).await.unwrap_err();
    assert!(matches!(err, FintrackError::AlreadyExists { .. }), "{err:?}");
}

#[tokio::test]
async fn save_persists_mutations() {
    let repo = SurrealPrincipalRepository::new(setup().await);

    let mut p = repo.create(new_principal("ann@x.com")).await.unwrap();
    p.mark_email_verified();
    p.password_hash = "$argon2id$other".into();
    let saved = repo.save(&p).await.unwrap();

    assert!(saved.email_verified);
    assert_eq!(saved.verification_token_hash, None);
    assert_eq!(saved.verification_expires_at, None);
    assert_eq!(saved.password_hash, "$argon2id$other");
    assert!(
        repo.get_by_verification_token_hash("vhash")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

// -----------------------------------------------------------------------
// Roles
// -----------------------------------------------------------------------

#[tokio::test]
async fn seeded_roles_are_resolvable() {
    let repo = SurrealRoleRepository::new(setup().await);

    assert_eq!(repo.get_by_name("ROLE_USER").await.unwrap().name, "ROLE_USER");
    assert_eq!(repo.get_by_name("ROLE_ADMIN").await.unwrap().name, "ROLE_ADMIN");
    assert!(repo.get_by_name("ROOT").await.unwrap_err().is_not_found());
}

// -----------------------------------------------------------------------
// Challenges
// -----------------------------------------------------------------------

/// Code hash currently stored for `owner`, read straight from the table.
async fn stored_code_hash(db: &Surreal<Db>, owner: Uuid) -> Option<String> {
    let mut result = db
        .query("SELECT VALUE code_hash FROM type::thing('challenge', $owner)")
        .bind(("owner", owner.to_string()))
        .await
        .unwrap();
    let hashes: Vec<String> = result.take(0).unwrap();
    hashes.into_iter().next()
}

fn challenge(owner_id: Uuid, code_hash: &str, purpose: ChallengePurpose) -> CreateChallenge {
    CreateChallenge {
        owner_id,
        code_hash: code_hash.into(),
        purpose,
        expires_at: Utc::now() + Duration::minutes(5),
    }
}

#[tokio::test]
async fn upsert_replaces_previous_challenge() {
    let db = setup().await;
    let repo = SurrealChallengeRepository::new(db.clone());
    let owner = Uuid::new_v4();

    let first = repo
        .upsert_for_owner(challenge(owner, "h1", ChallengePurpose::Login))
        .await
        .unwrap();
    let second = repo
        .upsert_for_owner(challenge(owner, "h2", ChallengePurpose::Login))
        .await
        .unwrap();
    assert_ne!(first.id, second.id);

    assert_eq!(stored_code_hash(&db, owner).await.as_deref(), Some("h2"));

    assert!(
        repo.take_matching(owner, "h1", ChallengePurpose::Login)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn take_matching_consumes_once() {
    let db = setup().await;
    let repo = SurrealChallengeRepository::new(db.clone());
    let owner = Uuid::new_v4();
    repo.upsert_for_owner(challenge(owner, "h", ChallengePurpose::Login))
        .await
        .unwrap();

    let taken = repo
        .take_matching(owner, "h", ChallengePurpose::Login)
        .await
        .unwrap();
    assert!(taken.is_some());
    assert!(
        repo.take_matching(owner, "h", ChallengePurpose::Login)
            .await
            .unwrap()
            .is_none()
    );
    assert!(stored_code_hash(&db, owner).await.is_none());
}

#[tokio::test]
async fn mismatch_leaves_challenge_in_place() {
    let db = setup().await;
    let repo = SurrealChallengeRepository::new(db.clone());
    let owner = Uuid::new_v4();
    repo.upsert_for_owner(challenge(owner, "h", ChallengePurpose::PasswordReset))
        .await
        .unwrap();

    assert!(
        repo.take_matching(owner, "wrong", ChallengePurpose::PasswordReset)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        repo.take_matching(owner, "h", ChallengePurpose::Login)
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(stored_code_hash(&db, owner).await.as_deref(), Some("h"));

    let taken = repo
        .take_matching(owner, "h", ChallengePurpose::PasswordReset)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(taken.purpose, ChallengePurpose::PasswordReset);
}

#[derive(Debug, serde::Deserialize)]
struct OwnerRow {
    owner_id: String,
}

#[tokio::test]
async fn concurrent_upserts_leave_one_challenge() {
    let db = setup().await;
    let repo = SurrealChallengeRepository::new(db.clone());
    let owner = Uuid::new_v4();

    let mut handles = Vec::new();
    for i in 0..8 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.upsert_for_owner(challenge(owner, &format!("h{i}"), ChallengePurpose::Login))
                .await
        }));
    }
    let mut issued = 0;
    for h in handles {
        // A losing writer may see a transaction conflict.
        if h.await.unwrap().is_ok() {
            issued += 1;
        }
    }
    assert!(issued >= 1);

    let mut result = db.query("SELECT owner_id FROM challenge").await.unwrap();
    let rows: Vec<OwnerRow> = result.take(0).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].owner_id, owner.to_string());
}

// -----------------------------------------------------------------------
// Recovery tokens
// -----------------------------------------------------------------------

#[tokio::test]
async fn recovery_token_is_single_use_and_replaced_per_owner() {
    let db = setup().await;
    let repo = SurrealRecoveryTokenRepository::new(db.clone());
    let owner = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::hours(1);

    repo.upsert_for_owner(CreateRecoveryToken {
        owner_id: owner,
        token_hash: "t1".into(),
        expires_at,
    })
    .await
    .unwrap();
    repo.upsert_for_owner(CreateRecoveryToken {
        owner_id: owner,
        token_hash: "t2".into(),
        expires_at,
    })
    .await
    .unwrap();

    assert!(repo.take_by_hash("t1").await.unwrap().is_none());
    let mut result = db
        .query("SELECT VALUE token_hash FROM recovery_token")
        .await
        .unwrap();
    let hashes: Vec<String> = result.take(0).unwrap();
    assert_eq!(hashes, vec!["t2".to_string()]);

    let taken = repo.take_by_hash("t2").await.unwrap().unwrap();
    assert_eq!(taken.owner_id, owner);
    assert_eq!(taken.expires_at.timestamp(), expires_at.timestamp());
    assert!(repo.take_by_hash("t2").await.unwrap().is_none());
}

// -----------------------------------------------------------------------
// Revocation
// -----------------------------------------------------------------------

#[tokio::test]
async fn revocation_is_durable_and_exact() {
    let db = setup().await;
    let registry = SurrealRevocationRegistry::new(db.clone());

    assert!(!registry.is_revoked("a.b.c").await.unwrap());
    registry.revoke("a.b.c").await.unwrap();
    registry.revoke("a.b.c").await.unwrap();
    assert!(registry.is_revoked("a.b.c").await.unwrap());
    assert!(!registry.is_revoked("a.b.c ").await.unwrap());

    // A second handle on the same database sees the same state.
    let other = SurrealRevocationRegistry::new(db);
    assert!(other.is_revoked("a.b.c").await.unwrap());
}
