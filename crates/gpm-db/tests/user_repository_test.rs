//! Integration tests for the User repository using in-memory SurrealDB.

use chrono::Utc;
use gpm_core::error::GpmError;
use gpm_core::models::credential::Credential;
use gpm_core::models::practice::{CreatePractice, SubscriptionTier};
use gpm_core::models::user::{CreateUser, UpdateUser, UserRole, UserStatus};
use gpm_core::repository::{Pagination, PracticeRepository, UserRepository};
use gpm_db::repository::{SurrealPracticeRepository, SurrealUserRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

const HASHED: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$aGFzaGhhc2hoYXNoaGFzaA";

/// Spin up in-memory DB, run migrations, create a practice.
async fn setup() -> (Surreal<Db>, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    gpm_db::run_migrations(&db).await.unwrap();

    let practice = SurrealPracticeRepository::new(db.clone())
        .create(CreatePractice {
            name: "Riverside Family Practice".into(),
            slug: "riverside".into(),
            trial_ends_at: None,
            subscription_tier: SubscriptionTier::Professional,
            metadata: None,
        })
        .await
        .unwrap();

    (db, practice.id)
}

fn new_user(practice_id: Uuid, email: &str, credential: Credential) -> CreateUser {
    CreateUser {
        practice_id,
        email: email.into(),
        first_name: "Ada".into(),
        last_name: "Jones".into(),
        role: UserRole::Doctor,
        credential,
    }
}

#[tokio::test]
async fn create_and_get_user() {
    let (db, practice_id) = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(new_user(
            practice_id,
            "ada@riverside.example",
            Credential::from_stored(HASHED),
        ))
        .await
        .unwrap();

    assert_eq!(user.practice_id, practice_id);
    assert_eq!(user.role, UserRole::Doctor);
    assert_eq!(user.status, UserStatus::Active);
    assert!(user.last_login_at.is_none());
    assert!(matches!(user.credential, Credential::Hashed(_)));

    let fetched = repo.get_by_id(practice_id, user.id).await.unwrap();
    assert_eq!(fetched.email, "ada@riverside.example");
}

#[tokio::test]
async fn legacy_credential_is_classified_on_load() {
    let (db, practice_id) = setup().await;
    let repo = SurrealUserRepository::new(db);

    // base64("password123")
    let user = repo
        .create(new_user(
            practice_id,
            "seed@riverside.example",
            Credential::from_stored("cGFzc3dvcmQxMjM="),
        ))
        .await
        .unwrap();

    let fetched = repo.find_by_email("seed@riverside.example").await.unwrap();
    assert_eq!(fetched.id, user.id);
    assert!(fetched.credential.is_legacy());
    assert_eq!(fetched.credential.as_stored(), "cGFzc3dvcmQxMjM=");
}

#[tokio::test]
async fn email_lookup_is_case_insensitive() {
    let (db, practice_id) = setup().await;
    let repo = SurrealUserRepository::new(db);

    repo.create(new_user(
        practice_id,
        "Ada@Riverside.Example",
        Credential::from_stored(HASHED),
    ))
    .await
    .unwrap();

    let fetched = repo.find_by_email("  ADA@riverside.example ").await.unwrap();
    assert_eq!(fetched.email, "ada@riverside.example");
}

#[tokio::test]
async fn unknown_email_is_not_found() {
    let (db, _) = setup().await;
    let repo = SurrealUserRepository::new(db);
    let err = repo.find_by_email("nobody@example.com").await.unwrap_err();
    assert!(matches!(err, GpmError::NotFound { .. }));
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let (db, practice_id) = setup().await;
    let repo = SurrealUserRepository::new(db);

    repo.create(new_user(
        practice_id,
        "ada@riverside.example",
        Credential::from_stored(HASHED),
    ))
    .await
    .unwrap();
    let err = repo
        .create(new_user(
            practice_id,
            "ada@riverside.example",
            Credential::from_stored(HASHED),
        ))
        .await
        .unwrap_err();
    assert!(
        matches!(err, GpmError::AlreadyExists { .. } | GpmError::Database(_)),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn tenant_isolation_on_get() {
    let (db, practice_id) = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(new_user(
            practice_id,
            "ada@riverside.example",
            Credential::from_stored(HASHED),
        ))
        .await
        .unwrap();

    let err = repo.get_by_id(Uuid::new_v4(), user.id).await.unwrap_err();
    assert!(matches!(err, GpmError::NotFound { .. }));
}

#[tokio::test]
async fn set_credential_replaces_legacy() {
    let (db, practice_id) = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(new_user(
            practice_id,
            "seed@riverside.example",
            Credential::from_stored("cGFzc3dvcmQxMjM="),
        ))
        .await
        .unwrap();

    repo.set_credential(practice_id, user.id, Credential::from_stored(HASHED))
        .await
        .unwrap();

    let fetched = repo.get_by_id(practice_id, user.id).await.unwrap();
    assert!(matches!(fetched.credential, Credential::Hashed(_)));
}

#[tokio::test]
async fn set_credential_for_missing_user_is_not_found() {
    let (db, practice_id) = setup().await;
    let repo = SurrealUserRepository::new(db);
    let err = repo
        .set_credential(practice_id, Uuid::new_v4(), Credential::from_stored(HASHED))
        .await
        .unwrap_err();
    assert!(matches!(err, GpmError::NotFound { .. }));
}

#[tokio::test]
async fn record_login_sets_timestamp() {
    let (db, practice_id) = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(new_user(
            practice_id,
            "ada@riverside.example",
            Credential::from_stored(HASHED),
        ))
        .await
        .unwrap();

    repo.record_login(practice_id, user.id, Utc::now())
        .await
        .unwrap();

    let fetched = repo.get_by_id(practice_id, user.id).await.unwrap();
    assert!(fetched.last_login_at.is_some());
}

#[tokio::test]
async fn update_role_and_status() {
    let (db, practice_id) = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(new_user(
            practice_id,
            "ada@riverside.example",
            Credential::from_stored(HASHED),
        ))
        .await
        .unwrap();

    let updated = repo
        .update(
            practice_id,
            user.id,
            UpdateUser {
                role: Some(UserRole::Admin),
                status: Some(UserStatus::Inactive),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.role, UserRole::Admin);
    assert_eq!(updated.status, UserStatus::Inactive);
    assert_eq!(updated.first_name, "Ada");
}

#[tokio::test]
async fn list_is_practice_scoped() {
    let (db, practice_id) = setup().await;
    let repo = SurrealUserRepository::new(db.clone());

    for i in 0..3 {
        repo.create(new_user(
            practice_id,
            &format!("user{i}@riverside.example"),
            Credential::from_stored(HASHED),
        ))
        .await
        .unwrap();
    }

    let page = repo.list(practice_id, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 3);

    let other = repo
        .list(Uuid::new_v4(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(other.total, 0);
    assert!(other.items.is_empty());
}
