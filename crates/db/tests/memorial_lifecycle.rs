//! Integration tests for the memorial lifecycle repository operations.
//!
//! Covers draft creation, optimistic locking, custom URL uniqueness, guarded
//! status transitions and the hard/soft delete split.

use assert_matches::assert_matches;
use chrono::NaiveDate;
use gather_core::status::MemorialStatus;
use gather_db::models::memorial::{AutosaveMemorial, CreateMemorial, UpdateMemorial};
use gather_db::models::user::NewUser;
use gather_db::repositories::{MemorialRepo, UserRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_user(pool: &PgPool, username: &str) -> i64 {
    UserRepo::create(
        pool,
        &NewUser {
            username,
            email: &format!("{username}@example.com"),
            display_name: username,
            password_hash: "not-a-real-hash",
            role_id: 2,
        },
    )
    .await
    .unwrap()
    .id
}

fn new_memorial(first: &str, last: &str) -> CreateMemorial {
    CreateMemorial {
        first_name: first.to_string(),
        middle_name: None,
        last_name: last.to_string(),
        nickname: None,
        birth_date: NaiveDate::from_ymd_opt(1940, 3, 2),
        death_date: NaiveDate::from_ymd_opt(2024, 8, 9),
        birth_place: None,
        death_place: None,
        biography: None,
        obituary: None,
        guestbook_enabled: None,
        guestbook_moderated: None,
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_inserts_draft_at_step_one(pool: PgPool) {
    let owner = create_user(&pool, "owner").await;
    let memorial = MemorialRepo::create(&pool, owner, &new_memorial("Ada", "Lovelace"))
        .await
        .unwrap();

    assert_eq!(memorial.status, MemorialStatus::Draft);
    assert_eq!(memorial.current_step, 1);
    assert!(memorial.completed_steps.is_empty());
    assert!(memorial.guestbook_enabled);
    assert!(memorial.guestbook_moderated);
    assert!(!memorial.has_password);
    assert!(memorial.published_at.is_none());
}

// ---------------------------------------------------------------------------
// Optimistic locking
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_with_current_timestamp_succeeds(pool: PgPool) {
    let owner = create_user(&pool, "owner").await;
    let memorial = MemorialRepo::create(&pool, owner, &new_memorial("Ada", "Lovelace"))
        .await
        .unwrap();

    let update = UpdateMemorial {
        nickname: Some("Countess".to_string()),
        ..Default::default()
    };
    let updated = MemorialRepo::update(&pool, memorial.id, memorial.updated_at, &update)
        .await
        .unwrap()
        .expect("fresh timestamp should match");

    assert_eq!(updated.nickname.as_deref(), Some("Countess"));
    assert!(updated.updated_at > memorial.updated_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_with_stale_timestamp_leaves_row_unchanged(pool: PgPool) {
    let owner = create_user(&pool, "owner").await;
    let memorial = MemorialRepo::create(&pool, owner, &new_memorial("Ada", "Lovelace"))
        .await
        .unwrap();

    let first = UpdateMemorial {
        nickname: Some("First".to_string()),
        ..Default::default()
    };
    MemorialRepo::update(&pool, memorial.id, memorial.updated_at, &first)
        .await
        .unwrap()
        .unwrap();

    let second = UpdateMemorial {
        nickname: Some("Second".to_string()),
        ..Default::default()
    };
    let stale = MemorialRepo::update(&pool, memorial.id, memorial.updated_at, &second)
        .await
        .unwrap();
    assert!(stale.is_none(), "stale updated_at must not match");

    let row = MemorialRepo::find_by_id(&pool, memorial.id).await.unwrap().unwrap();
    assert_eq!(row.nickname.as_deref(), Some("First"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_autosave_bypasses_locking_and_stamps_last_saved(pool: PgPool) {
    let owner = create_user(&pool, "owner").await;
    let memorial = MemorialRepo::create(&pool, owner, &new_memorial("Ada", "Lovelace"))
        .await
        .unwrap();

    let save = AutosaveMemorial {
        biography: Some("Wrote the first program.".to_string()),
        current_step: Some(3),
        completed_steps: Some(vec![1, 2]),
        ..Default::default()
    };
    let saved = MemorialRepo::autosave(&pool, memorial.id, &save)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(saved.current_step, 3);
    assert_eq!(saved.completed_steps, vec![1, 2]);
    assert!(saved.last_saved_at.is_some());
    assert_eq!(saved.first_name, "Ada", "untouched fields are kept");
}

// ---------------------------------------------------------------------------
// Custom URL uniqueness
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_colliding_custom_url_is_unique_violation_without_partial_write(pool: PgPool) {
    let owner = create_user(&pool, "owner").await;
    let a = MemorialRepo::create(&pool, owner, &new_memorial("Ada", "Lovelace"))
        .await
        .unwrap();
    let b = MemorialRepo::create(&pool, owner, &new_memorial("Alan", "Turing"))
        .await
        .unwrap();

    let claim = UpdateMemorial {
        custom_url: Some("in-loving-memory".to_string()),
        ..Default::default()
    };
    MemorialRepo::update(&pool, a.id, a.updated_at, &claim)
        .await
        .unwrap()
        .unwrap();

    let collide = UpdateMemorial {
        custom_url: Some("in-loving-memory".to_string()),
        nickname: Some("Should not persist".to_string()),
        ..Default::default()
    };
    let err = MemorialRepo::update(&pool, b.id, b.updated_at, &collide)
        .await
        .unwrap_err();
    assert_matches!(
        &err,
        sqlx::Error::Database(db) if db.constraint() == Some("uq_memorials_custom_url")
    );

    let row = MemorialRepo::find_by_id(&pool, b.id).await.unwrap().unwrap();
    assert!(row.custom_url.is_none());
    assert!(row.nickname.is_none());
    assert_eq!(row.updated_at, b.updated_at);

    assert!(!MemorialRepo::custom_url_available(&pool, "in-loving-memory", None)
        .await
        .unwrap());
    assert!(MemorialRepo::custom_url_available(&pool, "in-loving-memory", Some(a.id))
        .await
        .unwrap());
}

// ---------------------------------------------------------------------------
// Transitions and deletes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_transition_is_guarded_by_current_status(pool: PgPool) {
    let owner = create_user(&pool, "owner").await;
    let memorial = MemorialRepo::create(&pool, owner, &new_memorial("Ada", "Lovelace"))
        .await
        .unwrap();

    let wrong = MemorialRepo::transition(
        &pool,
        memorial.id,
        MemorialStatus::Published,
        MemorialStatus::Archived,
    )
    .await
    .unwrap();
    assert!(wrong.is_none());

    let published = MemorialRepo::transition(
        &pool,
        memorial.id,
        MemorialStatus::Draft,
        MemorialStatus::Published,
    )
    .await
    .unwrap()
    .unwrap();
    let first_published_at = published.published_at.expect("published_at set");

    let archived = MemorialRepo::transition(
        &pool,
        memorial.id,
        MemorialStatus::Published,
        MemorialStatus::Archived,
    )
    .await
    .unwrap()
    .unwrap();
    assert!(archived.archived_at.is_some());

    let unarchived = MemorialRepo::transition(
        &pool,
        memorial.id,
        MemorialStatus::Archived,
        MemorialStatus::Published,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(unarchived.published_at, Some(first_published_at));
    assert!(unarchived.archived_at.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_draft_hard_delete_removes_row(pool: PgPool) {
    let owner = create_user(&pool, "owner").await;
    let memorial = MemorialRepo::create(&pool, owner, &new_memorial("Ada", "Lovelace"))
        .await
        .unwrap();

    assert!(MemorialRepo::hard_delete_draft(&pool, memorial.id).await.unwrap());
    assert!(MemorialRepo::find_by_id(&pool, memorial.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_published_soft_delete_keeps_row(pool: PgPool) {
    let owner = create_user(&pool, "owner").await;
    let memorial = MemorialRepo::create(&pool, owner, &new_memorial("Ada", "Lovelace"))
        .await
        .unwrap();
    MemorialRepo::transition(&pool, memorial.id, MemorialStatus::Draft, MemorialStatus::Published)
        .await
        .unwrap()
        .unwrap();

    assert!(
        !MemorialRepo::hard_delete_draft(&pool, memorial.id).await.unwrap(),
        "published memorials are never hard-deleted"
    );
    let deleted = MemorialRepo::transition(
        &pool,
        memorial.id,
        MemorialStatus::Published,
        MemorialStatus::Deleted,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(deleted.status, MemorialStatus::Deleted);
    assert!(deleted.deleted_at.is_some());

    let listed = MemorialRepo::list_by_owner(&pool, owner, None).await.unwrap();
    assert!(listed.is_empty(), "deleted memorials are hidden by default");
    let listed = MemorialRepo::list_by_owner(&pool, owner, Some(MemorialStatus::Deleted))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let edit = UpdateMemorial {
        nickname: Some("late edit".to_string()),
        ..Default::default()
    };
    assert!(MemorialRepo::update(&pool, memorial.id, deleted.updated_at, &edit)
        .await
        .unwrap()
        .is_none());
}
