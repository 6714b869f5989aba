//! HTTP-level integration tests for guestbook submission, listing, deletion
//! and single-entry moderation.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_draft, create_published, delete_auth, get, get_auth, heartfelt_message,
    patch_json_auth, post_json, post_json_auth, register_user, submit_entry,
};
use gather_core::status::GuestbookEntryStatus;
use gather_db::repositories::GuestbookRepo;
use serde_json::json;
use sqlx::PgPool;

async fn moderate(
    app: &axum::Router,
    entry_id: i64,
    action: &str,
    token: &str,
) -> axum::response::Response {
    post_json_auth(
        app.clone(),
        &format!("/api/v1/guestbook/{entry_id}/moderate"),
        json!({ "action": action, "reason": "Reviewed" }),
        token,
    )
    .await
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unmoderated_guestbook_approves_immediately(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let friend = register_user(&app, "friend").await;
    let memorial = create_published(&app, &pool, &owner, false).await;

    let response = submit_entry(&app, memorial.id, &friend, &heartfelt_message(1)).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "approved");
    assert_eq!(json["data"]["author_id"], friend.id);
    assert_eq!(json["data"]["author_name"], "A Friend");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_moderated_guestbook_holds_entries(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let friend = register_user(&app, "friend").await;
    let memorial = create_published(&app, &pool, &owner, true).await;

    let response = submit_entry(&app, memorial.id, &friend, &heartfelt_message(1)).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_author_name_defaults_to_display_name(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let friend = register_user(&app, "cousin_jo").await;
    let memorial = create_published(&app, &pool, &owner, false).await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/memorials/{}/guestbook", memorial.id),
        json!({ "message": heartfelt_message(1), "relationship": "Cousin" }),
        &friend.token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["author_name"], "cousin_jo");
    assert_eq!(json["data"]["relationship"], "Cousin");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_submission_requires_auth(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let memorial = create_published(&app, &pool, &owner, false).await;

    let response = post_json(
        app,
        &format!("/api/v1/memorials/{}/guestbook", memorial.id),
        json!({ "author_name": "Anon", "message": heartfelt_message(1) }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_submission_validation(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let friend = register_user(&app, "friend").await;
    let memorial = create_published(&app, &pool, &owner, false).await;

    let response = submit_entry(&app, memorial.id, &friend, "Too short").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = submit_entry(
        &app,
        memorial.id,
        &friend,
        "Buy now at www.casino-deals.xyz for amazing offers today",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

/// A single link in an otherwise ordinary message is not enough to be spam.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_single_spam_signal_is_accepted(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let friend = register_user(&app, "friend").await;
    let memorial = create_published(&app, &pool, &owner, false).await;

    let response = submit_entry(
        &app,
        memorial.id,
        &friend,
        "We shared photos of him at https://photos.example.com/album, rest easy.",
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_drafts_do_not_accept_entries(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register_user(&app, "owner").await;
    let draft = create_draft(
        &app,
        &owner,
        json!({ "first_name": "Draft", "last_name": "Only" }),
    )
    .await;

    let response = submit_entry(
        &app,
        draft["id"].as_i64().unwrap(),
        &owner,
        &heartfelt_message(1),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_disabled_guestbook_is_forbidden(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let friend = register_user(&app, "friend").await;
    let memorial = create_published(&app, &pool, &owner, false).await;

    let response = patch_json_auth(
        app.clone(),
        &format!("/api/v1/memorials/{}", memorial.id),
        json!({ "expected_updated_at": memorial.updated_at, "guestbook_enabled": false }),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = submit_entry(&app, memorial.id, &friend, &heartfelt_message(1)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Five submissions per minute are allowed; the sixth is refused.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sixth_submission_in_a_minute_is_rate_limited(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let friend = register_user(&app, "friend").await;
    let memorial = create_published(&app, &pool, &owner, false).await;

    for n in 0..5 {
        let response = submit_entry(&app, memorial.id, &friend, &heartfelt_message(n)).await;
        assert_eq!(response.status(), StatusCode::CREATED, "submission {n}");
    }

    let response = submit_entry(&app, memorial.id, &friend, &heartfelt_message(6)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    let json = body_json(response).await;
    assert_eq!(json["code"], "RATE_LIMITED");

    // Another member is unaffected.
    let other = register_user(&app, "other").await;
    let response = submit_entry(&app, memorial.id, &other, &heartfelt_message(7)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

// ---------------------------------------------------------------------------
// Listing and deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_visitors_only_see_approved_entries(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let friend = register_user(&app, "friend").await;
    let memorial = create_published(&app, &pool, &owner, true).await;
    let uri = format!("/api/v1/memorials/{}/guestbook", memorial.id);

    let first = body_json(submit_entry(&app, memorial.id, &friend, &heartfelt_message(1)).await).await;
    submit_entry(&app, memorial.id, &friend, &heartfelt_message(2)).await;
    let approved_id = first["data"]["id"].as_i64().unwrap();
    assert_eq!(
        moderate(&app, approved_id, "approve", &owner.token).await.status(),
        StatusCode::OK
    );

    let json = body_json(get(app.clone(), &uri).await).await;
    let visible = json["data"].as_array().unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0]["id"], approved_id);

    // A visitor asking for pending entries still only gets approved ones.
    let json = body_json(get_auth(app.clone(), &format!("{uri}?status=pending"), &friend.token).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let json = body_json(get_auth(app.clone(), &uri, &owner.token).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let json =
        body_json(get_auth(app.clone(), &format!("{uri}?status=pending"), &owner.token).await).await;
    let pending = json["data"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["status"], "pending");

    let response = get_auth(app, &format!("{uri}?status=bogus"), &owner.token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_entry_permissions(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let author = register_user(&app, "author").await;
    let stranger = register_user(&app, "stranger").await;
    let memorial = create_published(&app, &pool, &owner, false).await;

    let first = body_json(submit_entry(&app, memorial.id, &author, &heartfelt_message(1)).await).await;
    let second = body_json(submit_entry(&app, memorial.id, &author, &heartfelt_message(2)).await).await;
    let first_uri = format!("/api/v1/guestbook/{}", first["data"]["id"]);
    let second_uri = format!("/api/v1/guestbook/{}", second["data"]["id"]);

    let response = delete_auth(app.clone(), &first_uri, &stranger.token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = delete_auth(app.clone(), &first_uri, &author.token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete_auth(app.clone(), &second_uri, &owner.token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete_auth(app, &second_uri, &owner.token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Moderation
// ---------------------------------------------------------------------------

/// Once an entry leaves `pending` its status never changes again.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_moderation_is_one_way(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let friend = register_user(&app, "friend").await;
    let memorial = create_published(&app, &pool, &owner, true).await;

    let json = body_json(submit_entry(&app, memorial.id, &friend, &heartfelt_message(1)).await).await;
    let entry_id = json["data"]["id"].as_i64().unwrap();

    let response = moderate(&app, entry_id, "approve", &owner.token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "approved");
    assert_eq!(json["data"]["moderated_by"], owner.id);
    assert_eq!(json["data"]["moderation_reason"], "Reviewed");

    let response = moderate(&app, entry_id, "reject", &owner.token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let response = moderate(&app, entry_id, "approve", &owner.token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let stored = GuestbookRepo::find_by_id(&pool, entry_id).await.unwrap().unwrap();
    assert_eq!(stored.status, GuestbookEntryStatus::Approved);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_only_owner_or_moderator_can_moderate(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let friend = register_user(&app, "friend").await;
    let helper = register_user(&app, "helper").await;
    let memorial = create_published(&app, &pool, &owner, true).await;

    let first = body_json(submit_entry(&app, memorial.id, &friend, &heartfelt_message(1)).await).await;
    let first_id = first["data"]["id"].as_i64().unwrap();

    let response = moderate(&app, first_id, "approve", &friend.token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = moderate(&app, first_id, "approve", &helper.token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/memorials/{}/moderators", memorial.id),
        json!({ "user_id": helper.id }),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = moderate(&app, first_id, "reject", &helper.token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "rejected");
    assert_eq!(json["data"]["moderated_by"], helper.id);

    let response = moderate(&app, 999_999, "approve", &owner.token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_can_moderate_any_guestbook(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let friend = register_user(&app, "friend").await;
    let admin = register_user(&app, "boss").await;
    let admin_token = common::make_admin(&app, &pool, "boss", admin.id).await;
    let memorial = create_published(&app, &pool, &owner, true).await;

    let json = body_json(submit_entry(&app, memorial.id, &friend, &heartfelt_message(1)).await).await;
    let entry_id = json["data"]["id"].as_i64().unwrap();

    let response = moderate(&app, entry_id, "approve", &admin_token).await;
    assert_eq!(response.status(), StatusCode::OK);
}
