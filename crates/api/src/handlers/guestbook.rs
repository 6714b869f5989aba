//! Handlers for guestbook submission, listing, deletion and single-entry
//! moderation.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use gather_core::error::CoreError;
use gather_core::guestbook::{
    ensure_can_moderate, initial_status, validate_moderation_reason, validate_submission,
    ModerationAction,
};
use gather_core::platform_events::{ENTITY_GUESTBOOK_ENTRY, GUESTBOOK_ENTRY_SUBMITTED};
use gather_core::rate_limit::{guestbook_bucket, GUESTBOOK_POLICY};
use gather_core::spam;
use gather_core::status::{GuestbookEntryStatus, MemorialStatus};
use gather_core::types::DbId;
use gather_db::models::guestbook::{CreateGuestbookEntry, GuestbookEntry, ModerationOutcome};
use gather_db::repositories::{
    BlockedUserRepo, GuestbookRepo, MemorialRepo, RateLimitRepo, UserRepo,
};
use gather_events::PlatformEvent;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::handlers::access::{can_moderate, is_owner, load_readable};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::middleware::memorial_access::MemorialAccessToken;
use crate::query::StatusFilterParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /memorials/{id}/guestbook`.
#[derive(Debug, Deserialize)]
pub struct SubmitEntryRequest {
    /// Defaults to the caller's display name.
    pub author_name: Option<String>,
    pub relationship: Option<String>,
    pub message: String,
    pub photo_url: Option<String>,
}

/// Request body for `POST /guestbook/{id}/moderate`.
#[derive(Debug, Deserialize)]
pub struct ModerateEntryRequest {
    pub action: ModerationAction,
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/memorials/{id}/guestbook
///
/// Checks run in order: rate limit, block list, field validation, spam
/// heuristics. Moderated guestbooks hold the entry as `pending`.
pub async fn submit_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    MemorialAccessToken(token): MemorialAccessToken,
    Path(memorial_id): Path<DbId>,
    Json(input): Json<SubmitEntryRequest>,
) -> AppResult<impl IntoResponse> {
    let memorial = load_readable(&state, memorial_id, Some(&auth), token.as_deref()).await?;
    if memorial.status != MemorialStatus::Published {
        return Err(AppError::Core(CoreError::Conflict(
            "Guestbook entries can only be left on published memorials".into(),
        )));
    }
    if !memorial.guestbook_enabled {
        return Err(AppError::Core(CoreError::Forbidden(
            "The guestbook for this memorial is disabled".into(),
        )));
    }

    RateLimitRepo::check_and_record(&state.pool, &guestbook_bucket(auth.user_id), &GUESTBOOK_POLICY)
        .await?
        .into_result()
        .inspect_err(|_| {
            tracing::warn!(user_id = auth.user_id, memorial_id, "Guestbook rate limit hit");
        })?;

    if BlockedUserRepo::is_blocked(&state.pool, memorial.owner_id, auth.user_id).await? {
        tracing::warn!(user_id = auth.user_id, memorial_id, "Blocked user tried to sign guestbook");
        return Err(AppError::Core(CoreError::Forbidden(
            "You cannot sign this guestbook".into(),
        )));
    }

    let author_name = match input.author_name {
        Some(name) => name.trim().to_string(),
        None => UserRepo::find_by_id(&state.pool, auth.user_id)
            .await?
            .map(|u| u.display_name)
            .unwrap_or_default(),
    };
    validate_submission(
        &author_name,
        input.relationship.as_deref(),
        &input.message,
        input.photo_url.as_deref(),
    )?;

    let signals = spam::analyze(&input.message);
    if signals.is_spam() {
        tracing::warn!(
            user_id = auth.user_id,
            memorial_id,
            signals = signals.count(),
            "Guestbook submission rejected as spam"
        );
        return Err(AppError::Core(CoreError::Validation(
            "Message was flagged as spam".into(),
        )));
    }

    let entry = GuestbookRepo::create(
        &state.pool,
        &CreateGuestbookEntry {
            memorial_id,
            author_id: auth.user_id,
            author_name,
            relationship: input.relationship,
            message: input.message.trim().to_string(),
            photo_url: input.photo_url,
            status: initial_status(memorial.guestbook_moderated),
        },
    )
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        memorial_id,
        entry_id = entry.id,
        status = %entry.status,
        "Guestbook entry submitted"
    );
    state.event_bus.publish(
        PlatformEvent::new(GUESTBOOK_ENTRY_SUBMITTED)
            .with_source(ENTITY_GUESTBOOK_ENTRY, entry.id)
            .with_actor(auth.user_id)
            .with_payload(json!({
                "owner_id": memorial.owner_id,
                "memorial_id": memorial_id,
                "entry_id": entry.id,
                "memorial_name": memorial.display_name(),
                "author_name": entry.author_name,
                "status": entry.status,
            })),
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// GET /api/v1/memorials/{id}/guestbook
///
/// Owners, moderators and admins see every status; everyone else only
/// approved entries.
pub async fn list_entries(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    MemorialAccessToken(token): MemorialAccessToken,
    Path(memorial_id): Path<DbId>,
    Query(params): Query<StatusFilterParams>,
) -> AppResult<Json<DataResponse<Vec<GuestbookEntry>>>> {
    let memorial = load_readable(&state, memorial_id, user.as_ref(), token.as_deref()).await?;

    let status = if can_moderate(&state, &memorial, user.as_ref()).await? {
        params
            .status
            .as_deref()
            .map(|s| {
                GuestbookEntryStatus::parse(s)
                    .ok_or_else(|| AppError::BadRequest(format!("Unknown entry status '{s}'")))
            })
            .transpose()?
    } else {
        Some(GuestbookEntryStatus::Approved)
    };

    let (limit, offset) = params.pagination().resolve();
    let entries =
        GuestbookRepo::list_for_memorial(&state.pool, memorial_id, status, limit, offset).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// DELETE /api/v1/guestbook/{id}
///
/// The entry's author or the memorial owner may remove it.
pub async fn delete_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(entry_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let entry = ensure_entry_exists(&state, entry_id).await?;
    let memorial = MemorialRepo::find_by_id(&state.pool, entry.memorial_id).await?;
    let owns_memorial = memorial.is_some_and(|m| is_owner(&m, Some(&auth)));

    if entry.author_id != auth.user_id && !owns_memorial {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the author or the memorial owner can delete this entry".into(),
        )));
    }

    GuestbookRepo::delete(&state.pool, entry_id).await?;
    tracing::info!(user_id = auth.user_id, entry_id, "Guestbook entry deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/guestbook/{id}/moderate
pub async fn moderate_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(entry_id): Path<DbId>,
    Json(input): Json<ModerateEntryRequest>,
) -> AppResult<Json<DataResponse<GuestbookEntry>>> {
    let mut entries = apply_moderation(
        &state,
        &auth,
        &[entry_id],
        input.action,
        input.reason.as_deref(),
    )
    .await?;
    let entry = entries
        .pop()
        .ok_or_else(|| AppError::InternalError("Moderation returned no entry".into()))?;
    Ok(Json(DataResponse { data: entry }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn ensure_entry_exists(state: &AppState, id: DbId) -> AppResult<GuestbookEntry> {
    GuestbookRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "GuestbookEntry",
            id,
        }))
}

/// Moderate `entry_ids` atomically and notify each author.
///
/// Nothing is written unless every entry exists, is pending and may be
/// moderated by the caller.
pub async fn apply_moderation(
    state: &AppState,
    auth: &AuthUser,
    entry_ids: &[DbId],
    action: ModerationAction,
    reason: Option<&str>,
) -> AppResult<Vec<GuestbookEntry>> {
    let reason = reason.map(str::trim).filter(|r| !r.is_empty());
    validate_moderation_reason(reason)?;

    let outcome = GuestbookRepo::moderate(
        &state.pool,
        entry_ids,
        auth.user_id,
        auth.is_admin(),
        action,
        reason,
    )
    .await?;

    let entries = match outcome {
        ModerationOutcome::Applied(entries) => entries,
        ModerationOutcome::NotFound(id) => {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "GuestbookEntry",
                id,
            }))
        }
        ModerationOutcome::Forbidden(id) => {
            return Err(AppError::Core(CoreError::Forbidden(format!(
                "Not permitted to moderate guestbook entry {id}"
            ))))
        }
        ModerationOutcome::NotPending { entry_id, status } => {
            ensure_can_moderate(entry_id, status, action)?;
            return Err(AppError::Core(CoreError::Conflict(format!(
                "Guestbook entry {entry_id} is no longer pending"
            ))));
        }
    };

    tracing::info!(
        user_id = auth.user_id,
        action = ?action,
        count = entries.len(),
        "Guestbook entries moderated"
    );
    publish_moderation_events(state, auth.user_id, action, reason, &entries).await;
    Ok(entries)
}

async fn publish_moderation_events(
    state: &AppState,
    moderator_id: DbId,
    action: ModerationAction,
    reason: Option<&str>,
    entries: &[GuestbookEntry],
) {
    let mut names: HashMap<DbId, String> = HashMap::new();
    for entry in entries {
        if !names.contains_key(&entry.memorial_id) {
            let name = match MemorialRepo::find_by_id(&state.pool, entry.memorial_id).await {
                Ok(Some(m)) => m.display_name(),
                Ok(None) => String::new(),
                Err(e) => {
                    tracing::error!(error = %e, memorial_id = entry.memorial_id, "Memorial lookup failed");
                    String::new()
                }
            };
            names.insert(entry.memorial_id, name);
        }
        let memorial_name = names.get(&entry.memorial_id).cloned().unwrap_or_default();

        state.event_bus.publish(
            PlatformEvent::new(action.event_type())
                .with_source(ENTITY_GUESTBOOK_ENTRY, entry.id)
                .with_actor(moderator_id)
                .with_payload(json!({
                    "author_id": entry.author_id,
                    "entry_id": entry.id,
                    "memorial_id": entry.memorial_id,
                    "memorial_name": memorial_name,
                    "reason": reason,
                })),
        );
    }
}
