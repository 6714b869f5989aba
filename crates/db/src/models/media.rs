//! Media asset model and DTOs.

use gather_core::status::MediaKind;
use gather_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `media_assets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MediaAsset {
    pub id: DbId,
    pub memorial_id: DbId,
    pub uploaded_by: DbId,
    #[sqlx(rename = "kind_id", try_from = "i16")]
    pub kind: MediaKind,
    pub provider_public_id: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub mime_type: String,
    pub caption: Option<String>,
    pub is_primary: bool,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_secs: Option<f64>,
    pub bytes: i64,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording an uploaded asset.
#[derive(Debug, Clone)]
pub struct CreateMediaAsset {
    pub memorial_id: DbId,
    pub uploaded_by: DbId,
    pub kind: MediaKind,
    pub provider_public_id: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub mime_type: String,
    pub caption: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_secs: Option<f64>,
    pub bytes: i64,
}

/// DTO for editing an asset. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMediaAsset {
    pub caption: Option<String>,
    pub sort_order: Option<i32>,
    pub is_primary: Option<bool>,
}
