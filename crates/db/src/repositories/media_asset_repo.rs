//! Repository for the `media_assets` table.

use gather_core::types::DbId;
use sqlx::PgPool;

use crate::models::media::{CreateMediaAsset, MediaAsset, UpdateMediaAsset};

const COLUMNS: &str = "id, memorial_id, uploaded_by, kind_id, provider_public_id, url, \
                        thumbnail_url, mime_type, caption, is_primary, width, height, \
                        duration_secs, bytes, sort_order, created_at, updated_at";

/// Provides CRUD operations for memorial photos and videos.
pub struct MediaAssetRepo;

impl MediaAssetRepo {
    /// Record an uploaded asset at the end of the memorial's gallery.
    pub async fn create(
        pool: &PgPool,
        input: &CreateMediaAsset,
    ) -> Result<MediaAsset, sqlx::Error> {
        let query = format!(
            "INSERT INTO media_assets
                (memorial_id, uploaded_by, kind_id, provider_public_id, url, thumbnail_url,
                 mime_type, caption, width, height, duration_secs, bytes, sort_order)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                     (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM media_assets WHERE memorial_id = $1))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaAsset>(&query)
            .bind(input.memorial_id)
            .bind(input.uploaded_by)
            .bind(input.kind.id())
            .bind(&input.provider_public_id)
            .bind(&input.url)
            .bind(&input.thumbnail_url)
            .bind(&input.mime_type)
            .bind(&input.caption)
            .bind(input.width)
            .bind(input.height)
            .bind(input.duration_secs)
            .bind(input.bytes)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MediaAsset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media_assets WHERE id = $1");
        sqlx::query_as::<_, MediaAsset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a memorial's assets in gallery order.
    pub async fn list_for_memorial(
        pool: &PgPool,
        memorial_id: DbId,
    ) -> Result<Vec<MediaAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_assets WHERE memorial_id = $1 ORDER BY sort_order, id"
        );
        sqlx::query_as::<_, MediaAsset>(&query)
            .bind(memorial_id)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_memorial(pool: &PgPool, memorial_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM media_assets WHERE memorial_id = $1")
            .bind(memorial_id)
            .fetch_one(pool)
            .await
    }

    /// Update caption, order and primary flag. Uses a transaction so that
    /// promoting an asset to primary clears the previous primary atomically.
    ///
    /// Returns `None` if the asset does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateMediaAsset,
    ) -> Result<Option<MediaAsset>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if input.is_primary == Some(true) {
            sqlx::query(
                "UPDATE media_assets SET is_primary = false
                 WHERE is_primary = true AND id <> $1
                   AND memorial_id = (SELECT memorial_id FROM media_assets WHERE id = $1)",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let query = format!(
            "UPDATE media_assets SET
                caption = COALESCE($2, caption),
                sort_order = COALESCE($3, sort_order),
                is_primary = COALESCE($4, is_primary)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let asset = sqlx::query_as::<_, MediaAsset>(&query)
            .bind(id)
            .bind(&input.caption)
            .bind(input.sort_order)
            .bind(input.is_primary)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(asset)
    }

    /// Delete an asset row. Returns `true` if it existed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM media_assets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
