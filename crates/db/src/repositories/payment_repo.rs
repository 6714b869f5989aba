//! Repository for the `payments` table.

use gather_core::status::{MemorialStatus, PaymentStatus};
use gather_core::types::DbId;
use sqlx::PgPool;

use crate::models::payment::{CreatePayment, Payment, PaymentCompletion};

const COLUMNS: &str = "id, memorial_id, user_id, provider_session_id, amount_cents, currency, \
                        status_id, paid_at, created_at, updated_at";

/// Checkout payments gating publication.
pub struct PaymentRepo;

impl PaymentRepo {
    /// Record a pending payment for a freshly created checkout session.
    pub async fn create(pool: &PgPool, input: &CreatePayment) -> Result<Payment, sqlx::Error> {
        let query = format!(
            "INSERT INTO payments (memorial_id, user_id, provider_session_id, amount_cents, currency)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(input.memorial_id)
            .bind(input.user_id)
            .bind(&input.provider_session_id)
            .bind(input.amount_cents)
            .bind(&input.currency)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_session_id(
        pool: &PgPool,
        session_id: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payments WHERE provider_session_id = $1");
        sqlx::query_as::<_, Payment>(&query)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// Whether a memorial has at least one paid payment.
    pub async fn has_paid(pool: &PgPool, memorial_id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM payments WHERE memorial_id = $1 AND status_id = $2)",
        )
        .bind(memorial_id)
        .bind(PaymentStatus::Paid.id())
        .fetch_one(pool)
        .await
    }

    /// Close a pending payment as failed or expired.
    ///
    /// Returns `None` if the payment is unknown or no longer pending.
    pub async fn close(
        pool: &PgPool,
        session_id: &str,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "UPDATE payments SET status_id = $2
             WHERE provider_session_id = $1 AND status_id = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(session_id)
            .bind(status.id())
            .bind(PaymentStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a payment paid and publish its memorial if it is still a draft,
    /// in one transaction.
    ///
    /// Idempotent: completing an already-paid payment returns it unchanged
    /// with `memorial_published = false`. Returns `None` for an unknown
    /// session.
    pub async fn complete(
        pool: &PgPool,
        session_id: &str,
    ) -> Result<Option<PaymentCompletion>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "SELECT {COLUMNS} FROM payments WHERE provider_session_id = $1 FOR UPDATE"
        );
        let Some(existing) = sqlx::query_as::<_, Payment>(&query)
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if existing.status == PaymentStatus::Paid {
            tx.commit().await?;
            return Ok(Some(PaymentCompletion {
                payment: existing,
                memorial_published: false,
            }));
        }

        let query = format!(
            "UPDATE payments SET status_id = $2, paid_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let payment = sqlx::query_as::<_, Payment>(&query)
            .bind(existing.id)
            .bind(PaymentStatus::Paid.id())
            .fetch_one(&mut *tx)
            .await?;

        let published = sqlx::query(
            "UPDATE memorials SET status_id = $2, published_at = COALESCE(published_at, NOW())
             WHERE id = $1 AND status_id = $3",
        )
        .bind(payment.memorial_id)
        .bind(MemorialStatus::Published.id())
        .bind(MemorialStatus::Draft.id())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(PaymentCompletion {
            payment,
            memorial_published: published.rows_affected() > 0,
        }))
    }
}
