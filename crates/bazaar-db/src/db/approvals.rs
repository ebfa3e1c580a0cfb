use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

use bazaar_core::models::ApprovalStatus;
use bazaar_core::AppError;

/// Audit row written for every admin moderation decision.
#[derive(Debug, Clone, FromRow)]
pub struct ApprovalRecord {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub admin_id: Uuid,
    pub status: ApprovalStatus,
    pub comment: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Repository for the moderation audit trail.
#[derive(Clone)]
pub struct ApprovalRepository {
    pool: PgPool,
}

impl ApprovalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, comment), fields(db.table = "admin_approvals", db.operation = "insert", db.record_id = %ad_id))]
    pub async fn record_decision(
        &self,
        ad_id: Uuid,
        admin_id: Uuid,
        status: ApprovalStatus,
        comment: Option<String>,
    ) -> Result<ApprovalRecord, AppError> {
        let record = sqlx::query_as::<Postgres, ApprovalRecord>(
            r#"
            INSERT INTO admin_approvals (ad_id, admin_id, status, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, ad_id, admin_id, status, comment, decided_at
            "#,
        )
        .bind(ad_id)
        .bind(admin_id)
        .bind(status)
        .bind(comment)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "admin_approvals", db.operation = "select", db.record_id = %ad_id))]
    pub async fn history_for_ad(&self, ad_id: Uuid) -> Result<Vec<ApprovalRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, ApprovalRecord>(
            "SELECT id, ad_id, admin_id, status, comment, decided_at FROM admin_approvals WHERE ad_id = $1 ORDER BY decided_at DESC",
        )
        .bind(ad_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
