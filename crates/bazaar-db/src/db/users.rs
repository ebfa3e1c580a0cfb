use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use bazaar_core::models::UserProfile;
use bazaar_core::AppError;

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, role, is_active, created_at, updated_at";

/// Account lookup seam. The publication workflow resolves the submitter
/// through this before creating anything on their behalf.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve an active account. Inactive and unknown users both yield None.
    async fn find_active(&self, id: Uuid) -> Result<Option<UserProfile>, AppError>;
}

/// Repository for user accounts.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<UserProfile>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<Postgres, UserProfile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    async fn find_active(&self, id: Uuid) -> Result<Option<UserProfile>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active = TRUE");
        let user = sqlx::query_as::<Postgres, UserProfile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}
