use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use bazaar_core::models::{AdContentUpdate, AdListing, ApprovalStatus, NewAd, StoredImageRef};
use bazaar_core::AppError;

use super::row::{rows_into_listings, AdRow, AD_COLUMNS};

/// Persistence seam for the publication workflow and the webhook consumer.
#[async_trait]
pub trait AdStore: Send + Sync {
    /// Insert a normalized listing. The store assigns the id and the
    /// lifecycle defaults (pending approval, pending payment, hidden).
    async fn insert(&self, ad: &NewAd) -> Result<AdListing, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<AdListing>, AppError>;

    /// Replace the stored image list after uploads complete.
    async fn set_images(&self, id: Uuid, images: &[StoredImageRef]) -> Result<(), AppError>;

    /// Correlate the listing with a checkout session.
    async fn set_payment_session(&self, id: Uuid, session_id: &str) -> Result<(), AppError>;

    /// Delete the row. Returns false when the id no longer exists.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    async fn find_by_payment_session(
        &self,
        session_id: &str,
    ) -> Result<Option<AdListing>, AppError>;

    /// Mark the listing paid. Visibility flips to visible only when the
    /// listing is already approved. Returns the updated listing, or None
    /// when no listing carries the session id.
    async fn record_payment_completed(
        &self,
        session_id: &str,
    ) -> Result<Option<AdListing>, AppError>;

    /// Listings past their expiry that never became promoted or visible.
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<AdListing>, AppError>;
}

/// What a reaction call did, for response messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    Liked,
    LikeRemoved,
    Unliked,
    UnlikeRemoved,
    Recommended,
}

impl ReactionOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ReactionOutcome::Liked => "Ad liked",
            ReactionOutcome::LikeRemoved => "Like removed",
            ReactionOutcome::Unliked => "Ad unliked",
            ReactionOutcome::UnlikeRemoved => "Unlike removed",
            ReactionOutcome::Recommended => "Ad recommended",
        }
    }
}

/// Public search parameters. Text filters match case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct AdFilter {
    pub category: Option<String>,
    pub specialty: Option<String>,
    pub city: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl AdFilter {
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, 100))
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * self.limit()
    }
}

// Version-guarded updates retry this many times before giving up.
const OPTIMISTIC_RETRIES: u32 = 3;

/// Repository for listings.
#[derive(Clone)]
pub struct AdRepository {
    pool: PgPool,
}

impl AdRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<AdListing>, AppError> {
        let sql = format!("SELECT {AD_COLUMNS} FROM ads WHERE id = $1");
        let row = sqlx::query_as::<Postgres, AdRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AdRow::into_listing).transpose()
    }

    async fn require(&self, id: Uuid) -> Result<AdListing, AppError> {
        self.fetch(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ad {} not found", id)))
    }

    /// Admin decision. Visibility is recomputed in the same statement so an
    /// approval racing a payment callback cannot leave a paid-and-approved
    /// listing hidden.
    #[tracing::instrument(skip(self, comment), fields(db.table = "ads", db.operation = "update", db.record_id = %ad_id))]
    pub async fn set_approval(
        &self,
        ad_id: Uuid,
        status: ApprovalStatus,
        admin_id: Uuid,
        comment: Option<String>,
    ) -> Result<AdListing, AppError> {
        let sql = format!(
            r#"
            UPDATE ads SET
                approval_status = $2,
                approval_admin_id = $3,
                approval_admin_comment = $4,
                approved_at = CASE WHEN $2 = 'approved'::approval_status THEN NOW() ELSE approved_at END,
                visibility = CASE
                    WHEN $2 = 'approved'::approval_status AND payment_status = 'paid'
                    THEN 'visible'::visibility
                    ELSE 'hidden'::visibility
                END,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {AD_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<Postgres, AdRow>(&sql)
            .bind(ad_id)
            .bind(status)
            .bind(admin_id)
            .bind(comment)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ad {} not found", ad_id)))?;
        row.into_listing()
    }

    /// Toggle a like. A prior unlike from the same user is withdrawn.
    pub async fn toggle_like(
        &self,
        ad_id: Uuid,
        user_id: Uuid,
    ) -> Result<(AdListing, ReactionOutcome), AppError> {
        self.update_reactions(ad_id, |listing| {
            let outcome = if listing.likes.contains(user_id) {
                listing.likes.user_ids.retain(|u| *u != user_id);
                listing.likes.count -= 1;
                ReactionOutcome::LikeRemoved
            } else {
                if listing.unlikes.contains(user_id) {
                    listing.unlikes.user_ids.retain(|u| *u != user_id);
                    listing.unlikes.count -= 1;
                }
                listing.likes.user_ids.push(user_id);
                listing.likes.count += 1;
                ReactionOutcome::Liked
            };
            Ok(outcome)
        })
        .await
    }

    /// Toggle an unlike. A prior like from the same user is withdrawn.
    pub async fn toggle_unlike(
        &self,
        ad_id: Uuid,
        user_id: Uuid,
    ) -> Result<(AdListing, ReactionOutcome), AppError> {
        self.update_reactions(ad_id, |listing| {
            let outcome = if listing.unlikes.contains(user_id) {
                listing.unlikes.user_ids.retain(|u| *u != user_id);
                listing.unlikes.count -= 1;
                ReactionOutcome::UnlikeRemoved
            } else {
                if listing.likes.contains(user_id) {
                    listing.likes.user_ids.retain(|u| *u != user_id);
                    listing.likes.count -= 1;
                }
                listing.unlikes.user_ids.push(user_id);
                listing.unlikes.count += 1;
                ReactionOutcome::Unliked
            };
            Ok(outcome)
        })
        .await
    }

    /// Recommend once per user; a second call is rejected.
    pub async fn recommend(
        &self,
        ad_id: Uuid,
        user_id: Uuid,
    ) -> Result<(AdListing, ReactionOutcome), AppError> {
        self.update_reactions(ad_id, |listing| {
            if listing.recommendations.contains(user_id) {
                return Err(AppError::BadRequest(
                    "You have already recommended this ad".to_string(),
                ));
            }
            listing.recommendations.user_ids.push(user_id);
            listing.recommendations.count += 1;
            Ok(ReactionOutcome::Recommended)
        })
        .await
    }

    /// Read-modify-write over the reaction columns, guarded by the version
    /// column. Lost updates surface as a retry, then a conflict.
    #[tracing::instrument(skip(self, mutate), fields(db.table = "ads", db.operation = "update", db.record_id = %ad_id))]
    async fn update_reactions<F>(
        &self,
        ad_id: Uuid,
        mut mutate: F,
    ) -> Result<(AdListing, ReactionOutcome), AppError>
    where
        F: FnMut(&mut AdListing) -> Result<ReactionOutcome, AppError>,
    {
        for _ in 0..OPTIMISTIC_RETRIES {
            let mut listing = self.require(ad_id).await?;
            let expected_version = listing.version;
            let outcome = mutate(&mut listing)?;

            let sql = format!(
                r#"
                UPDATE ads SET
                    likes = $3, unlikes = $4, recommendations = $5,
                    version = version + 1, updated_at = NOW()
                WHERE id = $1 AND version = $2
                RETURNING {AD_COLUMNS}
                "#
            );
            let updated = sqlx::query_as::<Postgres, AdRow>(&sql)
                .bind(ad_id)
                .bind(expected_version)
                .bind(serde_json::to_value(&listing.likes)?)
                .bind(serde_json::to_value(&listing.unlikes)?)
                .bind(serde_json::to_value(&listing.recommendations)?)
                .fetch_optional(&self.pool)
                .await?;

            if let Some(row) = updated {
                return Ok((row.into_listing()?, outcome));
            }
        }
        Err(AppError::Conflict(
            "Ad was modified concurrently, retry".to_string(),
        ))
    }

    /// Owner edit of content fields. Merge semantics: absent fields keep
    /// their stored value.
    #[tracing::instrument(skip(self, update), fields(db.table = "ads", db.operation = "update", db.record_id = %ad_id))]
    pub async fn update_content(
        &self,
        ad_id: Uuid,
        owner_id: Uuid,
        update: &AdContentUpdate,
    ) -> Result<AdListing, AppError> {
        for _ in 0..OPTIMISTIC_RETRIES {
            let mut listing = self.require(ad_id).await?;
            if listing.owner_id != owner_id {
                return Err(AppError::Forbidden(
                    "Only the owner can update this ad".to_string(),
                ));
            }
            let expected_version = listing.version;

            if let Some(shop_name) = &update.shop_name {
                listing.shop_name = shop_name.clone();
            }
            if let Some(contact) = &update.contact {
                listing.contact = contact.clone();
            }
            if let Some(location) = &update.location {
                listing.location = location.clone();
            }
            if let Some(business) = &update.business {
                listing.business = business.clone();
            }
            if let Some(schedule) = &update.schedule {
                listing.schedule = schedule.clone();
            }
            if let Some(video_url) = &update.video_url {
                listing.video_url = Some(video_url.clone());
            }

            // The settings column stays untouched: placement was paid for
            // at publication and is not owner-editable.
            let sql = format!(
                r#"
                UPDATE ads SET
                    shop_name = $3, contact = $4, location = $5, business = $6,
                    schedule = $7, video_url = $8,
                    version = version + 1, updated_at = NOW()
                WHERE id = $1 AND version = $2
                RETURNING {AD_COLUMNS}
                "#
            );
            let updated = sqlx::query_as::<Postgres, AdRow>(&sql)
                .bind(ad_id)
                .bind(expected_version)
                .bind(&listing.shop_name)
                .bind(serde_json::to_value(&listing.contact)?)
                .bind(serde_json::to_value(&listing.location)?)
                .bind(serde_json::to_value(&listing.business)?)
                .bind(serde_json::to_value(&listing.schedule)?)
                .bind(&listing.video_url)
                .fetch_optional(&self.pool)
                .await?;

            if let Some(row) = updated {
                return Ok(row.into_listing()?);
            }
        }
        Err(AppError::Conflict(
            "Ad was modified concurrently, retry".to_string(),
        ))
    }

    /// Public search over visible, approved listings.
    #[tracing::instrument(skip(self), fields(db.table = "ads", db.operation = "select"))]
    pub async fn search_public(
        &self,
        filter: &AdFilter,
    ) -> Result<(Vec<AdListing>, i64), AppError> {
        let sql = format!(
            r#"
            SELECT {AD_COLUMNS} FROM ads
            WHERE visibility = 'visible' AND approval_status = 'approved'
              AND ($1::text IS NULL OR business->>'category' ILIKE $1)
              AND ($2::text IS NULL OR business->>'specialty' ILIKE $2)
              AND ($3::text IS NULL OR location->>'city' ILIKE $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        );
        let rows = sqlx::query_as::<Postgres, AdRow>(&sql)
            .bind(&filter.category)
            .bind(&filter.specialty)
            .bind(&filter.city)
            .bind(filter.limit())
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM ads
            WHERE visibility = 'visible' AND approval_status = 'approved'
              AND ($1::text IS NULL OR business->>'category' ILIKE $1)
              AND ($2::text IS NULL OR business->>'specialty' ILIKE $2)
              AND ($3::text IS NULL OR location->>'city' ILIKE $3)
            "#,
        )
        .bind(&filter.category)
        .bind(&filter.specialty)
        .bind(&filter.city)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows_into_listings(rows)?, total))
    }

    /// Visible carousel listings, newest first.
    #[tracing::instrument(skip(self), fields(db.table = "ads", db.operation = "select"))]
    pub async fn list_carousel(&self, limit: i64) -> Result<Vec<AdListing>, AppError> {
        let sql = format!(
            r#"
            SELECT {AD_COLUMNS} FROM ads
            WHERE visibility = 'visible' AND (settings->>'isCarousalAd')::boolean IS TRUE
            ORDER BY created_at DESC
            LIMIT $1
            "#
        );
        let rows = sqlx::query_as::<Postgres, AdRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows_into_listings(rows)
    }

    /// Visible featured listings, newest first.
    #[tracing::instrument(skip(self), fields(db.table = "ads", db.operation = "select"))]
    pub async fn list_featured(&self, limit: i64) -> Result<Vec<AdListing>, AppError> {
        let sql = format!(
            r#"
            SELECT {AD_COLUMNS} FROM ads
            WHERE visibility = 'visible' AND (settings->>'isTopAd')::boolean IS TRUE
            ORDER BY created_at DESC
            LIMIT $1
            "#
        );
        let rows = sqlx::query_as::<Postgres, AdRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows_into_listings(rows)
    }

    /// Moderation queue listing.
    #[tracing::instrument(skip(self), fields(db.table = "ads", db.operation = "select"))]
    pub async fn list_by_approval(
        &self,
        status: ApprovalStatus,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AdListing>, AppError> {
        let sql = format!(
            r#"
            SELECT {AD_COLUMNS} FROM ads
            WHERE approval_status = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<Postgres, AdRow>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows_into_listings(rows)
    }

    /// Visible listings with coordinates within `max_km` of the query
    /// point, closest first. Listings without stored coordinates never
    /// match.
    #[tracing::instrument(skip(self), fields(db.table = "ads", db.operation = "select"))]
    pub async fn list_nearby(
        &self,
        lat: f64,
        lng: f64,
        max_km: f64,
        limit: usize,
    ) -> Result<Vec<(AdListing, f64)>, AppError> {
        let sql = format!(
            r#"
            SELECT {AD_COLUMNS} FROM ads
            WHERE visibility = 'visible'
              AND location->>'lat' IS NOT NULL
              AND location->>'lng' IS NOT NULL
            "#
        );
        let rows = sqlx::query_as::<Postgres, AdRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let mut ranked = super::geo::rank_nearby(
            rows_into_listings(rows)?,
            |listing| listing.location.latitude.zip(listing.location.longitude),
            lat,
            lng,
            max_km,
        );
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Every listing owned by a user, regardless of visibility.
    #[tracing::instrument(skip(self), fields(db.table = "ads", db.operation = "select"))]
    pub async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<AdListing>, AppError> {
        let sql = format!(
            "SELECT {AD_COLUMNS} FROM ads WHERE owner_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<Postgres, AdRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        rows_into_listings(rows)
    }
}

#[async_trait]
impl AdStore for AdRepository {
    #[tracing::instrument(skip(self, ad), fields(db.table = "ads", db.operation = "insert"))]
    async fn insert(&self, ad: &NewAd) -> Result<AdListing, AppError> {
        let empty_reactions = json!({"count": 0, "userIds": []});
        let sql = format!(
            r#"
            INSERT INTO ads (
                owner_id, shop_name, contact, location, business, schedule, settings,
                video_url, images, approval_status, payment_status, visibility,
                likes, unlikes, recommendations, version, expires_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7,
                $8, '[]'::jsonb, 'pending', 'pending', 'hidden',
                $10, $10, $10, 1, $9
            )
            RETURNING {AD_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<Postgres, AdRow>(&sql)
            .bind(ad.owner_id)
            .bind(&ad.shop_name)
            .bind(serde_json::to_value(&ad.contact)?)
            .bind(serde_json::to_value(&ad.location)?)
            .bind(serde_json::to_value(&ad.business)?)
            .bind(serde_json::to_value(&ad.schedule)?)
            .bind(serde_json::to_value(&ad.settings)?)
            .bind(&ad.video_url)
            .bind(ad.expires_at)
            .bind(empty_reactions)
            .fetch_one(&self.pool)
            .await?;
        row.into_listing()
    }

    async fn get(&self, id: Uuid) -> Result<Option<AdListing>, AppError> {
        self.fetch(id).await
    }

    #[tracing::instrument(skip(self, images), fields(db.table = "ads", db.operation = "update", db.record_id = %id))]
    async fn set_images(&self, id: Uuid, images: &[StoredImageRef]) -> Result<(), AppError> {
        let affected = sqlx::query(
            "UPDATE ads SET images = $2, version = version + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(serde_json::to_value(images)?)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(AppError::NotFound(format!("Ad {} not found", id)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, session_id), fields(db.table = "ads", db.operation = "update", db.record_id = %id))]
    async fn set_payment_session(&self, id: Uuid, session_id: &str) -> Result<(), AppError> {
        let affected = sqlx::query(
            "UPDATE ads SET payment_session_id = $2, version = version + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(session_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(AppError::NotFound(format!("Ad {} not found", id)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "ads", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let affected = sqlx::query("DELETE FROM ads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    #[tracing::instrument(skip(self, session_id), fields(db.table = "ads", db.operation = "select"))]
    async fn find_by_payment_session(
        &self,
        session_id: &str,
    ) -> Result<Option<AdListing>, AppError> {
        let sql = format!("SELECT {AD_COLUMNS} FROM ads WHERE payment_session_id = $1");
        let row = sqlx::query_as::<Postgres, AdRow>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AdRow::into_listing).transpose()
    }

    #[tracing::instrument(skip(self, session_id), fields(db.table = "ads", db.operation = "update"))]
    async fn record_payment_completed(
        &self,
        session_id: &str,
    ) -> Result<Option<AdListing>, AppError> {
        let sql = format!(
            r#"
            UPDATE ads SET
                payment_status = 'paid',
                visibility = CASE
                    WHEN approval_status = 'approved' THEN 'visible'::visibility
                    ELSE visibility
                END,
                version = version + 1,
                updated_at = NOW()
            WHERE payment_session_id = $1
            RETURNING {AD_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<Postgres, AdRow>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AdRow::into_listing).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "ads", db.operation = "select"))]
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<AdListing>, AppError> {
        let sql = format!(
            r#"
            SELECT {AD_COLUMNS} FROM ads
            WHERE expires_at < $1
              AND visibility = 'hidden'
              AND (settings->>'isTopAd')::boolean IS NOT TRUE
              AND (settings->>'isCarousalAd')::boolean IS NOT TRUE
            "#
        );
        let rows = sqlx::query_as::<Postgres, AdRow>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        rows_into_listings(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_limit_clamped() {
        let filter = AdFilter {
            per_page: 0,
            page: 1,
            ..Default::default()
        };
        assert_eq!(filter.limit(), 1);

        let filter = AdFilter {
            per_page: 1000,
            page: 1,
            ..Default::default()
        };
        assert_eq!(filter.limit(), 100);
    }

    #[test]
    fn test_filter_offset_from_page() {
        let filter = AdFilter {
            per_page: 20,
            page: 3,
            ..Default::default()
        };
        assert_eq!(filter.offset(), 40);

        let filter = AdFilter {
            per_page: 20,
            page: 0,
            ..Default::default()
        };
        assert_eq!(filter.offset(), 0);
    }
}
