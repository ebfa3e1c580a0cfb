//! Row mapping for the `ads` table.
//!
//! Nested listing content lives in JSONB columns; lifecycle fields that
//! queries filter on (approval, payment, visibility) are real columns.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use bazaar_core::models::{
    AdListing, AdSettings, ApprovalInfo, ApprovalStatus, BusinessInfo, ContactInfo, LocationInfo,
    PaymentStatus, ReactionGroup, Schedule, StoredImageRef, Visibility,
};
use bazaar_core::AppError;

/// Column list shared by every query that returns full listings.
pub const AD_COLUMNS: &str = "id, owner_id, shop_name, contact, location, business, schedule, \
     settings, video_url, images, approval_status, approval_admin_id, approval_admin_comment, \
     approved_at, payment_status, visibility, payment_session_id, likes, unlikes, \
     recommendations, version, expires_at, created_at, updated_at";

#[derive(Debug, FromRow)]
pub struct AdRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub shop_name: String,
    pub contact: JsonValue,
    pub location: JsonValue,
    pub business: JsonValue,
    pub schedule: JsonValue,
    pub settings: JsonValue,
    pub video_url: Option<String>,
    pub images: JsonValue,
    pub approval_status: ApprovalStatus,
    pub approval_admin_id: Option<Uuid>,
    pub approval_admin_comment: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub payment_status: PaymentStatus,
    pub visibility: Visibility,
    pub payment_session_id: Option<String>,
    pub likes: JsonValue,
    pub unlikes: JsonValue,
    pub recommendations: JsonValue,
    pub version: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn parse_column<T: DeserializeOwned>(value: JsonValue, column: &str) -> Result<T, AppError> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Internal(format!("corrupt {} column: {}", column, e)))
}

impl AdRow {
    pub fn into_listing(self) -> Result<AdListing, AppError> {
        let contact: ContactInfo = parse_column(self.contact, "contact")?;
        let location: LocationInfo = parse_column(self.location, "location")?;
        let business: BusinessInfo = parse_column(self.business, "business")?;
        let schedule: Schedule = parse_column(self.schedule, "schedule")?;
        let settings: AdSettings = parse_column(self.settings, "settings")?;
        let images: Vec<StoredImageRef> = parse_column(self.images, "images")?;
        let likes: ReactionGroup = parse_column(self.likes, "likes")?;
        let unlikes: ReactionGroup = parse_column(self.unlikes, "unlikes")?;
        let recommendations: ReactionGroup = parse_column(self.recommendations, "recommendations")?;

        Ok(AdListing {
            id: self.id,
            owner_id: self.owner_id,
            shop_name: self.shop_name,
            contact,
            location,
            business,
            schedule,
            settings,
            video_url: self.video_url,
            images,
            approval: ApprovalInfo {
                status: self.approval_status,
                admin_id: self.approval_admin_id,
                admin_comment: self.approval_admin_comment,
                approved_at: self.approved_at,
            },
            payment_status: self.payment_status,
            visibility: self.visibility,
            payment_session_id: self.payment_session_id,
            likes,
            unlikes,
            recommendations,
            version: self.version,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub fn rows_into_listings(rows: Vec<AdRow>) -> Result<Vec<AdListing>, AppError> {
    rows.into_iter().map(AdRow::into_listing).collect()
}
