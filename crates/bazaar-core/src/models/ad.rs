use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Admin moderation status of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "approval_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Whether the checkout for a listing has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "payment_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

/// Public visibility of a listing. A listing becomes visible only once it is
/// both approved and paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "visibility", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Hidden,
    Visible,
}

/// Contact details for the advertised business.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
pub struct ContactInfo {
    pub address: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub phone: String,
    pub whatsapp: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub google_map_location: Option<String>,
    /// Decimal degrees; both must be present for nearby search to find
    /// the listing.
    #[serde(rename = "lat")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[serde(rename = "lng")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    pub district: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInfo {
    /// Classification used for price matching.
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub specialty: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub halal_available: bool,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[serde(default)]
    pub menu_options: Vec<String>,
}

/// Opening hours, one free-form entry per weekday.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct Schedule {
    pub mon: Option<String>,
    pub tue: Option<String>,
    pub wed: Option<String>,
    pub thu: Option<String>,
    pub fri: Option<String>,
    pub sat: Option<String>,
    pub sun: Option<String>,
}

/// Promotional placement flags. These drive price classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, Default)]
pub struct AdSettings {
    #[serde(rename = "isTopAd", default)]
    pub featured: bool,
    #[serde(rename = "isCarousalAd", default)]
    pub carousel: bool,
    #[serde(rename = "hasHalal", default)]
    pub has_halal: bool,
}

impl AdSettings {
    /// Featured and carousel listings are exempt from the expiry sweep.
    pub fn is_promoted(&self) -> bool {
        self.featured || self.carousel
    }
}

/// A stored image: where clients fetch it and the handle needed to delete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredImageRef {
    pub url: String,
    pub delete_handle: String,
}

/// Moderation state plus the audit fields set when an admin decides.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalInfo {
    pub status: ApprovalStatus,
    pub admin_id: Option<Uuid>,
    pub admin_comment: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl Default for ApprovalInfo {
    fn default() -> Self {
        ApprovalInfo {
            status: ApprovalStatus::Pending,
            admin_id: None,
            admin_comment: None,
            approved_at: None,
        }
    }
}

/// A reaction counter plus the users who contributed to it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReactionGroup {
    pub count: i64,
    pub user_ids: Vec<Uuid>,
}

impl ReactionGroup {
    pub fn contains(&self, user_id: Uuid) -> bool {
        self.user_ids.contains(&user_id)
    }
}

/// Client-submitted listing content, validated once at the boundary before
/// anything is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdSubmission {
    #[validate(length(min = 1, max = 200))]
    pub shop_name: String,
    #[validate(nested)]
    pub contact: ContactInfo,
    #[validate(nested)]
    pub location: LocationInfo,
    #[validate(nested)]
    pub business: BusinessInfo,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub ad_settings: AdSettings,
    #[validate(url)]
    pub video_url: Option<String>,
}

/// Normalized listing handed to the store for insert. The store assigns the
/// id and the lifecycle defaults (pending, hidden, zeroed reactions).
#[derive(Debug, Clone)]
pub struct NewAd {
    pub owner_id: Uuid,
    pub shop_name: String,
    pub contact: ContactInfo,
    pub location: LocationInfo,
    pub business: BusinessInfo,
    pub schedule: Schedule,
    pub settings: AdSettings,
    pub video_url: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl NewAd {
    /// Normalize a validated submission. `retention_days` sets the expiry
    /// horizon relative to now.
    pub fn from_submission(owner_id: Uuid, submission: AdSubmission, retention_days: i64) -> Self {
        NewAd {
            owner_id,
            shop_name: submission.shop_name.trim().to_string(),
            contact: submission.contact,
            location: submission.location,
            business: submission.business,
            schedule: submission.schedule,
            settings: submission.ad_settings,
            video_url: submission.video_url,
            expires_at: Utc::now() + Duration::days(retention_days),
        }
    }
}

/// A persisted listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdListing {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub shop_name: String,
    pub contact: ContactInfo,
    pub location: LocationInfo,
    pub business: BusinessInfo,
    pub schedule: Schedule,
    pub settings: AdSettings,
    pub video_url: Option<String>,
    pub images: Vec<StoredImageRef>,
    pub approval: ApprovalInfo,
    pub payment_status: PaymentStatus,
    pub visibility: Visibility,
    pub payment_session_id: Option<String>,
    pub likes: ReactionGroup,
    pub unlikes: ReactionGroup,
    pub recommendations: ReactionGroup,
    pub version: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdListing {
    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }

    /// First image URL, used by preview responses.
    pub fn cover_image_url(&self) -> Option<&str> {
        self.images.first().map(|i| i.url.as_str())
    }
}

/// Owner-editable content fields. `None` leaves the stored value untouched.
///
/// Placement flags are deliberately absent: featured/carousel tiers are what
/// the checkout amount paid for, so they are fixed at publication.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdContentUpdate {
    #[validate(length(min = 1, max = 200))]
    pub shop_name: Option<String>,
    #[validate(nested)]
    pub contact: Option<ContactInfo>,
    #[validate(nested)]
    pub location: Option<LocationInfo>,
    #[validate(nested)]
    pub business: Option<BusinessInfo>,
    pub schedule: Option<Schedule>,
    #[validate(url)]
    pub video_url: Option<String>,
}

impl AdContentUpdate {
    pub fn is_empty(&self) -> bool {
        self.shop_name.is_none()
            && self.contact.is_none()
            && self.location.is_none()
            && self.business.is_none()
            && self.schedule.is_none()
            && self.video_url.is_none()
    }
}
