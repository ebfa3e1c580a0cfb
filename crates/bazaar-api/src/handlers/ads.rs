//! Listing handlers: creation, retrieval, owner updates, deletion.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use bazaar_core::models::{AdContentUpdate, AdListing, AdSubmission};
use bazaar_core::AppError;
use bazaar_db::{AdFilter, AdStore};
use bazaar_services::ImageUpload;

use crate::auth::{OptionalUserContext, UserContext};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

const PREVIEW_LIMIT: i64 = 20;

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentInfo {
    pub checkout_url: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateAdResponse {
    pub message: String,
    pub ad_id: Uuid,
    pub images: Vec<String>,
    pub payment: PaymentInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub category: Option<String>,
    pub specialty: Option<String>,
    pub city: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdListResponse {
    pub ads: Vec<AdListing>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_radius_km")]
    pub max_distance_km: f64,
}

fn default_radius_km() -> f64 {
    10.0
}

/// Preview of a listing close to the query point.
#[derive(Debug, Serialize, ToSchema)]
pub struct NearbyAd {
    pub ad_id: Uuid,
    pub shop_name: String,
    pub image_url: Option<String>,
    pub city: String,
    pub district: Option<String>,
    pub category: String,
    pub phone: String,
    pub distance_km: f64,
}

impl NearbyAd {
    fn from_ranked(listing: AdListing, distance_km: f64) -> Self {
        NearbyAd {
            ad_id: listing.id,
            shop_name: listing.shop_name.clone(),
            image_url: listing.cover_image_url().map(str::to_string),
            city: listing.location.city.clone(),
            district: listing.location.district.clone(),
            category: listing.business.category.clone(),
            phone: listing.contact.phone.clone(),
            distance_km,
        }
    }
}

/// Pull the submission, image files and coupon out of the multipart body.
/// Expected parts: one `data` JSON part, repeated `images` file parts,
/// optional `coupon_code` text part.
async fn parse_create_multipart(
    mut multipart: Multipart,
) -> Result<(AdSubmission, Vec<ImageUpload>, Option<String>), AppError> {
    let mut submission: Option<AdSubmission> = None;
    let mut files = Vec::new();
    let mut coupon_code = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("data") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Unreadable data part: {}", e)))?;
                submission = Some(serde_json::from_str(&text)?);
            }
            Some("images") => {
                let filename = field
                    .file_name()
                    .unwrap_or("upload")
                    .to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Unreadable image part: {}", e)))?;
                files.push(ImageUpload {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            Some("coupon_code") => {
                let text = field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Unreadable coupon part: {}", e))
                })?;
                let text = text.trim().to_string();
                if !text.is_empty() {
                    coupon_code = Some(text);
                }
            }
            _ => {}
        }
    }

    let submission =
        submission.ok_or_else(|| AppError::InvalidInput("Missing 'data' part".to_string()))?;
    Ok((submission, files, coupon_code))
}

/// Create a listing and open its checkout session.
#[utoipa::path(
    post,
    path = "/api/v0/ads",
    tag = "ads",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Ad created, payment pending", body = CreateAdResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unknown or inactive caller", body = ErrorResponse),
        (status = 404, description = "No matching price entries", body = ErrorResponse),
        (status = 500, description = "Gateway or internal failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = %user.user_id, operation = "create_ad"))]
pub async fn create_ad(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreateAdResponse>), HttpAppError> {
    let (submission, files, coupon_code) = parse_create_multipart(multipart).await?;

    let outcome = state
        .publication
        .publish(user.user_id, submission, files, coupon_code)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateAdResponse {
            message: "Ad created, complete payment to publish".to_string(),
            ad_id: outcome.ad_id,
            images: outcome.image_urls,
            payment: PaymentInfo {
                checkout_url: outcome.checkout_url,
                session_id: outcome.session_id,
            },
        }),
    ))
}

/// Fetch one listing. Hidden listings are visible only to their owner and
/// to admins; everyone else gets 404.
#[utoipa::path(
    get,
    path = "/api/v0/ads/{id}",
    tag = "ads",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing", body = AdListing),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn get_ad(
    State(state): State<Arc<AppState>>,
    OptionalUserContext(caller): OptionalUserContext,
    Path(id): Path<Uuid>,
) -> Result<Json<AdListing>, HttpAppError> {
    let listing = state
        .db
        .ads
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ad {} not found", id)))?;

    if !listing.is_visible() {
        let allowed = caller
            .map(|c| c.is_admin() || c.user_id == listing.owner_id)
            .unwrap_or(false);
        if !allowed {
            return Err(AppError::NotFound(format!("Ad {} not found", id)).into());
        }
    }

    Ok(Json(listing))
}

/// Public search over visible, approved listings.
#[utoipa::path(
    get,
    path = "/api/v0/ads",
    tag = "ads",
    params(
        ("category" = Option<String>, Query, description = "Business category filter"),
        ("specialty" = Option<String>, Query, description = "Specialty filter"),
        ("city" = Option<String>, Query, description = "City filter"),
        ("page" = Option<u32>, Query, description = "Page number, 1-based"),
        ("perPage" = Option<u32>, Query, description = "Page size, max 100")
    ),
    responses((status = 200, description = "Matching listings", body = AdListResponse))
)]
pub async fn search_ads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<AdListResponse>, HttpAppError> {
    let filter = AdFilter {
        category: query.category,
        specialty: query.specialty,
        city: query.city,
        page: query.page,
        per_page: query.per_page,
    };
    let (ads, total) = state.db.ads.search_public(&filter).await?;
    Ok(Json(AdListResponse {
        ads,
        total,
        page: query.page,
        per_page: query.per_page,
    }))
}

/// Visible listings near a point, closest first. Listings without stored
/// coordinates never match.
#[utoipa::path(
    get,
    path = "/api/v0/ads/nearby",
    tag = "ads",
    params(
        ("lat" = f64, Query, description = "Latitude of the query point"),
        ("lng" = f64, Query, description = "Longitude of the query point"),
        ("maxDistanceKm" = Option<f64>, Query, description = "Search radius in kilometers, default 10")
    ),
    responses(
        (status = 200, description = "Nearby listings, closest first", body = [NearbyAd]),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse)
    )
)]
pub async fn list_nearby(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyAd>>, HttpAppError> {
    if !(-90.0..=90.0).contains(&query.lat) || !(-180.0..=180.0).contains(&query.lng) {
        return Err(AppError::InvalidInput("Coordinates out of range".to_string()).into());
    }
    if query.max_distance_km <= 0.0 {
        return Err(AppError::InvalidInput("Radius must be positive".to_string()).into());
    }

    let ranked = state
        .db
        .ads
        .list_nearby(query.lat, query.lng, query.max_distance_km, PREVIEW_LIMIT as usize)
        .await?;

    Ok(Json(
        ranked
            .into_iter()
            .map(|(listing, distance)| NearbyAd::from_ranked(listing, distance))
            .collect(),
    ))
}

/// Visible carousel listings.
#[utoipa::path(
    get,
    path = "/api/v0/ads/carousel",
    tag = "ads",
    responses((status = 200, description = "Carousel listings", body = [AdListing]))
)]
pub async fn list_carousel(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AdListing>>, HttpAppError> {
    let ads = state.db.ads.list_carousel(PREVIEW_LIMIT).await?;
    Ok(Json(ads))
}

/// Visible featured listings.
#[utoipa::path(
    get,
    path = "/api/v0/ads/featured",
    tag = "ads",
    responses((status = 200, description = "Featured listings", body = [AdListing]))
)]
pub async fn list_featured(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AdListing>>, HttpAppError> {
    let ads = state.db.ads.list_featured(PREVIEW_LIMIT).await?;
    Ok(Json(ads))
}

/// Every listing owned by the caller, regardless of visibility.
#[utoipa::path(
    get,
    path = "/api/v0/ads/mine",
    tag = "ads",
    responses((status = 200, description = "Caller's listings", body = [AdListing])),
    security(("bearer_auth" = []))
)]
pub async fn list_mine(
    State(state): State<Arc<AppState>>,
    user: UserContext,
) -> Result<Json<Vec<AdListing>>, HttpAppError> {
    let ads = state.db.ads.list_by_owner(user.user_id).await?;
    Ok(Json(ads))
}

/// Owner edit of content fields. Absent fields keep their stored value.
#[utoipa::path(
    put,
    path = "/api/v0/ads/{id}",
    tag = "ads",
    params(("id" = Uuid, Path, description = "Listing id")),
    request_body = AdContentUpdate,
    responses(
        (status = 200, description = "Updated listing", body = AdListing),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Concurrent modification", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, update), fields(user_id = %user.user_id, ad_id = %id))]
pub async fn update_ad(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(id): Path<Uuid>,
    Json(update): Json<AdContentUpdate>,
) -> Result<Json<AdListing>, HttpAppError> {
    if update.is_empty() {
        return Err(AppError::InvalidInput("No fields to update".to_string()).into());
    }
    update.validate().map_err(AppError::from)?;

    let listing = state.db.ads.update_content(id, user.user_id, &update).await?;
    Ok(Json(listing))
}

/// Delete a listing and best-effort delete its stored images. Owner or
/// admin only.
#[utoipa::path(
    delete,
    path = "/api/v0/ads/{id}",
    tag = "ads",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %user.user_id, ad_id = %id))]
pub async fn delete_ad(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    let listing = state
        .db
        .ads
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ad {} not found", id)))?;

    if listing.owner_id != user.user_id && !user.is_admin() {
        return Err(AppError::Forbidden("Only the owner can delete this ad".to_string()).into());
    }

    state.db.ads.delete(id).await?;
    for image in &listing.images {
        if let Err(e) = state.images.delete(&image.delete_handle).await {
            tracing::warn!(
                ad_id = %id,
                delete_handle = %image.delete_handle,
                error = %e,
                "failed to delete image of removed listing"
            );
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
