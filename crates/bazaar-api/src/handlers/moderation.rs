//! Admin moderation handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use bazaar_core::models::{AdListing, ApprovalStatus};
use bazaar_core::AppError;

use crate::auth::AdminContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ApprovalRequest {
    pub status: ApprovalStatus,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueQuery {
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

/// Record an approval decision and recompute visibility. An audit row is
/// written for every decision.
#[utoipa::path(
    post,
    path = "/api/v0/ads/{id}/approval",
    tag = "moderation",
    params(("id" = Uuid, Path, description = "Listing id")),
    request_body = ApprovalRequest,
    responses(
        (status = 200, description = "Updated listing", body = AdListing),
        (status = 400, description = "Invalid decision", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request), fields(admin_id = %admin.0.user_id, ad_id = %id))]
pub async fn set_approval(
    State(state): State<Arc<AppState>>,
    admin: AdminContext,
    Path(id): Path<Uuid>,
    Json(request): Json<ApprovalRequest>,
) -> Result<Json<AdListing>, HttpAppError> {
    if request.status == ApprovalStatus::Pending {
        return Err(
            AppError::InvalidInput("Decision must be approved or rejected".to_string()).into(),
        );
    }

    let listing = state
        .db
        .ads
        .set_approval(id, request.status, admin.0.user_id, request.comment.clone())
        .await?;

    state
        .db
        .approvals
        .record_decision(id, admin.0.user_id, request.status, request.comment)
        .await?;

    tracing::info!(
        ad_id = %id,
        status = ?request.status,
        visibility = ?listing.visibility,
        "moderation decision recorded"
    );

    Ok(Json(listing))
}

/// Moderation queue, filtered by approval status.
#[utoipa::path(
    get,
    path = "/api/v0/ads/moderation/{status}",
    tag = "moderation",
    params(
        ("status" = String, Path, description = "pending, approved or rejected"),
        ("page" = Option<u32>, Query, description = "Page number, 1-based"),
        ("perPage" = Option<u32>, Query, description = "Page size, max 100")
    ),
    responses(
        (status = 200, description = "Listings in the given state", body = [AdListing]),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_by_status(
    State(state): State<Arc<AppState>>,
    _admin: AdminContext,
    Path(status): Path<String>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<Vec<AdListing>>, HttpAppError> {
    let status = match status.as_str() {
        "pending" => ApprovalStatus::Pending,
        "approved" => ApprovalStatus::Approved,
        "rejected" => ApprovalStatus::Rejected,
        other => {
            return Err(
                AppError::InvalidInput(format!("Unknown approval status '{}'", other)).into(),
            )
        }
    };

    let limit = i64::from(query.per_page.clamp(1, 100));
    let offset = i64::from(query.page.saturating_sub(1)) * limit;
    let ads = state.db.ads.list_by_approval(status, limit, offset).await?;
    Ok(Json(ads))
}
