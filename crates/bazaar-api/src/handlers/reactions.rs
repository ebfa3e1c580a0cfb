//! Reaction handlers: like, unlike, recommend.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use bazaar_core::models::ReactionGroup;

use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ReactionResponse {
    pub message: String,
    pub likes: ReactionGroup,
    pub unlikes: ReactionGroup,
    pub recommendations: ReactionGroup,
}

/// Toggle a like; a prior unlike from the same user is withdrawn.
#[utoipa::path(
    post,
    path = "/api/v0/ads/{id}/like",
    tag = "reactions",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Reaction applied", body = ReactionResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Concurrent modification", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %user.user_id, ad_id = %id))]
pub async fn like_ad(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ReactionResponse>, HttpAppError> {
    let (listing, outcome) = state.db.ads.toggle_like(id, user.user_id).await?;
    Ok(Json(ReactionResponse {
        message: outcome.message().to_string(),
        likes: listing.likes,
        unlikes: listing.unlikes,
        recommendations: listing.recommendations,
    }))
}

/// Toggle an unlike; a prior like from the same user is withdrawn.
#[utoipa::path(
    post,
    path = "/api/v0/ads/{id}/unlike",
    tag = "reactions",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Reaction applied", body = ReactionResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Concurrent modification", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %user.user_id, ad_id = %id))]
pub async fn unlike_ad(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ReactionResponse>, HttpAppError> {
    let (listing, outcome) = state.db.ads.toggle_unlike(id, user.user_id).await?;
    Ok(Json(ReactionResponse {
        message: outcome.message().to_string(),
        likes: listing.likes,
        unlikes: listing.unlikes,
        recommendations: listing.recommendations,
    }))
}

/// Recommend once per user; a repeat recommend is a 400.
#[utoipa::path(
    post,
    path = "/api/v0/ads/{id}/recommend",
    tag = "reactions",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Reaction applied", body = ReactionResponse),
        (status = 400, description = "Already recommended", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %user.user_id, ad_id = %id))]
pub async fn recommend_ad(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ReactionResponse>, HttpAppError> {
    let (listing, outcome) = state.db.ads.recommend(id, user.user_id).await?;
    Ok(Json(ReactionResponse {
        message: outcome.message().to_string(),
        likes: listing.likes,
        unlikes: listing.unlikes,
        recommendations: listing.recommendations,
    }))
}
