//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use bazaar_core::models;

pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bazaar API",
        version = "0.1.0",
        description = "Classified-ads marketplace backend with payment-gated publishing, admin moderation and reactions. All endpoints are versioned under /api/v0/."
    ),
    paths(
        // Ads
        handlers::ads::create_ad,
        handlers::ads::get_ad,
        handlers::ads::search_ads,
        handlers::ads::list_nearby,
        handlers::ads::list_carousel,
        handlers::ads::list_featured,
        handlers::ads::list_mine,
        handlers::ads::update_ad,
        handlers::ads::delete_ad,
        // Reactions
        handlers::reactions::like_ad,
        handlers::reactions::unlike_ad,
        handlers::reactions::recommend_ad,
        // Moderation
        handlers::moderation::set_approval,
        handlers::moderation::list_by_status,
        // Payments
        handlers::payments::handle_webhook,
        handlers::pricing::list_prices,
        // Health
        handlers::health::health_check,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::ads::CreateAdResponse,
        handlers::ads::PaymentInfo,
        handlers::ads::AdListResponse,
        handlers::ads::NearbyAd,
        handlers::reactions::ReactionResponse,
        handlers::moderation::ApprovalRequest,
        handlers::pricing::PriceItem,
        handlers::health::HealthResponse,
        models::AdListing,
        models::AdSubmission,
        models::AdContentUpdate,
        models::AdSettings,
        models::ApprovalInfo,
        models::ApprovalStatus,
        models::BusinessInfo,
        models::ContactInfo,
        models::LocationInfo,
        models::PaymentStatus,
        models::ReactionGroup,
        models::Schedule,
        models::StoredImageRef,
        models::Visibility,
    )),
    tags(
        (name = "ads", description = "Listing creation, retrieval and updates"),
        (name = "reactions", description = "Likes, unlikes and recommendations"),
        (name = "moderation", description = "Admin approval workflow"),
        (name = "payments", description = "Checkout and webhook integration"),
        (name = "pricing", description = "Active price catalog"),
        (name = "health", description = "Service health"),
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_contains_core_paths() {
        let spec = openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/v0/ads"));
        assert!(spec.paths.paths.contains_key("/api/v0/ads/nearby"));
        assert!(spec.paths.paths.contains_key("/api/v0/payments/webhook"));
        assert!(spec.paths.paths.contains_key("/api/v0/health"));
    }
}
