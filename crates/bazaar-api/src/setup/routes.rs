//! Route configuration and setup.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use bazaar_core::Config;

use crate::handlers;
use crate::state::AppState;

const API_PREFIX: &str = "/api/v0";

// Headroom over the per-image limit so a multi-image submission fits.
const BODY_LIMIT_IMAGES: usize = 10;

/// Setup all application routes.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let app = Router::new()
        .merge(ad_routes())
        .merge(payment_routes())
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::openapi_spec()) }),
        )
        .layer(RequestBodyLimitLayer::new(
            config.max_image_size_bytes * BODY_LIMIT_IMAGES,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();
        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    };
    Ok(cors)
}

fn ad_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/ads", API_PREFIX),
            post(handlers::ads::create_ad).get(handlers::ads::search_ads),
        )
        .route(
            &format!("{}/ads/nearby", API_PREFIX),
            get(handlers::ads::list_nearby),
        )
        .route(
            &format!("{}/ads/carousel", API_PREFIX),
            get(handlers::ads::list_carousel),
        )
        .route(
            &format!("{}/ads/featured", API_PREFIX),
            get(handlers::ads::list_featured),
        )
        .route(
            &format!("{}/ads/mine", API_PREFIX),
            get(handlers::ads::list_mine),
        )
        .route(
            &format!("{}/ads/moderation/{{status}}", API_PREFIX),
            get(handlers::moderation::list_by_status),
        )
        .route(
            &format!("{}/ads/{{id}}", API_PREFIX),
            get(handlers::ads::get_ad),
        )
        .route(
            &format!("{}/ads/{{id}}", API_PREFIX),
            put(handlers::ads::update_ad),
        )
        .route(
            &format!("{}/ads/{{id}}", API_PREFIX),
            delete(handlers::ads::delete_ad),
        )
        .route(
            &format!("{}/ads/{{id}}/like", API_PREFIX),
            post(handlers::reactions::like_ad),
        )
        .route(
            &format!("{}/ads/{{id}}/unlike", API_PREFIX),
            post(handlers::reactions::unlike_ad),
        )
        .route(
            &format!("{}/ads/{{id}}/recommend", API_PREFIX),
            post(handlers::reactions::recommend_ad),
        )
        .route(
            &format!("{}/ads/{{id}}/approval", API_PREFIX),
            post(handlers::moderation::set_approval),
        )
}

fn payment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/payments/webhook", API_PREFIX),
            post(handlers::payments::handle_webhook),
        )
        .route(
            &format!("{}/pricing", API_PREFIX),
            get(handlers::pricing::list_prices),
        )
        .route(
            &format!("{}/health", API_PREFIX),
            get(handlers::health::health_check),
        )
}
