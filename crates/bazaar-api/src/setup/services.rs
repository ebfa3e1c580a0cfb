//! Service and repository wiring.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tokio::task::JoinHandle;

use bazaar_core::Config;
use bazaar_db::{AdRepository, ApprovalRepository, UserRepository};
use bazaar_payments::{PaymentGateway, PricingSource, StripeGateway};
use bazaar_processing::{ImageValidator, Watermarker};
use bazaar_services::{
    AdPublicationService, ExpirySweeper, PaymentEventService, PublicationConfig,
};
use bazaar_storage::create_image_store;

use crate::state::{AppState, AuthConfig, DbState, PaymentState};

/// Build every repository and service and assemble the application state.
/// The returned handle, if any, owns the background sweeper task; the
/// caller aborts it on shutdown.
pub async fn initialize_services(
    config: &Config,
    pool: PgPool,
) -> Result<(Arc<AppState>, Option<JoinHandle<()>>)> {
    let ads = AdRepository::new(pool.clone());
    let approvals = ApprovalRepository::new(pool.clone());
    let users = UserRepository::new(pool.clone());

    let images = create_image_store(config)
        .await
        .context("Failed to initialize image store")?;
    tracing::info!(backend = ?images.backend_type(), "Image store ready");

    let validator = ImageValidator::new(
        config.max_image_size_bytes,
        config.image_allowed_extensions.clone(),
        config.image_allowed_content_types.clone(),
    );
    let watermarker = load_watermarker(config).await?;

    let gateway = Arc::new(
        StripeGateway::new(
            config.stripe_secret_key.clone(),
            config.checkout_success_url.clone(),
            config.checkout_cancel_url.clone(),
        )
        .context("Failed to initialize payment gateway")?,
    );
    let pricing: Arc<dyn PricingSource> = gateway.clone();
    let payment_gateway: Arc<dyn PaymentGateway> = gateway;

    let publication = Arc::new(AdPublicationService::new(
        Arc::new(users),
        Arc::new(ads.clone()),
        images.clone(),
        pricing.clone(),
        payment_gateway,
        validator,
        watermarker,
        PublicationConfig {
            currency: config.currency.clone(),
            worldwide_category: config.worldwide_category.clone(),
            retention_days: config.listing_retention_days,
        },
    ));

    let events = Arc::new(PaymentEventService::new(
        Arc::new(ads.clone()),
        images.clone(),
    ));

    let sweeper_handle = if config.cleanup_enabled {
        let sweeper = Arc::new(ExpirySweeper::new(
            Arc::new(ads.clone()),
            images.clone(),
            config.cleanup_interval_secs,
        ));
        Some(sweeper.start())
    } else {
        tracing::info!("expired listing sweeper disabled");
        None
    };

    let state = Arc::new(AppState {
        db: DbState {
            pool,
            ads,
            approvals,
        },
        payments: PaymentState {
            events,
            pricing,
            webhook_secret: config.stripe_webhook_secret.clone(),
        },
        auth: AuthConfig {
            jwt_secret: config.jwt_secret.clone(),
        },
        publication,
        images,
    });

    Ok((state, sweeper_handle))
}

/// Load the watermark overlay if one is configured. A configured-but-missing
/// overlay file is a startup error; no configuration means unstamped images.
async fn load_watermarker(config: &Config) -> Result<Option<Watermarker>> {
    match &config.watermark_path {
        Some(path) => {
            let overlay = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read watermark overlay at {}", path))?;
            tracing::info!(
                path = %path,
                scale_percent = config.watermark_scale_percent,
                opacity = config.watermark_opacity,
                "Watermark overlay loaded"
            );
            Ok(Some(Watermarker::new(
                overlay,
                config.watermark_scale_percent,
                config.watermark_opacity,
            )))
        }
        None => Ok(None),
    }
}
