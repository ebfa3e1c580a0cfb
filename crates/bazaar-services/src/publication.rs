//! The payment-gated ad publication workflow.
//!
//! Ordering is fixed: resolve submitter, validate, price, insert, upload
//! images, open checkout. The listing row is the first side effect; any
//! failure after it runs the compensation path, which removes the row and
//! best-effort deletes every uploaded image.

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use bazaar_core::models::{AdSubmission, NewAd, StoredImageRef};
use bazaar_core::AppError;
use bazaar_db::AdStore;
use bazaar_db::UserDirectory;
use bazaar_payments::{CheckoutRequest, GatewayError, PaymentGateway, PricingSource};
use bazaar_processing::{ImageValidator, Watermarker};
use bazaar_storage::ImageStore;

use crate::pricing::classify_pricing;

/// Failure taxonomy of the publication workflow.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No pricing available: {0}")]
    NoPricingAvailable(String),

    #[error("Payment initiation failed: {0}")]
    PaymentInitiationFailed(String),

    #[error("Ad creation failed: {0}")]
    CreationFailed(String),
}

impl From<PublishError> for AppError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Unauthorized(msg) => AppError::Unauthorized(msg),
            PublishError::InvalidInput(msg) => AppError::InvalidInput(msg),
            PublishError::NoPricingAvailable(msg) => AppError::NoPricingMatch(msg),
            PublishError::PaymentInitiationFailed(msg) => AppError::PaymentGateway(msg),
            PublishError::CreationFailed(msg) => AppError::Internal(msg),
        }
    }
}

/// One uploaded image file, already read out of the request body.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Successful workflow result.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub ad_id: Uuid,
    pub image_urls: Vec<String>,
    pub checkout_url: String,
    pub session_id: String,
}

/// Tunables the workflow needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct PublicationConfig {
    pub currency: String,
    pub worldwide_category: String,
    pub retention_days: i64,
}

pub struct AdPublicationService {
    users: Arc<dyn UserDirectory>,
    ads: Arc<dyn AdStore>,
    images: Arc<dyn ImageStore>,
    pricing: Arc<dyn PricingSource>,
    gateway: Arc<dyn PaymentGateway>,
    validator: ImageValidator,
    watermarker: Option<Watermarker>,
    config: PublicationConfig,
}

impl AdPublicationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        ads: Arc<dyn AdStore>,
        images: Arc<dyn ImageStore>,
        pricing: Arc<dyn PricingSource>,
        gateway: Arc<dyn PaymentGateway>,
        validator: ImageValidator,
        watermarker: Option<Watermarker>,
        config: PublicationConfig,
    ) -> Self {
        if watermarker.is_none() {
            tracing::warn!("no watermark overlay configured, images will be stored unstamped");
        }
        Self {
            users,
            ads,
            images,
            pricing,
            gateway,
            validator,
            watermarker,
            config,
        }
    }

    /// Run the full workflow. Not idempotent: each call that reaches the
    /// insert creates a new listing.
    #[tracing::instrument(skip(self, submission, files, coupon_code), fields(submitter = %submitter, files = files.len()))]
    pub async fn publish(
        &self,
        submitter: Uuid,
        submission: AdSubmission,
        files: Vec<ImageUpload>,
        coupon_code: Option<String>,
    ) -> Result<PublishOutcome, PublishError> {
        // 1. Resolve the submitter before anything else.
        let user = self
            .users
            .find_active(submitter)
            .await
            .map_err(|e| PublishError::CreationFailed(e.to_string()))?
            .ok_or_else(|| {
                PublishError::Unauthorized("User not found or inactive".to_string())
            })?;

        // 2. Validate once, at the boundary. Nothing persisted yet.
        submission
            .validate()
            .map_err(|e| PublishError::InvalidInput(e.to_string()))?;

        // 3. Price the submission. An empty match aborts with nothing stored.
        // Nothing is persisted yet, so a catalog outage is not a payment
        // initiation failure.
        let catalog = self.pricing.list_active_prices().await.map_err(|e| {
            PublishError::CreationFailed(format!("price catalog unavailable: {}", e))
        })?;
        let quote = classify_pricing(
            &submission.ad_settings,
            &submission.business.category,
            &self.config.worldwide_category,
            &catalog,
        );
        if quote.is_empty() {
            return Err(PublishError::NoPricingAvailable(
                "no active price entries match the ad settings".to_string(),
            ));
        }

        // 4. Insert the listing. First side effect.
        let new_ad = NewAd::from_submission(submitter, submission, self.config.retention_days);
        let description = new_ad
            .business
            .description
            .clone()
            .unwrap_or_else(|| format!("Ad for {}", new_ad.shop_name));
        let listing = self
            .ads
            .insert(&new_ad)
            .await
            .map_err(|e| PublishError::CreationFailed(e.to_string()))?;
        let ad_id = listing.id;

        // 5. Upload images, then persist the list. Per-file failures are
        // skipped; a database failure here rolls everything back.
        let stored = self.upload_images(ad_id, files).await;
        if let Err(e) = self.ads.set_images(ad_id, &stored).await {
            self.compensate(ad_id, &stored).await;
            return Err(PublishError::CreationFailed(format!(
                "failed to persist image list: {}",
                e
            )));
        }

        // 6. Open the checkout session.
        if quote.amount_minor <= 0 {
            self.compensate(ad_id, &stored).await;
            return Err(PublishError::PaymentInitiationFailed(
                "computed amount is not positive".to_string(),
            ));
        }
        let request = CheckoutRequest {
            ad_id,
            price_ids: quote.price_ids,
            amount_minor: quote.amount_minor,
            currency: self.config.currency.clone(),
            description,
            customer_email: user.email.clone(),
            customer_name: user.display_name(),
            coupon_code,
        };
        let session = match self.gateway.create_checkout_session(&request).await {
            Ok(session) => session,
            Err(GatewayError::InvalidCoupon(code)) => {
                self.compensate(ad_id, &stored).await;
                return Err(PublishError::InvalidInput(format!(
                    "invalid coupon code: {}",
                    code
                )));
            }
            Err(e) => {
                self.compensate(ad_id, &stored).await;
                return Err(PublishError::PaymentInitiationFailed(e.to_string()));
            }
        };

        if let Err(e) = self.ads.set_payment_session(ad_id, &session.session_id).await {
            self.compensate(ad_id, &stored).await;
            return Err(PublishError::CreationFailed(format!(
                "failed to record payment session: {}",
                e
            )));
        }

        tracing::info!(
            ad_id = %ad_id,
            session_id = %session.session_id,
            amount_minor = request.amount_minor,
            images = stored.len(),
            "ad created, awaiting payment"
        );

        Ok(PublishOutcome {
            ad_id,
            image_urls: stored.into_iter().map(|s| s.url).collect(),
            checkout_url: session.checkout_url,
            session_id: session.session_id,
        })
    }

    /// Validate, stamp and upload each file. Failures are logged and the
    /// file skipped; a fully unreachable image store yields an empty list
    /// rather than aborting the workflow.
    async fn upload_images(&self, ad_id: Uuid, files: Vec<ImageUpload>) -> Vec<StoredImageRef> {
        let mut stored = Vec::new();
        for (index, file) in files.into_iter().enumerate() {
            if let Err(e) = self
                .validator
                .validate(&file.filename, &file.content_type, file.data.len())
            {
                tracing::warn!(ad_id = %ad_id, filename = %file.filename, error = %e, "skipping invalid image");
                continue;
            }

            let (data, content_type) = match &self.watermarker {
                Some(watermarker) => match watermarker.stamp(&file.data) {
                    Ok(stamped) => (stamped, "image/jpeg".to_string()),
                    Err(e) => {
                        tracing::warn!(ad_id = %ad_id, filename = %file.filename, error = %e, "skipping undecodable image");
                        continue;
                    }
                },
                None => (file.data, file.content_type.clone()),
            };

            let filename = if self.watermarker.is_some() {
                format!("{}-{}.jpg", index, Uuid::new_v4())
            } else {
                format!("{}-{}-{}", index, Uuid::new_v4(), file.filename)
            };

            match self
                .images
                .upload(ad_id, &filename, &content_type, data)
                .await
            {
                Ok(image) => stored.push(image),
                Err(e) => {
                    tracing::warn!(ad_id = %ad_id, filename = %file.filename, error = %e, "image upload failed, skipping");
                }
            }
        }
        stored
    }

    /// Remove the listing row and best-effort delete its images. Cleanup
    /// failures are logged, never escalated.
    async fn compensate(&self, ad_id: Uuid, stored: &[StoredImageRef]) {
        tracing::warn!(ad_id = %ad_id, images = stored.len(), "rolling back failed publication");

        if let Err(e) = self.ads.delete(ad_id).await {
            tracing::error!(ad_id = %ad_id, error = %e, "rollback failed to delete listing row");
        }
        for image in stored {
            if let Err(e) = self.images.delete(&image.delete_handle).await {
                tracing::error!(
                    ad_id = %ad_id,
                    delete_handle = %image.delete_handle,
                    error = %e,
                    "rollback failed to delete image"
                );
            }
        }
    }
}
