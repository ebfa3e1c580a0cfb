//! Consumes verified payment webhook events.
//!
//! Completion flips the listing to paid (and to visible when already
//! approved); expiry and failed async payment discard the unpaid listing
//! and its images. Unknown event kinds are logged and dropped.

use std::sync::Arc;

use bazaar_core::AppError;
use bazaar_db::AdStore;
use bazaar_payments::{EventKind, WebhookEvent};
use bazaar_storage::ImageStore;

pub struct PaymentEventService {
    ads: Arc<dyn AdStore>,
    images: Arc<dyn ImageStore>,
}

impl PaymentEventService {
    pub fn new(ads: Arc<dyn AdStore>, images: Arc<dyn ImageStore>) -> Self {
        Self { ads, images }
    }

    /// Apply one verified event. Idempotent: replaying a completed event
    /// re-runs an update that is already in effect, and discarding an
    /// already-deleted listing is a no-op.
    #[tracing::instrument(skip(self, event), fields(kind = ?event.kind))]
    pub async fn handle(&self, event: WebhookEvent) -> Result<(), AppError> {
        match event.kind {
            EventKind::CheckoutCompleted => {
                let session_id = match event.session_id {
                    Some(id) => id,
                    None => {
                        tracing::warn!("completed checkout event without a session id");
                        return Ok(());
                    }
                };
                match self.ads.record_payment_completed(&session_id).await? {
                    Some(listing) => {
                        tracing::info!(
                            ad_id = %listing.id,
                            session_id = %session_id,
                            visibility = ?listing.visibility,
                            "payment completed"
                        );
                    }
                    None => {
                        tracing::warn!(
                            session_id = %session_id,
                            "completed checkout references no known listing"
                        );
                    }
                }
                Ok(())
            }
            EventKind::CheckoutExpired | EventKind::AsyncPaymentFailed => {
                let session_id = match event.session_id {
                    Some(id) => id,
                    None => {
                        tracing::warn!("checkout failure event without a session id");
                        return Ok(());
                    }
                };
                self.discard_unpaid(&session_id).await
            }
            EventKind::Other(kind) => {
                tracing::debug!(kind = %kind, "ignoring unhandled payment event");
                Ok(())
            }
        }
    }

    /// Delete the listing correlated with the session and best-effort
    /// delete its stored images.
    async fn discard_unpaid(&self, session_id: &str) -> Result<(), AppError> {
        let listing = match self.ads.find_by_payment_session(session_id).await? {
            Some(listing) => listing,
            None => {
                tracing::debug!(
                    session_id = %session_id,
                    "failed checkout references no known listing"
                );
                return Ok(());
            }
        };

        self.ads.delete(listing.id).await?;
        for image in &listing.images {
            if let Err(e) = self.images.delete(&image.delete_handle).await {
                tracing::error!(
                    ad_id = %listing.id,
                    delete_handle = %image.delete_handle,
                    error = %e,
                    "failed to delete image of discarded listing"
                );
            }
        }

        tracing::info!(
            ad_id = %listing.id,
            session_id = %session_id,
            images = listing.images.len(),
            "discarded unpaid listing"
        );
        Ok(())
    }
}
