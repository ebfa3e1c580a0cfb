//! Background sweep of expired unpublished listings.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use bazaar_core::AppError;
use bazaar_db::AdStore;
use bazaar_storage::ImageStore;

/// Periodically deletes listings that passed their retention deadline
/// without becoming visible. Promoted placements are left alone; the store
/// query already excludes them.
pub struct ExpirySweeper {
    ads: Arc<dyn AdStore>,
    images: Arc<dyn ImageStore>,
    interval_secs: u64,
}

impl ExpirySweeper {
    pub fn new(ads: Arc<dyn AdStore>, images: Arc<dyn ImageStore>, interval_secs: u64) -> Self {
        Self {
            ads,
            images,
            interval_secs,
        }
    }

    /// Spawn the sweep loop. The first tick fires after one full interval.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tracing::info!(
            interval_secs = self.interval_secs,
            "starting expired listing sweeper"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            interval.tick().await;

            loop {
                interval.tick().await;
                match self.sweep().await {
                    Ok(0) => {}
                    Ok(removed) => {
                        tracing::info!(removed, "expired listing sweep finished");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "expired listing sweep failed");
                    }
                }
            }
        })
    }

    /// Run one sweep pass. Returns how many listings were removed. Image
    /// deletion is best-effort; a storage failure never blocks the row
    /// delete of the next listing.
    pub async fn sweep(&self) -> Result<usize, AppError> {
        let expired = self.ads.list_expired(Utc::now()).await?;
        let mut removed = 0;

        for listing in expired {
            if let Err(e) = self.ads.delete(listing.id).await {
                tracing::error!(ad_id = %listing.id, error = %e, "failed to delete expired listing");
                continue;
            }
            for image in &listing.images {
                if let Err(e) = self.images.delete(&image.delete_handle).await {
                    tracing::error!(
                        ad_id = %listing.id,
                        delete_handle = %image.delete_handle,
                        error = %e,
                        "failed to delete image of expired listing"
                    );
                }
            }
            tracing::debug!(ad_id = %listing.id, "removed expired listing");
            removed += 1;
        }

        Ok(removed)
    }
}
