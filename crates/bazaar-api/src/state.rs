//! Application state and sub-state extractors.
//!
//! AppState is split into domain sub-states so handlers can extract only
//! what they need via Axum's `FromRef`.

use std::sync::Arc;

use sqlx::PgPool;

use bazaar_db::{AdRepository, ApprovalRepository};
use bazaar_payments::PricingSource;
use bazaar_services::{AdPublicationService, PaymentEventService};
use bazaar_storage::ImageStore;

/// Database pool and repositories.
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub ads: AdRepository,
    pub approvals: ApprovalRepository,
}

/// Payment gateway wiring: webhook consumer, price catalog, webhook secret.
#[derive(Clone)]
pub struct PaymentState {
    pub events: Arc<PaymentEventService>,
    pub pricing: Arc<dyn PricingSource>,
    pub webhook_secret: String,
}

/// JWT verification settings for the auth extractor.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Main application state: aggregates sub-states for dependency injection.
pub struct AppState {
    pub db: DbState,
    pub payments: PaymentState,
    pub auth: AuthConfig,
    pub publication: Arc<AdPublicationService>,
    pub images: Arc<dyn ImageStore>,
}

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for PaymentState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.payments.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for AuthConfig {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.auth.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
