use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Gateway operation errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected gateway response: {0}")]
    InvalidResponse(String),

    #[error("Invalid or inactive coupon code: {0}")]
    InvalidCoupon(String),

    #[error("Gateway configuration error: {0}")]
    Config(String),
}

/// One active price entry from the gateway's catalog. Amounts are in minor
/// currency units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceEntry {
    pub price_id: String,
    pub product_name: String,
    pub amount_minor: i64,
}

/// Everything needed to open a checkout session for one listing.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub ad_id: Uuid,
    pub price_ids: Vec<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub description: String,
    pub customer_email: String,
    pub customer_name: String,
    pub coupon_code: Option<String>,
}

/// An open checkout session the client is redirected to.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub session_id: String,
    pub checkout_url: String,
}

/// Source of the active price catalog.
#[async_trait]
pub trait PricingSource: Send + Sync {
    async fn list_active_prices(&self) -> Result<Vec<PriceEntry>, GatewayError>;
}

/// Checkout session creation seam.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;
}
