use async_trait::async_trait;
use serde::Deserialize;

use crate::gateway::{
    CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway, PriceEntry, PricingSource,
};

const DEFAULT_BASE_URL: &str = "https://api.stripe.com";
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Stripe HTTP client implementing both the pricing and checkout seams.
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
    success_url: String,
    cancel_url: String,
}

#[derive(Debug, Deserialize)]
struct PriceList {
    data: Vec<Price>,
}

#[derive(Debug, Deserialize)]
struct Price {
    id: String,
    unit_amount: Option<i64>,
    product: Option<Product>,
}

#[derive(Debug, Deserialize)]
struct Product {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromotionCodeList {
    data: Vec<PromotionCode>,
}

#[derive(Debug, Deserialize)]
struct PromotionCode {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(
        secret_key: String,
        success_url: String,
        cancel_url: String,
    ) -> Result<Self, GatewayError> {
        if secret_key.is_empty() {
            return Err(GatewayError::Config(
                "Stripe secret key is empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(StripeGateway {
            client,
            secret_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            success_url,
            cancel_url,
        })
    }

    /// Point the client at a different host. Used by tests against a stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn read_error(response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "no error detail".to_string()),
            Err(e) => format!("unreadable error body: {}", e),
        };
        GatewayError::Api { status, message }
    }

    /// Resolve an active promotion code to its id.
    async fn lookup_promotion_code(&self, code: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .get(format!("{}/v1/promotion_codes", self.base_url))
            .bearer_auth(&self.secret_key)
            .query(&[("code", code), ("active", "true"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let list: PromotionCodeList = response.json().await?;
        list.data
            .into_iter()
            .next()
            .map(|p| p.id)
            .ok_or_else(|| GatewayError::InvalidCoupon(code.to_string()))
    }
}

/// Form fields for the checkout session POST.
fn checkout_form(
    request: &CheckoutRequest,
    success_url: &str,
    cancel_url: &str,
    promotion_code_id: Option<&str>,
) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), success_url.to_string()),
        ("cancel_url".to_string(), cancel_url.to_string()),
        (
            "customer_email".to_string(),
            request.customer_email.clone(),
        ),
        ("metadata[ad_id]".to_string(), request.ad_id.to_string()),
        (
            "metadata[customer_name]".to_string(),
            request.customer_name.clone(),
        ),
        // Expected charge, for reconciling the webhook against the quote.
        (
            "metadata[amount_minor]".to_string(),
            request.amount_minor.to_string(),
        ),
        ("metadata[currency]".to_string(), request.currency.clone()),
        (
            "payment_intent_data[description]".to_string(),
            request.description.clone(),
        ),
    ];

    for (i, price_id) in request.price_ids.iter().enumerate() {
        form.push((format!("line_items[{}][price]", i), price_id.clone()));
        form.push((format!("line_items[{}][quantity]", i), "1".to_string()));
    }

    if let Some(promo_id) = promotion_code_id {
        form.push((
            "discounts[0][promotion_code]".to_string(),
            promo_id.to_string(),
        ));
    }

    form
}

#[async_trait]
impl PricingSource for StripeGateway {
    #[tracing::instrument(skip(self))]
    async fn list_active_prices(&self) -> Result<Vec<PriceEntry>, GatewayError> {
        let response = self
            .client
            .get(format!("{}/v1/prices", self.base_url))
            .bearer_auth(&self.secret_key)
            .query(&[
                ("active", "true"),
                ("limit", "100"),
                ("expand[]", "data.product"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let list: PriceList = response.json().await?;
        let entries = list
            .data
            .into_iter()
            .filter_map(|price| {
                let amount = price.unit_amount?;
                let name = price.product.and_then(|p| p.name)?;
                Some(PriceEntry {
                    price_id: price.id,
                    product_name: name,
                    amount_minor: amount,
                })
            })
            .collect::<Vec<_>>();

        tracing::debug!(count = entries.len(), "fetched active price entries");
        Ok(entries)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[tracing::instrument(skip(self, request), fields(ad_id = %request.ad_id))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let promotion_code_id = match &request.coupon_code {
            Some(code) => Some(self.lookup_promotion_code(code).await?),
            None => None,
        };

        let form = checkout_form(
            request,
            &self.success_url,
            &self.cancel_url,
            promotion_code_id.as_deref(),
        );

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let session: SessionResponse = response.json().await?;
        let checkout_url = session.url.ok_or_else(|| {
            GatewayError::InvalidResponse("checkout session has no redirect URL".to_string())
        })?;

        tracing::info!(session_id = %session.id, "checkout session created");
        Ok(CheckoutSession {
            session_id: session.id,
            checkout_url,
        })
    }
}
