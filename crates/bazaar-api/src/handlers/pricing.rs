//! Active price catalog endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::PaymentState;

#[derive(Debug, Serialize, ToSchema)]
pub struct PriceItem {
    pub price_id: String,
    pub product: String,
    pub amount_minor: i64,
}

/// Current active price entries from the gateway catalog.
#[utoipa::path(
    get,
    path = "/api/v0/pricing",
    tag = "pricing",
    responses(
        (status = 200, description = "Active price entries", body = [PriceItem]),
        (status = 500, description = "Catalog unavailable", body = ErrorResponse)
    )
)]
pub async fn list_prices(
    State(payments): State<PaymentState>,
) -> Result<Json<Vec<PriceItem>>, HttpAppError> {
    let entries = payments.pricing.list_active_prices().await?;
    let items = entries
        .into_iter()
        .map(|e| PriceItem {
            price_id: e.price_id,
            product: e.product_name,
            amount_minor: e.amount_minor,
        })
        .collect();
    Ok(Json(items))
}
