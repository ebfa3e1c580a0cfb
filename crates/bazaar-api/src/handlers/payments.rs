//! Payment gateway webhook endpoint.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;

use bazaar_core::AppError;
use bazaar_payments::webhook::{parse_event, verify_signature, DEFAULT_TOLERANCE_SECS};

use crate::error::HttpAppError;
use crate::state::PaymentState;

const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Consume a gateway webhook. The raw body is verified against the
/// signature header before anything is parsed.
#[utoipa::path(
    post,
    path = "/api/v0/payments/webhook",
    tag = "payments",
    request_body(content = inline(Object), content_type = "application/json"),
    responses(
        (status = 200, description = "Event accepted"),
        (status = 401, description = "Signature rejected")
    )
)]
#[tracing::instrument(skip(payments, headers, body))]
pub async fn handle_webhook(
    State(payments): State<PaymentState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HttpAppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing signature header".to_string()))?;

    verify_signature(
        &body,
        signature,
        &payments.webhook_secret,
        DEFAULT_TOLERANCE_SECS,
        Utc::now().timestamp(),
    )?;

    let event = parse_event(&body).map_err(AppError::from)?;
    payments.events.handle(event).await?;

    Ok(StatusCode::OK)
}
