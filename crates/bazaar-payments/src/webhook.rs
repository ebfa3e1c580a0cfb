//! Webhook signature verification and event parsing.
//!
//! The signature header carries a timestamp and one or more `v1` signatures:
//! `t=1700000000,v1=5257a8...`. Each signature is HMAC-SHA256 over
//! `"{timestamp}.{payload}"`. Comparison is constant-time and the timestamp
//! must fall within the configured tolerance to block replays.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Replay window for webhook timestamps.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Malformed signature header")]
    MalformedHeader,

    #[error("Signature header has no timestamp")]
    MissingTimestamp,

    #[error("Signature header has no v1 signature")]
    MissingSignature,

    #[error("Webhook timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("No signature matched the payload")]
    Mismatch,
}

/// Event kinds the payment consumer reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    CheckoutCompleted,
    CheckoutExpired,
    AsyncPaymentFailed,
    Other(String),
}

/// A parsed webhook event. `session_id` is present for checkout events.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub kind: EventKind,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: EventObject,
}

#[derive(Debug, Deserialize)]
struct EventObject {
    id: Option<String>,
}

/// Verify the signature header against the raw payload.
///
/// `now_unix` is passed in so tests control the clock.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or(SignatureError::MalformedHeader)?;
        match key {
            "t" => {
                timestamp =
                    Some(value.parse().map_err(|_| SignatureError::MalformedHeader)?);
            }
            "v1" => {
                let raw = hex::decode(value).map_err(|_| SignatureError::MalformedHeader)?;
                signatures.push(raw);
            }
            // Unknown schemes (v0 etc) are ignored.
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    if (now_unix - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    for candidate in &signatures {
        if candidate.len() == expected.len()
            && candidate.as_slice().ct_eq(expected.as_slice()).into()
        {
            return Ok(());
        }
    }

    Err(SignatureError::Mismatch)
}

/// Parse the payload into the event kinds the consumer cares about.
pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, serde_json::Error> {
    let envelope: EventEnvelope = serde_json::from_slice(payload)?;
    let kind = match envelope.event_type.as_str() {
        "checkout.session.completed" => EventKind::CheckoutCompleted,
        "checkout.session.expired" => EventKind::CheckoutExpired,
        "checkout.session.async_payment_failed" => EventKind::AsyncPaymentFailed,
        other => EventKind::Other(other.to_string()),
    };
    Ok(WebhookEvent {
        kind,
        session_id: envelope.data.object.id,
    })
}
