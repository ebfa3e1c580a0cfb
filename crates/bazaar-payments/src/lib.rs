//! Payment gateway integration.
//!
//! The `gateway` module defines the seams the publication workflow depends
//! on; `stripe` implements them over the Stripe HTTP API; `webhook` verifies
//! and parses the asynchronous callback events.

pub mod gateway;
pub mod stripe;
pub mod webhook;

pub use gateway::{
    CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway, PriceEntry, PricingSource,
};
pub use stripe::StripeGateway;
pub use webhook::{parse_event, verify_signature, EventKind, SignatureError, WebhookEvent};
