//! Business services built on the repository, storage and gateway seams.
//!
//! `publication` holds the payment-gated ad creation workflow with its
//! compensating rollback; `payment_events` consumes verified webhook events;
//! `cleanup` sweeps expired listings on an interval; `pricing` classifies a
//! submission against the active price catalog.

pub mod cleanup;
pub mod payment_events;
pub mod pricing;
pub mod publication;

pub use cleanup::ExpirySweeper;
pub use payment_events::PaymentEventService;
pub use pricing::{classify_pricing, PriceQuote};
pub use publication::{
    AdPublicationService, ImageUpload, PublicationConfig, PublishError, PublishOutcome,
};
