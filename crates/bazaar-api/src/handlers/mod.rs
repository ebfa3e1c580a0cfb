pub mod ads;
pub mod health;
pub mod moderation;
pub mod payments;
pub mod pricing;
pub mod reactions;
