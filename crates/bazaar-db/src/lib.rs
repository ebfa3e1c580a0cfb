//! Database repositories for the listing store.
//!
//! Repositories run runtime queries over a shared `PgPool`. The `AdStore` and
//! `UserDirectory` traits are the seams service code depends on; the concrete
//! repositories implement them against Postgres.

pub mod db;

pub use db::ads::{AdFilter, AdStore, AdRepository, ReactionOutcome};
pub use db::approvals::{ApprovalRecord, ApprovalRepository};
pub use db::users::{UserDirectory, UserRepository};

/// Embedded migrations, applied at startup by the composition root.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
