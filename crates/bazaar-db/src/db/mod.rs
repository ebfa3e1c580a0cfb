//! Repository implementations, one module per aggregate.

pub mod ads;
pub mod approvals;
pub mod geo;
pub mod row;
pub mod users;

pub use ads::{AdRepository, AdStore};
pub use approvals::ApprovalRepository;
pub use users::{UserDirectory, UserRepository};
