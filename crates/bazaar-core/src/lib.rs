//! Core types for the Bazaar marketplace backend.
//!
//! This crate holds the pieces every other crate leans on: the unified
//! [`AppError`] taxonomy with response metadata, environment-driven
//! configuration, and the typed domain models for ad listings.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
