//! Image validation and watermarking for listing uploads.

pub mod validator;
pub mod watermark;

pub use validator::{ImageValidator, ValidationError};
pub use watermark::{Watermark, WatermarkConfig, WatermarkPosition, WatermarkSize, Watermarker};
