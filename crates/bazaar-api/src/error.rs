//! HTTP error response conversion.
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Use `AppError`
//! (or types with `Into<AppError>`) for errors and `.map_err(Into::into)` so
//! they render consistently (status, body, logging).

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use bazaar_core::{AppError, ErrorMetadata, LogLevel};
use bazaar_payments::{GatewayError, SignatureError};
use bazaar_processing::ValidationError;
use bazaar_services::PublishError;
use bazaar_storage::StorageError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse. Needed because of
/// the orphan rule: IntoResponse and AppError both live in other crates.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<PublishError> for HttpAppError {
    fn from(err: PublishError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::UploadFailed(msg)
            | StorageError::DeleteFailed(msg)
            | StorageError::BackendError(msg) => AppError::Storage(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::IoError(err) => AppError::Internal(format!("IO error: {}", err)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
        };
        HttpAppError(app)
    }
}

impl From<ValidationError> for HttpAppError {
    fn from(err: ValidationError) -> Self {
        let app = match err {
            ValidationError::FileTooLarge { size, max } => {
                AppError::PayloadTooLarge(format!("{} bytes exceeds max {} bytes", size, max))
            }
            other => AppError::InvalidInput(other.to_string()),
        };
        HttpAppError(app)
    }
}

impl From<GatewayError> for HttpAppError {
    fn from(err: GatewayError) -> Self {
        let app = match err {
            GatewayError::InvalidCoupon(code) => {
                AppError::InvalidInput(format!("Invalid coupon code: {}", code))
            }
            other => AppError::PaymentGateway(other.to_string()),
        };
        HttpAppError(app)
    }
}

impl From<SignatureError> for HttpAppError {
    fn from(err: SignatureError) -> Self {
        HttpAppError(AppError::Unauthorized(err.to_string()))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let is_production = is_production_env();

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Always hide details in production; outside production, only for
        // non-sensitive errors.
        let body = if is_production || app_error.is_sensitive() {
            Json(ErrorResponse {
                error: app_error.client_message(),
                details: None,
                error_type: None,
                code: app_error.error_code().to_string(),
                recoverable: app_error.is_recoverable(),
                suggested_action: app_error.suggested_action().map(String::from),
            })
        } else {
            Json(ErrorResponse {
                error: app_error.client_message(),
                details: Some(app_error.detailed_message()),
                error_type: Some(app_error.error_type().to_string()),
                code: app_error.error_code().to_string(),
                recoverable: app_error.is_recoverable(),
                suggested_action: app_error.suggested_action().map(String::from),
            })
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_maps_to_storage_variant() {
        let HttpAppError(app) = StorageError::UploadFailed("boom".to_string()).into();
        assert_eq!(app.error_code(), "STORAGE_ERROR");
        assert_eq!(app.http_status_code(), 500);
    }

    #[test]
    fn test_validation_error_maps_to_payload_too_large() {
        let HttpAppError(app) = ValidationError::FileTooLarge {
            size: 1000,
            max: 500,
        }
        .into();
        assert_eq!(app.http_status_code(), 413);
    }

    #[test]
    fn test_invalid_coupon_is_client_error() {
        let HttpAppError(app) = GatewayError::InvalidCoupon("SAVE10".to_string()).into();
        assert_eq!(app.http_status_code(), 400);
        assert!(app.client_message().contains("SAVE10"));
    }

    #[test]
    fn test_signature_error_is_unauthorized() {
        let HttpAppError(app) = SignatureError::Mismatch.into();
        assert_eq!(app.http_status_code(), 401);
    }

    #[test]
    fn test_publish_error_no_pricing_maps_to_404() {
        let HttpAppError(app) = PublishError::NoPricingAvailable("none".to_string()).into();
        assert_eq!(app.error_code(), "NO_PRICING_MATCH");
        assert_eq!(app.http_status_code(), 404);
    }

    #[test]
    fn test_error_response_shape() {
        let response = ErrorResponse {
            error: "Not found".to_string(),
            details: None,
            error_type: None,
            code: "NOT_FOUND".to_string(),
            recoverable: false,
            suggested_action: None,
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert!(json.get("error").is_some());
        assert!(json.get("code").is_some());
        assert!(json.get("details").is_none());
    }
}
