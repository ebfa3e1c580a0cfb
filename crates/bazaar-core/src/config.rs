//! Configuration module
//!
//! Environment-driven configuration for the API binary and background
//! services. Everything is read once at startup via [`Config::from_env`] and
//! validated before the server binds.

use std::env;

use crate::storage_types::StorageBackend;

// Defaults
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;
const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;
const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_LISTING_RETENTION_DAYS: i64 = 31;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3600;
const DEFAULT_CURRENCY: &str = "usd";
const DEFAULT_WORLDWIDE_CATEGORY: &str = "Sri Lankan Worldwide Restaurant";
const DEFAULT_WATERMARK_SCALE_PERCENT: f32 = 40.0;
const DEFAULT_WATERMARK_OPACITY: f32 = 0.4;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,

    // Database
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,

    // Auth
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,

    // Image store
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,

    // Image processing
    pub max_image_size_bytes: usize,
    pub image_allowed_extensions: Vec<String>,
    pub image_allowed_content_types: Vec<String>,
    /// Path to the watermark overlay PNG. When unset, images are stored
    /// without a watermark (logged at warn during startup).
    pub watermark_path: Option<String>,
    pub watermark_scale_percent: f32,
    pub watermark_opacity: f32,

    // Payment gateway
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
    pub currency: String,

    // Pricing classification
    pub worldwide_category: String,

    // Listing lifecycle
    pub listing_retention_days: i64,
    pub cleanup_enabled: bool,
    pub cleanup_interval_secs: u64,
}

fn get_env(key: &str) -> Result<String, anyhow::Error> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required environment variable: {}", key))
}

fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_list(key: &str, default: &[&str]) -> Vec<String> {
    env::var(key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_else(|_| default.iter().map(|s| s.to_string()).collect())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // Load .env if present; real environment wins.
        dotenvy::dotenv().ok();

        let storage_backend = get_env_or("STORAGE_BACKEND", "s3")
            .parse::<StorageBackend>()
            .map_err(|e| anyhow::anyhow!(e))?;

        let config = Config {
            server_port: parse_env("PORT", DEFAULT_PORT),
            cors_origins: parse_list("CORS_ORIGINS", &["*"]),
            environment: get_env_or("ENVIRONMENT", "development"),

            database_url: get_env("DATABASE_URL")?,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            db_timeout_seconds: parse_env("DB_TIMEOUT_SECONDS", DEFAULT_DB_TIMEOUT_SECS),

            jwt_secret: get_env("JWT_SECRET")?,
            jwt_expiry_hours: parse_env("JWT_EXPIRY_HOURS", DEFAULT_JWT_EXPIRY_HOURS),

            storage_backend,
            s3_bucket: get_env_opt("S3_BUCKET"),
            s3_region: get_env_opt("S3_REGION").or_else(|| get_env_opt("AWS_REGION")),
            s3_endpoint: get_env_opt("S3_ENDPOINT"),
            local_storage_path: get_env_opt("LOCAL_STORAGE_PATH"),
            local_storage_base_url: get_env_opt("LOCAL_STORAGE_BASE_URL"),

            max_image_size_bytes: parse_env("MAX_IMAGE_SIZE_BYTES", DEFAULT_MAX_IMAGE_BYTES),
            image_allowed_extensions: parse_list(
                "IMAGE_ALLOWED_EXTENSIONS",
                &["jpg", "jpeg", "png", "webp"],
            ),
            image_allowed_content_types: parse_list(
                "IMAGE_ALLOWED_CONTENT_TYPES",
                &["image/jpeg", "image/png", "image/webp"],
            ),
            watermark_path: get_env_opt("WATERMARK_PATH"),
            watermark_scale_percent: parse_env(
                "WATERMARK_SCALE_PERCENT",
                DEFAULT_WATERMARK_SCALE_PERCENT,
            ),
            watermark_opacity: parse_env("WATERMARK_OPACITY", DEFAULT_WATERMARK_OPACITY),

            stripe_secret_key: get_env("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: get_env("STRIPE_WEBHOOK_SECRET")?,
            checkout_success_url: get_env_or(
                "CHECKOUT_SUCCESS_URL",
                "http://localhost:8000/payment-success",
            ),
            checkout_cancel_url: get_env_or(
                "CHECKOUT_CANCEL_URL",
                "http://localhost:8000/payment-cancel",
            ),
            currency: get_env_or("CURRENCY", DEFAULT_CURRENCY),

            worldwide_category: get_env_or("WORLDWIDE_CATEGORY", DEFAULT_WORLDWIDE_CATEGORY),

            listing_retention_days: parse_env(
                "LISTING_RETENTION_DAYS",
                DEFAULT_LISTING_RETENTION_DAYS,
            ),
            cleanup_enabled: parse_env("CLEANUP_ENABLED", true),
            cleanup_interval_secs: parse_env(
                "CLEANUP_INTERVAL_SECS",
                DEFAULT_CLEANUP_INTERVAL_SECS,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters");
        }
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    anyhow::bail!("S3_BUCKET is required for the s3 storage backend");
                }
                if self.s3_region.is_none() {
                    anyhow::bail!("S3_REGION or AWS_REGION is required for the s3 storage backend");
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() || self.local_storage_base_url.is_none() {
                    anyhow::bail!(
                        "LOCAL_STORAGE_PATH and LOCAL_STORAGE_BASE_URL are required for the local storage backend"
                    );
                }
            }
        }
        if self.listing_retention_days <= 0 {
            anyhow::bail!("LISTING_RETENTION_DAYS must be positive");
        }
        if !(0.0..=1.0).contains(&self.watermark_opacity) {
            anyhow::bail!("WATERMARK_OPACITY must be within 0.0..=1.0");
        }
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 8000,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            database_url: "postgres://localhost/bazaar".to_string(),
            db_max_connections: 20,
            db_timeout_seconds: 30,
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            jwt_expiry_hours: 24,
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: Some("/tmp/bazaar".to_string()),
            local_storage_base_url: Some("http://localhost:8000/media".to_string()),
            max_image_size_bytes: DEFAULT_MAX_IMAGE_BYTES,
            image_allowed_extensions: vec!["jpg".to_string()],
            image_allowed_content_types: vec!["image/jpeg".to_string()],
            watermark_path: None,
            watermark_scale_percent: DEFAULT_WATERMARK_SCALE_PERCENT,
            watermark_opacity: DEFAULT_WATERMARK_OPACITY,
            stripe_secret_key: "sk_test_123".to_string(),
            stripe_webhook_secret: "whsec_123".to_string(),
            checkout_success_url: "http://localhost/ok".to_string(),
            checkout_cancel_url: "http://localhost/cancel".to_string(),
            currency: "usd".to_string(),
            worldwide_category: DEFAULT_WORLDWIDE_CATEGORY.to_string(),
            listing_retention_days: 31,
            cleanup_enabled: true,
            cleanup_interval_secs: 3600,
        }
    }

    #[test]
    fn test_validate_accepts_local_backend() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_jwt_secret() {
        let mut config = base_config();
        config.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_s3_without_bucket() {
        let mut config = base_config();
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut config = base_config();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
    }
}
