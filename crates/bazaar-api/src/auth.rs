//! Bearer JWT authentication.
//!
//! Tokens are HS256, issued by the identity provider that fronts this
//! service. The extractor verifies the signature and expiry and yields a
//! [`UserContext`]; [`AdminContext`] additionally requires the admin role.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bazaar_core::models::UserRole;
use bazaar_core::AppError;

use crate::error::HttpAppError;
use crate::state::AuthConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl UserContext {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// An authenticated caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminContext(pub UserContext);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Expected Bearer token".to_string()))
}

fn verify_token(token: &str, secret: &str) -> Result<UserContext, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    Ok(UserContext {
        user_id: data.claims.sub,
        email: data.claims.email,
        role: data.claims.role,
    })
}

impl<S> FromRequestParts<S> for UserContext
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthConfig::from_ref(state);
        let token = bearer_token(parts)?;
        Ok(verify_token(token, &auth.jwt_secret)?)
    }
}

impl<S> FromRequestParts<S> for AdminContext
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = UserContext::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(HttpAppError(AppError::Forbidden(
                "Admin role required".to_string(),
            )));
        }
        Ok(AdminContext(user))
    }
}

/// Caller identity when present; anonymous requests yield `None`.
#[derive(Debug, Clone)]
pub struct OptionalUserContext(pub Option<UserContext>);

impl<S> FromRequestParts<S> for OptionalUserContext
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .is_none()
        {
            return Ok(OptionalUserContext(None));
        }
        let user = UserContext::from_request_parts(parts, state).await?;
        Ok(OptionalUserContext(Some(user)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit-test-secret-with-enough-length";

    fn token_for(role: UserRole, expires_in: Duration) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            role,
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_accepted() {
        let token = token_for(UserRole::User, Duration::hours(1));
        let ctx = verify_token(&token, SECRET).unwrap();
        assert_eq!(ctx.email, "user@example.com");
        assert!(!ctx.is_admin());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = token_for(UserRole::User, Duration::hours(-1));
        assert!(verify_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = token_for(UserRole::Admin, Duration::hours(1));
        assert!(verify_token(&token, "another-secret-entirely-0000000000").is_err());
    }
}
