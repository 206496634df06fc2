//! Authentication utilities
//!
//! Provides:
//! - JWT bearer token generation and validation
//! - Argon2 password hashing
//! - Request authentication context extraction

use crate::errors::{AppError, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Extracted authentication context available to handlers.
///
/// Requests without an `Authorization` header are anonymous; a header that
/// is present but invalid rejects the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated user, if any
    pub user_id: Option<i32>,

    /// Request ID for tracing
    pub request_id: String,
}

impl AuthContext {
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The authenticated user or `Unauthenticated`
    pub fn require_user(&self) -> Result<i32> {
        self.user_id.ok_or_else(AppError::unauthenticated)
    }

    /// Fail with `Forbidden` unless the caller is `owner_id`
    pub fn require_owner(&self, owner_id: i32) -> Result<i32> {
        let user_id = self.require_user()?;
        if user_id != owner_id {
            return Err(AppError::Forbidden {
                message: "only the author may change this recipe".to_string(),
            });
        }
        Ok(user_id)
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl JwtClaims {
    pub fn user_id(&self) -> Result<i32> {
        self.sub.parse().map_err(|_| AppError::Unauthenticated {
            message: "Invalid token subject".to_string(),
        })
    }
}

/// JWT token manager
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: i64::try_from(expiration_secs).unwrap_or(i64::MAX / 2),
        }
    }

    /// Generate a token for `user_id`
    pub fn generate_token(&self, user_id: i32) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::Unauthenticated {
                    message: "Invalid token".to_string(),
                },
            })
    }
}

/// Hash a password into an Argon2 PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Check `password` against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Extract the token from a `Bearer` Authorization header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        // Extract request ID
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(AuthContext {
                user_id: None,
                request_id,
            });
        };

        let token = header
            .to_str()
            .ok()
            .and_then(extract_bearer)
            .ok_or_else(|| AppError::Unauthenticated {
                message: "Expected a Bearer token".to_string(),
            })?;

        let jwt = Arc::<JwtManager>::from_ref(state);
        let user_id = jwt.validate_token(token)?.user_id()?;

        Ok(AuthContext {
            user_id: Some(user_id),
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Token abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);

        let token = manager.generate_token(42).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), 42);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_jwt_wrong_secret() {
        let token = JwtManager::new("one", 3600).generate_token(1).unwrap();
        let err = JwtManager::new("two", 3600).validate_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn test_owner_check() {
        let ctx = AuthContext {
            user_id: Some(1),
            request_id: "r".into(),
        };
        assert_eq!(ctx.require_owner(1).unwrap(), 1);
        assert!(matches!(ctx.require_owner(2), Err(AppError::Forbidden { .. })));

        let anonymous = AuthContext {
            user_id: None,
            request_id: "r".into(),
        };
        assert!(matches!(
            anonymous.require_owner(1),
            Err(AppError::Unauthenticated { .. })
        ));
    }
}
