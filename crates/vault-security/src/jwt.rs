//! JWT token handling

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token creation failed: {0}")]
    CreationError(String),
    #[error("Token validation failed: {0}")]
    ValidationError(String),
    #[error("Token expired")]
    TokenExpired,
}

/// Identity carried by an access token. `role` is the storage name
/// (`AUDITOR`, `FUND_MANAGER`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|e| JwtError::ValidationError(e.to_string()))
    }
}

pub struct JwtService {
    secret: String,
    access_token_expiry: i64,
}

impl JwtService {
    pub fn new(secret: String, access_expiry: i64) -> Self {
        Self {
            secret,
            access_token_expiry: access_expiry,
        }
    }

    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    pub fn generate_access_token(&self, user_id: &Uuid, email: &str, role: &str) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| JwtError::CreationError(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            _ => JwtError::ValidationError(e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates_with_same_secret() {
        let service = JwtService::new("test-secret".into(), 3600);
        let id = Uuid::new_v4();
        let token = service.generate_access_token(&id, "a@auditvault.com", "AUDITOR").unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), id);
        assert_eq!(claims.role, "AUDITOR");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let issuer = JwtService::new("one".into(), 3600);
        let verifier = JwtService::new("two".into(), 3600);
        let token = issuer.generate_access_token(&Uuid::new_v4(), "a@b.com", "ADMIN").unwrap();
        assert!(matches!(verifier.validate_token(&token), Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        // Past the default 60s leeway
        let service = JwtService::new("test-secret".into(), -120);
        let token = service.generate_access_token(&Uuid::new_v4(), "a@b.com", "ADMIN").unwrap();
        assert!(matches!(service.validate_token(&token), Err(JwtError::TokenExpired)));
    }

    #[test]
    fn garbage_is_rejected() {
        let service = JwtService::new("test-secret".into(), 3600);
        assert!(service.validate_token("not.a.jwt").is_err());
    }
}
