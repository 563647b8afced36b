// ============================================================================
// Vault Core - Authentication Service
// File: crates/vault-core/src/services/auth_service.rs
// ============================================================================
//! Registration, login and bearer token resolution

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use validator::Validate;

use vault_security::{JwtError, JwtService, PasswordService};
use vault_shared::utils::mask_email;

use crate::domain::{AuthUser, NewRegistration, User, UserRole};
use crate::error::DomainError;
use crate::repositories::UserRepository;

/// Token handed out on successful login. Field names follow the OAuth 2
/// token response (`access_token`, `token_type`, `expires_in`).
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

/// Authentication service for handling register/login flows
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(user_repo: Arc<dyn UserRepository>, jwt: JwtService) -> Self {
        Self { user_repo, jwt }
    }

    /// Self-service sign-up. The account waits in PENDING until someone
    /// with the manage-users capability approves it.
    pub async fn register(&self, input: NewRegistration) -> Result<User, DomainError> {
        input.validate()?;
        let email = input.email.trim().to_lowercase();
        info!("Registration attempt for {}", mask_email(&email));

        // 1. Check if email already exists
        if self.user_repo.find_by_email(&email).await?.is_some() {
            warn!("Registration failed: email already registered: {}", mask_email(&email));
            return Err(DomainError::Conflict("Email is already registered".into()));
        }

        // 2. Hash and persist
        let hash = PasswordService::hash(&input.password)
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        let user = User::new(input.name, email, hash, UserRole::Auditor)?;
        let created = self.user_repo.create(&user).await?;

        info!(user_id = %created.id, "Registered user, awaiting approval");
        Ok(created)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, DomainError> {
        let email = email.trim().to_lowercase();
        info!("Login attempt for {}", mask_email(&email));

        let user = self.user_repo.find_by_email(&email).await?.ok_or_else(|| {
            warn!("Login failed: unknown email {}", mask_email(&email));
            invalid_credentials()
        })?;

        let password_valid = PasswordService::verify(password, &user.password_hash)
            .map_err(|_| invalid_credentials())?;
        if !password_valid {
            warn!(user_id = %user.id, "Login failed: invalid password");
            return Err(invalid_credentials());
        }

        if !user.is_active() {
            warn!(user_id = %user.id, status = user.status.as_str(), "Login refused");
            return Err(DomainError::Unauthenticated("Account is not active".into()));
        }

        let access_token = self
            .jwt
            .generate_access_token(&user.id, &user.email, user.role.as_str())
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        info!(user_id = %user.id, "Login successful");
        Ok(LoginResult {
            access_token,
            token_type: "Bearer",
            expires_in: self.jwt.access_token_expiry(),
            user,
        })
    }

    /// Resolve a bearer token to the current user. The role comes from the
    /// user row, not the token.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, DomainError> {
        let claims = self.jwt.validate_token(token).map_err(|e| match e {
            JwtError::TokenExpired => DomainError::Unauthenticated("Token expired".into()),
            _ => DomainError::Unauthenticated("Invalid token".into()),
        })?;
        let user_id = claims
            .user_id()
            .map_err(|_| DomainError::Unauthenticated("Invalid token".into()))?;

        let user = self
            .user_repo
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| DomainError::Unauthenticated("User no longer exists".into()))?;
        if !user.is_active() {
            return Err(DomainError::Unauthenticated("Account is not active".into()));
        }
        Ok(user.to_auth_user())
    }
}

fn invalid_credentials() -> DomainError {
    DomainError::Unauthenticated("Invalid email or password".into())
}
