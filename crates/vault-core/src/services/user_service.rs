//! User directory: listing and account approval

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::{AuthUser, User, UserStatus};
use crate::error::DomainError;
use crate::permissions::{self, Capability};
use crate::repositories::UserRepository;

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    pub async fn find_all(&self, status: Option<UserStatus>) -> Result<Vec<User>, DomainError> {
        self.user_repo.list(status).await
    }

    pub async fn find_by_id(&self, id: &Uuid) -> Result<User, DomainError> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    /// Approve (ACTIVE) or reject an account.
    pub async fn update_status(
        &self,
        id: &Uuid,
        status: UserStatus,
        actor: &AuthUser,
    ) -> Result<User, DomainError> {
        permissions::require(actor, Capability::ManageUsers)?;

        let updated = self
            .user_repo
            .update_status(id, status)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))?;

        info!(user_id = %id, actor_id = %actor.id, "Account status set to {}", status.as_str());
        Ok(updated)
    }
}
