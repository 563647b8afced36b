//! User repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::{User, UserStatus};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
    /// Newest accounts first.
    async fn list(&self, status: Option<UserStatus>) -> Result<Vec<User>, DomainError>;
    /// Fails with `Conflict` on a duplicate email.
    async fn create(&self, user: &User) -> Result<User, DomainError>;
    async fn update_status(&self, id: &Uuid, status: UserStatus) -> Result<Option<User>, DomainError>;
}
