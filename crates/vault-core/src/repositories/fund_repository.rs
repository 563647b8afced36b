//! Fund repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::Fund;
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FundRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Fund>, DomainError>;
    /// Ordered by code. `managed_by` limits the result to that user's funds.
    async fn list(&self, managed_by: Option<Uuid>) -> Result<Vec<Fund>, DomainError>;
    /// Inserts the fund and its manager links. `Conflict` on a duplicate code.
    async fn create(&self, fund: &Fund) -> Result<Fund, DomainError>;
    /// Overwrites scalar fields and replaces the manager set.
    async fn update(&self, fund: &Fund) -> Result<Fund, DomainError>;
    async fn managed_fund_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, DomainError>;
}
