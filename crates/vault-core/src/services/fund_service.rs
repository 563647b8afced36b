//! Fund directory

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{AuthUser, Fund, FundChanges, NewFund};
use crate::error::DomainError;
use crate::permissions::{self, Capability};
use crate::repositories::{FundRepository, UserRepository};

pub struct FundService {
    fund_repo: Arc<dyn FundRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl FundService {
    pub fn new(fund_repo: Arc<dyn FundRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self { fund_repo, user_repo }
    }

    pub async fn create(&self, input: NewFund, actor: &AuthUser) -> Result<Fund, DomainError> {
        permissions::require(actor, Capability::ManageFunds)?;
        input.validate()?;
        self.ensure_users_exist(&input.manager_ids).await?;

        let fund = self.fund_repo.create(&Fund::new(input)).await?;
        info!(fund_id = %fund.id, "Fund {} created", fund.code);
        Ok(fund)
    }

    /// Fund managers see the funds they manage; everyone else sees all.
    pub async fn find_all(&self, actor: &AuthUser) -> Result<Vec<Fund>, DomainError> {
        let managed_by = if permissions::can(actor.role, Capability::ViewAllFunds) {
            None
        } else {
            Some(actor.id)
        };
        self.fund_repo.list(managed_by).await
    }

    pub async fn find_one(&self, id: &Uuid) -> Result<Fund, DomainError> {
        self.fund_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Fund", id))
    }

    pub async fn update(
        &self,
        id: &Uuid,
        changes: FundChanges,
        actor: &AuthUser,
    ) -> Result<Fund, DomainError> {
        permissions::require(actor, Capability::ManageFunds)?;
        changes.validate()?;
        if let Some(managers) = &changes.manager_ids {
            self.ensure_users_exist(managers).await?;
        }

        let mut fund = self.find_one(id).await?;
        fund.apply(changes);
        let updated = self.fund_repo.update(&fund).await?;
        info!(fund_id = %id, "Fund {} updated", updated.code);
        Ok(updated)
    }

    pub async fn managed_fund_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, DomainError> {
        self.fund_repo.managed_fund_ids(user_id).await
    }

    async fn ensure_users_exist(&self, ids: &[Uuid]) -> Result<(), DomainError> {
        for id in ids {
            if self.user_repo.find_by_id(id).await?.is_none() {
                return Err(DomainError::Validation(format!("Manager {} does not exist", id)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use crate::repositories::{MockFundRepository, MockUserRepository};

    fn actor(role: UserRole) -> AuthUser {
        AuthUser { id: Uuid::new_v4(), email: "x@auditvault.com".into(), name: "X".into(), role }
    }

    fn new_fund(code: &str) -> NewFund {
        NewFund {
            code: code.into(),
            name: "European Equity Fund".into(),
            region: Some("Europe".into()),
            currency: Some("EUR".into()),
            manager_ids: vec![],
        }
    }

    #[tokio::test]
    async fn auditor_cannot_create_funds() {
        let mut funds = MockFundRepository::new();
        funds.expect_create().times(0);
        let service = FundService::new(Arc::new(funds), Arc::new(MockUserRepository::new()));

        let result = service.create(new_fund("EEF-002"), &actor(UserRole::Auditor)).await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn lowercase_code_is_invalid() {
        let service = FundService::new(
            Arc::new(MockFundRepository::new()),
            Arc::new(MockUserRepository::new()),
        );
        let result = service.create(new_fund("eef-002"), &actor(UserRole::Admin)).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_manager_is_rejected() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        let mut funds = MockFundRepository::new();
        funds.expect_create().times(0);
        let service = FundService::new(Arc::new(funds), Arc::new(users));

        let input = NewFund { manager_ids: vec![Uuid::new_v4()], ..new_fund("EEF-002") };
        let result = service.create(input, &actor(UserRole::ComplianceOfficer)).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn fund_manager_listing_is_scoped() {
        let fm = actor(UserRole::FundManager);
        let fm_id = fm.id;
        let mut funds = MockFundRepository::new();
        funds.expect_list()
            .withf(move |managed_by| *managed_by == Some(fm_id))
            .times(1)
            .returning(|_| Ok(vec![]));
        let service = FundService::new(Arc::new(funds), Arc::new(MockUserRepository::new()));
        service.find_all(&fm).await.unwrap();
    }

    #[tokio::test]
    async fn update_applies_partial_changes() {
        let existing = Fund::new(new_fund("EEF-002"));
        let id = existing.id;
        let mut funds = MockFundRepository::new();
        funds.expect_find_by_id().returning(move |_| Ok(Some(existing.clone())));
        funds.expect_update()
            .withf(|f| f.name == "Renamed" && f.code == "EEF-002")
            .times(1)
            .returning(|f| Ok(f.clone()));
        let service = FundService::new(Arc::new(funds), Arc::new(MockUserRepository::new()));

        let changes = FundChanges { name: Some("Renamed".into()), ..Default::default() };
        let fund = service.update(&id, changes, &actor(UserRole::Admin)).await.unwrap();
        assert_eq!(fund.name, "Renamed");
    }
}
