//! Role capability table.
//!
//! Every authorization decision in the service goes through [`can`]. The
//! table below is the whole policy.

use tracing::warn;

use crate::domain::{AuthUser, DocStatus, UserRole};
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create and update funds.
    ManageFunds,
    /// Move a document to any status other than APPROVED.
    ChangeDocumentStatus,
    /// Move a document to APPROVED.
    ApproveDocuments,
    /// Approve or reject pending accounts.
    ManageUsers,
    /// See documents and funds regardless of fund assignment.
    ViewAllFunds,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ManageFunds => "manage funds",
            Capability::ChangeDocumentStatus => "change document status",
            Capability::ApproveDocuments => "approve documents",
            Capability::ManageUsers => "manage users",
            Capability::ViewAllFunds => "view all funds",
        }
    }
}

use Capability::*;

pub const CAPABILITY_TABLE: [(UserRole, &[Capability]); 4] = [
    (
        UserRole::Admin,
        &[ManageFunds, ChangeDocumentStatus, ApproveDocuments, ManageUsers, ViewAllFunds],
    ),
    (UserRole::Auditor, &[ChangeDocumentStatus, ApproveDocuments, ViewAllFunds]),
    (
        UserRole::ComplianceOfficer,
        &[ManageFunds, ChangeDocumentStatus, ManageUsers, ViewAllFunds],
    ),
    (UserRole::FundManager, &[]),
];

pub fn capabilities(role: UserRole) -> &'static [Capability] {
    CAPABILITY_TABLE
        .iter()
        .find(|(r, _)| *r == role)
        .map(|(_, caps)| *caps)
        .unwrap_or(&[])
}

pub fn can(role: UserRole, capability: Capability) -> bool {
    capabilities(role).contains(&capability)
}

pub fn require(actor: &AuthUser, capability: Capability) -> Result<(), DomainError> {
    if can(actor.role, capability) {
        return Ok(());
    }
    warn!(user_id = %actor.id, role = actor.role.as_str(), "Denied: {}", capability.as_str());
    Err(DomainError::Forbidden(format!(
        "Role {} cannot {}",
        actor.role.as_str(),
        capability.as_str()
    )))
}

/// Status change gate. Same-status requests are checked like any other.
pub fn authorize_status_change(actor: &AuthUser, target: DocStatus) -> Result<(), DomainError> {
    require(actor, ChangeDocumentStatus)?;
    if target == DocStatus::Approved {
        require(actor, ApproveDocuments)?;
    }
    Ok(())
}
