//! User domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Role enumeration. Capabilities per role live in [`crate::permissions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Auditor,
    ComplianceOfficer,
    FundManager,
}

impl UserRole {
    pub const ALL: [UserRole; 4] = [
        UserRole::Admin,
        UserRole::Auditor,
        UserRole::ComplianceOfficer,
        UserRole::FundManager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Auditor => "AUDITOR",
            UserRole::ComplianceOfficer => "COMPLIANCE_OFFICER",
            UserRole::FundManager => "FUND_MANAGER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ADMIN" => Some(UserRole::Admin),
            "AUDITOR" => Some(UserRole::Auditor),
            "COMPLIANCE_OFFICER" => Some(UserRole::ComplianceOfficer),
            "FUND_MANAGER" => Some(UserRole::FundManager),
            _ => None,
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Auditor
    }
}

/// Account status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Pending,
    Active,
    Rejected,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "PENDING",
            UserStatus::Active => "ACTIVE",
            UserStatus::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(UserStatus::Pending),
            "ACTIVE" => Some(UserStatus::Active),
            "REJECTED" => Some(UserStatus::Rejected),
            _ => None,
        }
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        UserStatus::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,

    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub role: UserRole,
    pub status: UserStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New self-registered account. Starts out PENDING until approved.
    pub fn new(
        name: String,
        email: String,
        password_hash: String,
        role: UserRole,
    ) -> Result<Self, validator::ValidationErrors> {
        let now = Utc::now();
        let user = Self {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            name: name.trim().to_string(),
            password_hash,
            role,
            status: UserStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        user.validate()?;
        Ok(user)
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// The authenticated caller, resolved from a bearer token on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

/// Registration payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRegistration {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_storage_names() {
        for role in UserRole::ALL {
            assert_eq!(UserRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_str("fund_manager"), Some(UserRole::FundManager));
        assert_eq!(UserRole::from_str("OWNER"), None);
    }

    #[test]
    fn new_user_is_pending_and_normalized() {
        let user = User::new(
            " Alice Auditor ".into(),
            "Alice@AuditVault.com".into(),
            "hash".into(),
            UserRole::Auditor,
        )
        .unwrap();
        assert_eq!(user.status, UserStatus::Pending);
        assert_eq!(user.email, "alice@auditvault.com");
        assert_eq!(user.name, "Alice Auditor");
        assert!(!user.is_active());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User::new("Bob".into(), "bob@funds.com".into(), "secret-hash".into(), UserRole::FundManager).unwrap();
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"role\":\"FUND_MANAGER\""));
    }
}
