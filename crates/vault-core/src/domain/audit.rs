//! Audit log domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::document::DocStatus;
use crate::domain::user::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Created,
    StatusChanged,
    Downloaded,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "CREATED",
            AuditAction::StatusChanged => "STATUS_CHANGED",
            AuditAction::Downloaded => "DOWNLOADED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(AuditAction::Created),
            "STATUS_CHANGED" => Some(AuditAction::StatusChanged),
            "DOWNLOADED" => Some(AuditAction::Downloaded),
            _ => None,
        }
    }
}

/// Immutable record. Never updated; removed only with its document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub action: AuditAction,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAuditEntry {
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub action: AuditAction,
    pub details: Value,
}

impl NewAuditEntry {
    pub fn new(user_id: Uuid, document_id: Uuid, action: AuditAction, details: Option<Value>) -> Self {
        Self {
            document_id,
            user_id,
            action,
            details: details.unwrap_or_else(|| json!({})),
        }
    }

    pub fn created(user_id: Uuid, document_id: Uuid, file_key: &str, sha256: &str) -> Self {
        Self::new(
            user_id,
            document_id,
            AuditAction::Created,
            Some(json!({ "fileKey": file_key, "sha256": sha256 })),
        )
    }

    pub fn status_changed(
        user_id: Uuid,
        document_id: Uuid,
        old_status: DocStatus,
        new_status: DocStatus,
        comment: Option<&str>,
    ) -> Self {
        Self::new(
            user_id,
            document_id,
            AuditAction::StatusChanged,
            Some(json!({
                "oldStatus": old_status.as_str(),
                "newStatus": new_status.as_str(),
                "comment": comment,
            })),
        )
    }

    pub fn into_entry(self, timestamp: DateTime<Utc>) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            document_id: self.document_id,
            user_id: self.user_id,
            action: self.action,
            details: self.details,
            timestamp,
        }
    }
}

/// Actor as of query time, not as of when the entry was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditActor {
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditHistoryEntry {
    #[serde(flatten)]
    pub entry: AuditLogEntry,
    pub user: AuditActor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_change_details_record_both_ends() {
        let entry = NewAuditEntry::status_changed(
            Uuid::new_v4(),
            Uuid::new_v4(),
            DocStatus::Pending,
            DocStatus::Approved,
            Some("looks good"),
        );
        assert_eq!(entry.action, AuditAction::StatusChanged);
        assert_eq!(entry.details["oldStatus"], "PENDING");
        assert_eq!(entry.details["newStatus"], "APPROVED");
        assert_eq!(entry.details["comment"], "looks good");
    }

    #[test]
    fn missing_details_default_to_empty_object() {
        let entry = NewAuditEntry::new(Uuid::new_v4(), Uuid::new_v4(), AuditAction::Downloaded, None);
        assert_eq!(entry.details, json!({}));
    }
}
