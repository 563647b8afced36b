// ============================================================================
// Vault Core - Document Entity
// File: crates/vault-core/src/domain/document.rs
// Description: Document entity, lifecycle status and query filters
// ============================================================================

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vault_shared::types::Pagination;

use crate::domain::audit::AuditHistoryEntry;
use crate::domain::fund::Fund;
use crate::error::DomainError;

/// Document category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocType {
    QuarterlyReport,
    AnnualReport,
    Kiid,
    Factsheet,
    LegalContract,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::QuarterlyReport => "QUARTERLY_REPORT",
            DocType::AnnualReport => "ANNUAL_REPORT",
            DocType::Kiid => "KIID",
            DocType::Factsheet => "FACTSHEET",
            DocType::LegalContract => "LEGAL_CONTRACT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QUARTERLY_REPORT" => Some(DocType::QuarterlyReport),
            "ANNUAL_REPORT" => Some(DocType::AnnualReport),
            "KIID" => Some(DocType::Kiid),
            "FACTSHEET" => Some(DocType::Factsheet),
            "LEGAL_CONTRACT" => Some(DocType::LegalContract),
            _ => None,
        }
    }
}

/// Lifecycle status: PENDING -> IN_REVIEW -> APPROVED | REJECTED -> ARCHIVED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
    Archived,
}

impl DocStatus {
    pub const ALL: [DocStatus; 5] = [
        DocStatus::Pending,
        DocStatus::InReview,
        DocStatus::Approved,
        DocStatus::Rejected,
        DocStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocStatus::Pending => "PENDING",
            DocStatus::InReview => "IN_REVIEW",
            DocStatus::Approved => "APPROVED",
            DocStatus::Rejected => "REJECTED",
            DocStatus::Archived => "ARCHIVED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(DocStatus::Pending),
            "IN_REVIEW" => Some(DocStatus::InReview),
            "APPROVED" => Some(DocStatus::Approved),
            "REJECTED" => Some(DocStatus::Rejected),
            "ARCHIVED" => Some(DocStatus::Archived),
            _ => None,
        }
    }

    /// Position in the lifecycle. APPROVED and REJECTED share a stage.
    pub fn stage(&self) -> u8 {
        match self {
            DocStatus::Pending => 0,
            DocStatus::InReview => 1,
            DocStatus::Approved | DocStatus::Rejected => 2,
            DocStatus::Archived => 3,
        }
    }

    pub fn advances_to(&self, next: DocStatus) -> bool {
        next.stage() > self.stage()
    }
}

impl Default for DocStatus {
    fn default() -> Self {
        DocStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub fund_id: Uuid,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    pub status: DocStatus,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub file_key: String,
    pub original_filename: String,
    pub mime_type: Option<String>,
    pub file_size: i64,
    pub file_sha256: String,
    pub uploaded_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata supplied alongside an upload.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub fund_id: Uuid,
    pub doc_type: DocType,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub description: Option<String>,
}

/// Raw upload as received from the transport.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FilePayload {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundRef {
    pub name: String,
    pub code: String,
}

/// List row: document plus the owning fund's name and code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    #[serde(flatten)]
    pub document: Document,
    pub fund: FundRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploaderRef {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: Document,
    pub fund: Fund,
    pub uploaded_by: Option<UploaderRef>,
    pub audit_logs: Vec<AuditHistoryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub fund_id: Option<Uuid>,
    pub doc_type: Option<DocType>,
    pub status: Option<DocStatus>,
    pub pagination: Option<Pagination>,
}

/// Filter as handed to the repository, with role scoping applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    pub filter: DocumentFilter,
    /// `Some` restricts results to these funds.
    pub fund_scope: Option<Vec<Uuid>>,
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_period_date(field: &str, value: &str) -> Result<DateTime<Utc>, DomainError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| DomainError::Validation(format!("{} must be a date (YYYY-MM-DD)", field)))
}
