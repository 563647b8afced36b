//! PostgreSQL audit log repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use vault_core::domain::{
    AuditAction, AuditActor, AuditHistoryEntry, AuditLogEntry, NewAuditEntry, UserRole,
};
use vault_core::error::DomainError;
use vault_core::repositories::AuditRepository;

use super::{corrupt, db_error};

pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditRow {
    id: Uuid,
    document_id: Uuid,
    user_id: Uuid,
    action: String,
    details: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditLogEntry {
    type Error = DomainError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditLogEntry {
            id: row.id,
            document_id: row.document_id,
            user_id: row.user_id,
            action: AuditAction::from_str(&row.action)
                .ok_or_else(|| corrupt("audit_logs.action", &row.action))?,
            details: row.details,
            timestamp: row.timestamp,
        })
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    #[sqlx(flatten)]
    entry: AuditRow,
    user_name: String,
    user_role: String,
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn append(&self, entry: &NewAuditEntry) -> Result<AuditLogEntry, DomainError> {
        let row: AuditRow = sqlx::query_as(
            r#"
            INSERT INTO audit_logs (id, document_id, user_id, action, details, timestamp)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, document_id, user_id, action, details, timestamp
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.document_id)
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(&entry.details)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("appending audit entry"))?;

        row.try_into()
    }

    async fn history(&self, document_id: &Uuid) -> Result<Vec<AuditHistoryEntry>, DomainError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT a.id, a.document_id, a.user_id, a.action, a.details, a.timestamp,
                   u.name AS user_name, u.role AS user_role
            FROM audit_logs a
            JOIN users u ON u.id = a.user_id
            WHERE a.document_id = $1
            ORDER BY a.timestamp DESC, a.seq DESC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("loading audit history"))?;

        rows.into_iter()
            .map(|row| -> Result<AuditHistoryEntry, DomainError> {
                let role = UserRole::from_str(&row.user_role)
                    .ok_or_else(|| corrupt("users.role", &row.user_role))?;
                Ok(AuditHistoryEntry {
                    entry: row.entry.try_into()?,
                    user: AuditActor { name: row.user_name, role },
                })
            })
            .collect()
    }
}
