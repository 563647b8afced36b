// ============================================================================
// Vault Infrastructure - PostgreSQL Document Repository
// File: crates/vault-infrastructure/src/database/postgres/document_repo_impl.rs
// ============================================================================
//! Documents and their audited mutations. Every write that must be audited
//! runs the entity statement and the audit insert in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use vault_core::domain::{
    DocStatus, DocType, Document, DocumentQuery, DocumentSummary, FundRef, NewAuditEntry,
};
use vault_core::error::DomainError;
use vault_core::repositories::DocumentRepository;

use super::{corrupt, db_error};

pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    fund_id: Uuid,
    doc_type: String,
    status: String,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    file_key: String,
    original_filename: String,
    mime_type: Option<String>,
    file_size: i64,
    file_sha256: String,
    uploaded_by_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = DomainError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Document {
            id: row.id,
            title: row.title,
            description: row.description,
            fund_id: row.fund_id,
            doc_type: DocType::from_str(&row.doc_type)
                .ok_or_else(|| corrupt("documents.doc_type", &row.doc_type))?,
            status: DocStatus::from_str(&row.status)
                .ok_or_else(|| corrupt("documents.status", &row.status))?,
            period_start: row.period_start,
            period_end: row.period_end,
            file_key: row.file_key,
            original_filename: row.original_filename,
            mime_type: row.mime_type,
            file_size: row.file_size,
            file_sha256: row.file_sha256,
            uploaded_by_id: row.uploaded_by_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DocumentSummaryRow {
    #[sqlx(flatten)]
    document: DocumentRow,
    fund_name: String,
    fund_code: String,
}

impl TryFrom<DocumentSummaryRow> for DocumentSummary {
    type Error = DomainError;

    fn try_from(row: DocumentSummaryRow) -> Result<Self, Self::Error> {
        Ok(DocumentSummary {
            document: row.document.try_into()?,
            fund: FundRef { name: row.fund_name, code: row.fund_code },
        })
    }
}

const DOCUMENT_COLUMNS: &str = "id, title, description, fund_id, doc_type, status, \
     period_start, period_end, file_key, original_filename, mime_type, file_size, \
     file_sha256, uploaded_by_id, created_at, updated_at";

async fn insert_audit(
    tx: &mut Transaction<'_, Postgres>,
    audit: &NewAuditEntry,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, document_id, user_id, action, details, timestamp)
        VALUES ($1, $2, $3, $4, $5, NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(audit.document_id)
    .bind(audit.user_id)
    .bind(audit.action.as_str())
    .bind(&audit.details)
    .execute(&mut **tx)
    .await
    .map_err(db_error("writing audit entry"))?;
    Ok(())
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn create_with_audit(
        &self,
        document: &Document,
        audit: &NewAuditEntry,
    ) -> Result<Document, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("starting transaction"))?;

        let row: DocumentRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO documents ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS, DOCUMENT_COLUMNS
        ))
        .bind(document.id)
        .bind(&document.title)
        .bind(&document.description)
        .bind(document.fund_id)
        .bind(document.doc_type.as_str())
        .bind(document.status.as_str())
        .bind(document.period_start)
        .bind(document.period_end)
        .bind(&document.file_key)
        .bind(&document.original_filename)
        .bind(&document.mime_type)
        .bind(document.file_size)
        .bind(&document.file_sha256)
        .bind(document.uploaded_by_id)
        .bind(document.created_at)
        .bind(document.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("creating document"))?;

        insert_audit(&mut tx, audit).await?;
        tx.commit().await.map_err(db_error("committing document"))?;

        info!("Document created: {}", row.id);
        row.try_into()
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Document>, DomainError> {
        let row: Option<DocumentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM documents WHERE id = $1",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("finding document"))?;

        row.map(Document::try_from).transpose()
    }

    async fn list(&self, query: &DocumentQuery) -> Result<Vec<DocumentSummary>, DomainError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT d.id, d.title, d.description, d.fund_id, d.doc_type, d.status,
                   d.period_start, d.period_end, d.file_key, d.original_filename,
                   d.mime_type, d.file_size, d.file_sha256, d.uploaded_by_id,
                   d.created_at, d.updated_at,
                   f.name AS fund_name, f.code AS fund_code
            FROM documents d
            JOIN funds f ON f.id = d.fund_id
            WHERE TRUE
            "#,
        );

        let filter = &query.filter;
        if let Some(fund_id) = filter.fund_id {
            qb.push(" AND d.fund_id = ").push_bind(fund_id);
        }
        if let Some(doc_type) = filter.doc_type {
            qb.push(" AND d.doc_type = ").push_bind(doc_type.as_str());
        }
        if let Some(status) = filter.status {
            qb.push(" AND d.status = ").push_bind(status.as_str());
        }
        if let Some(scope) = &query.fund_scope {
            qb.push(" AND d.fund_id = ANY(").push_bind(scope.clone()).push(")");
        }
        qb.push(" ORDER BY d.created_at DESC, d.id");
        if let Some(page) = filter.pagination {
            qb.push(" LIMIT ")
                .push_bind(page.limit() as i64)
                .push(" OFFSET ")
                .push_bind(page.offset() as i64);
        }

        let rows: Vec<DocumentSummaryRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("listing documents"))?;

        debug!("Listed {} documents", rows.len());
        rows.into_iter().map(DocumentSummary::try_from).collect()
    }

    async fn update_status_with_audit(
        &self,
        id: &Uuid,
        from: DocStatus,
        to: DocStatus,
        audit: &NewAuditEntry,
    ) -> Result<Option<Document>, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("starting transaction"))?;

        let row: Option<DocumentRow> = sqlx::query_as(&format!(
            r#"
            UPDATE documents
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("updating document status"))?;

        // Dropping the transaction rolls it back
        let Some(row) = row else {
            return Ok(None);
        };

        insert_audit(&mut tx, audit).await?;
        tx.commit().await.map_err(db_error("committing status change"))?;

        Document::try_from(row).map(Some)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("deleting document"))?;

        Ok(result.rows_affected() > 0)
    }
}
