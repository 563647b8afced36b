// ============================================================================
// Vault Core - Document Lifecycle Service
// File: crates/vault-core/src/services/document_service.rs
// ============================================================================
//! Document creation, queries, status transitions and removal.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vault_shared::config::{StorageSettings, WorkflowSettings};
use vault_shared::constants::{ALLOWED_DOCUMENT_EXTENSIONS, DEFAULT_UPLOAD_ATTEMPTS};
use vault_shared::utils::file_extension;

use crate::domain::{
    AuditAction, AuditHistoryEntry, AuthUser, DocStatus, Document, DocumentDetail,
    DocumentFilter, DocumentQuery, DocumentSummary, FilePayload, NewAuditEntry, NewDocument,
    UploaderRef,
};
use crate::error::DomainError;
use crate::permissions::{self, Capability};
use crate::ports::{BlobStore, BlobStream};
use crate::repositories::{DocumentRepository, FundRepository, UserRepository};
use crate::services::AuditService;

/// Tunables for document creation and status changes.
#[derive(Debug, Clone)]
pub struct LifecyclePolicy {
    pub upload_attempts: u32,
    pub upload_retry_delay: Duration,
    pub upload_timeout: Duration,
    pub enforce_forward_transitions: bool,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            upload_attempts: DEFAULT_UPLOAD_ATTEMPTS,
            upload_retry_delay: Duration::from_millis(25),
            upload_timeout: Duration::from_secs(30),
            enforce_forward_transitions: false,
        }
    }
}

impl LifecyclePolicy {
    pub fn from_settings(storage: &StorageSettings, workflow: &WorkflowSettings) -> Self {
        Self {
            upload_attempts: storage.max_attempts.max(1),
            upload_retry_delay: Duration::from_millis(storage.retry_delay_ms),
            upload_timeout: Duration::from_secs(storage.timeout_seconds.max(1)),
            enforce_forward_transitions: workflow.enforce_forward_transitions,
        }
    }
}

pub struct DocumentService {
    document_repo: Arc<dyn DocumentRepository>,
    fund_repo: Arc<dyn FundRepository>,
    user_repo: Arc<dyn UserRepository>,
    audit: Arc<AuditService>,
    blobs: Arc<dyn BlobStore>,
    policy: LifecyclePolicy,
}

impl DocumentService {
    pub fn new(
        document_repo: Arc<dyn DocumentRepository>,
        fund_repo: Arc<dyn FundRepository>,
        user_repo: Arc<dyn UserRepository>,
        audit: Arc<AuditService>,
        blobs: Arc<dyn BlobStore>,
        policy: LifecyclePolicy,
    ) -> Self {
        Self { document_repo, fund_repo, user_repo, audit, blobs, policy }
    }

    /// Validate -> store blob (bounded retry) -> insert document + CREATED entry.
    pub async fn create(
        &self,
        input: NewDocument,
        file: FilePayload,
        actor: &AuthUser,
    ) -> Result<Document, DomainError> {
        info!(user_id = %actor.id, "Document upload: {} ({} bytes)", file.filename, file.size());

        // 1. Validate everything before touching storage
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::Validation("Title is required".into()));
        }
        let extension = file_extension(&file.filename).unwrap_or_default();
        if !ALLOWED_DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
            return Err(DomainError::Validation(format!(
                "File extension .{} is not allowed",
                extension
            )));
        }
        if file.data.is_empty() {
            return Err(DomainError::Validation("File is empty".into()));
        }
        if input.period_end < input.period_start {
            return Err(DomainError::Validation(
                "Period end must not be before period start".into(),
            ));
        }
        if self.fund_repo.find_by_id(&input.fund_id).await?.is_none() {
            return Err(DomainError::not_found("Fund", input.fund_id));
        }

        // 2. Persist the bytes
        let sha256 = hex::encode(Sha256::digest(&file.data));
        let file_key = self.store_with_retry(&file.filename, file.data.clone()).await?;
        debug!("Stored blob {} (sha256 {})", file_key, sha256);

        // 3. Document row and its CREATED entry, atomically
        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            title,
            description: input.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            fund_id: input.fund_id,
            doc_type: input.doc_type,
            status: DocStatus::Pending,
            period_start: input.period_start,
            period_end: input.period_end,
            file_key: file_key.clone(),
            original_filename: file.filename.clone(),
            mime_type: file.content_type.clone(),
            file_size: file.size() as i64,
            file_sha256: sha256.clone(),
            uploaded_by_id: actor.id,
            created_at: now,
            updated_at: now,
        };
        let audit = NewAuditEntry::created(actor.id, document.id, &file_key, &sha256);

        match self.document_repo.create_with_audit(&document, &audit).await {
            Ok(created) => {
                info!(document_id = %created.id, "Document created in fund {}", created.fund_id);
                Ok(created)
            }
            Err(e) => {
                error!("Failed to persist document, removing blob {}: {}", file_key, e);
                if let Err(cleanup) = self.blobs.delete(&file_key).await {
                    warn!("Orphaned blob {} left behind: {}", file_key, cleanup);
                }
                Err(e)
            }
        }
    }

    async fn store_with_retry(&self, filename: &str, data: Bytes) -> Result<String, DomainError> {
        let max_attempts = self.policy.upload_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = match tokio::time::timeout(
                self.policy.upload_timeout,
                self.blobs.put(filename, data.clone()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(DomainError::UpstreamUnavailable(format!(
                    "Blob store did not respond within {:?}",
                    self.policy.upload_timeout
                ))),
            };

            match result {
                Ok(key) => return Ok(key),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt < max_attempts => {
                    warn!("Upload attempt {}/{} failed: {}", attempt, max_attempts, e);
                    tokio::time::sleep(self.policy.upload_retry_delay).await;
                }
                Err(e) => {
                    error!("Upload failed after {} attempts: {}", attempt, e);
                    return Err(DomainError::Upstream(format!(
                        "Failed to upload file after {} attempts",
                        attempt
                    )));
                }
            }
        }
    }

    /// Fund managers only ever see documents of funds they manage.
    pub async fn find_all(
        &self,
        filter: DocumentFilter,
        actor: &AuthUser,
    ) -> Result<Vec<DocumentSummary>, DomainError> {
        let fund_scope = self.fund_scope(actor).await?;
        if matches!(&fund_scope, Some(scope) if scope.is_empty()) {
            debug!(user_id = %actor.id, "No managed funds, empty document list");
            return Ok(Vec::new());
        }
        self.document_repo.list(&DocumentQuery { filter, fund_scope }).await
    }

    /// Fund managers are limited to documents of the funds they manage.
    async fn ensure_visible(&self, document: &Document, actor: &AuthUser) -> Result<(), DomainError> {
        match self.fund_scope(actor).await? {
            Some(scope) if !scope.contains(&document.fund_id) => {
                warn!(user_id = %actor.id, document_id = %document.id, "Denied: document outside managed funds");
                Err(DomainError::Forbidden("Document belongs to a fund you do not manage".into()))
            }
            _ => Ok(()),
        }
    }

    async fn fund_scope(&self, actor: &AuthUser) -> Result<Option<Vec<Uuid>>, DomainError> {
        if permissions::can(actor.role, Capability::ViewAllFunds) {
            return Ok(None);
        }
        Ok(Some(self.fund_repo.managed_fund_ids(&actor.id).await?))
    }

    pub async fn find_one(&self, id: &Uuid, actor: &AuthUser) -> Result<DocumentDetail, DomainError> {
        let document = self.get(id).await?;
        self.ensure_visible(&document, actor).await?;
        let fund = self
            .fund_repo
            .find_by_id(&document.fund_id)
            .await?
            .ok_or_else(|| DomainError::Internal(format!("Document {} has no fund", id)))?;
        let uploaded_by = self
            .user_repo
            .find_by_id(&document.uploaded_by_id)
            .await?
            .map(|u| UploaderRef { name: u.name, email: u.email });
        let audit_logs = self.audit.get_history(id).await?;

        Ok(DocumentDetail { document, fund, uploaded_by, audit_logs })
    }

    pub async fn history(&self, id: &Uuid, actor: &AuthUser) -> Result<Vec<AuditHistoryEntry>, DomainError> {
        let document = self.get(id).await?;
        self.ensure_visible(&document, actor).await?;
        self.audit.get_history(id).await
    }

    pub async fn update_status(
        &self,
        id: &Uuid,
        new_status: DocStatus,
        comment: Option<String>,
        actor: &AuthUser,
    ) -> Result<Document, DomainError> {
        let document = self.get(id).await?;
        permissions::authorize_status_change(actor, new_status)?;

        let old_status = document.status;
        if self.policy.enforce_forward_transitions && !old_status.advances_to(new_status) {
            return Err(DomainError::Conflict(format!(
                "Cannot move document from {} to {}",
                old_status.as_str(),
                new_status.as_str()
            )));
        }

        let audit = NewAuditEntry::status_changed(actor.id, *id, old_status, new_status, comment.as_deref());
        let updated = self
            .document_repo
            .update_status_with_audit(id, old_status, new_status, &audit)
            .await?
            .ok_or_else(|| {
                DomainError::Conflict("Document status changed concurrently, retry the request".into())
            })?;

        info!(
            document_id = %id,
            user_id = %actor.id,
            "Status {} -> {}",
            old_status.as_str(),
            new_status.as_str()
        );
        Ok(updated)
    }

    pub async fn remove(&self, id: &Uuid, actor: &AuthUser) -> Result<(), DomainError> {
        let document = self.get(id).await?;
        if !self.document_repo.delete(id).await? {
            return Err(DomainError::not_found("Document", id));
        }
        info!(document_id = %id, user_id = %actor.id, "Document deleted");

        if let Err(e) = self.blobs.delete(&document.file_key).await {
            warn!("Failed to remove blob {} of deleted document: {}", document.file_key, e);
        }
        Ok(())
    }

    /// Opens the stored bytes and records a DOWNLOADED entry.
    pub async fn download(
        &self,
        id: &Uuid,
        actor: &AuthUser,
    ) -> Result<(Document, BlobStream), DomainError> {
        let document = self.get(id).await?;
        self.ensure_visible(&document, actor).await?;

        let stream = self.blobs.open(&document.file_key).await?;
        self.audit
            .log_action(
                actor.id,
                document.id,
                AuditAction::Downloaded,
                Some(json!({ "fileKey": document.file_key })),
            )
            .await?;
        Ok((document, stream))
    }

    async fn get(&self, id: &Uuid) -> Result<Document, DomainError> {
        self.document_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Document", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocType, Fund, NewFund, UserRole};
    use crate::repositories::{
        MockAuditRepository, MockDocumentRepository, MockFundRepository, MockUserRepository,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` puts, then succeeds.
    struct FlakyBlobStore {
        failures: u32,
        puts: AtomicU32,
        deletes: AtomicU32,
    }

    impl FlakyBlobStore {
        fn new(failures: u32) -> Self {
            Self { failures, puts: AtomicU32::new(0), deletes: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl BlobStore for FlakyBlobStore {
        async fn put(&self, original_filename: &str, _data: Bytes) -> Result<String, DomainError> {
            let n = self.puts.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(DomainError::Upstream("disk busy".into()));
            }
            Ok(format!("{}-{}", n, original_filename))
        }

        async fn open(&self, key: &str) -> Result<BlobStream, DomainError> {
            Err(DomainError::not_found("Blob", key))
        }

        async fn delete(&self, _key: &str) -> Result<(), DomainError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn actor(role: UserRole) -> AuthUser {
        AuthUser { id: Uuid::new_v4(), email: "a@auditvault.com".into(), name: "A".into(), role }
    }

    fn fund() -> Fund {
        Fund::new(NewFund {
            code: "GF-001".into(),
            name: "Global Tech Fund".into(),
            region: None,
            currency: None,
            manager_ids: vec![],
        })
    }

    fn document(status: DocStatus) -> Document {
        let now = Utc::now();
        Document {
            id: Uuid::new_v4(),
            title: "Q1 report".into(),
            description: None,
            fund_id: Uuid::new_v4(),
            doc_type: DocType::QuarterlyReport,
            status,
            period_start: now,
            period_end: now,
            file_key: "key".into(),
            original_filename: "q1.pdf".into(),
            mime_type: Some("application/pdf".into()),
            file_size: 3,
            file_sha256: String::new(),
            uploaded_by_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn upload(filename: &str, data: &'static [u8]) -> (NewDocument, FilePayload) {
        let now = Utc::now();
        (
            NewDocument {
                title: "Q1 report".into(),
                fund_id: Uuid::new_v4(),
                doc_type: DocType::QuarterlyReport,
                period_start: now,
                period_end: now,
                description: None,
            },
            FilePayload {
                filename: filename.into(),
                content_type: None,
                data: Bytes::from_static(data),
            },
        )
    }

    fn service(
        documents: MockDocumentRepository,
        funds: MockFundRepository,
        blobs: Arc<FlakyBlobStore>,
        policy: LifecyclePolicy,
    ) -> DocumentService {
        DocumentService::new(
            Arc::new(documents),
            Arc::new(funds),
            Arc::new(MockUserRepository::new()),
            Arc::new(AuditService::new(Arc::new(MockAuditRepository::new()))),
            blobs,
            policy,
        )
    }

    fn fast_policy() -> LifecyclePolicy {
        LifecyclePolicy { upload_retry_delay: Duration::from_millis(1), ..Default::default() }
    }

    #[tokio::test]
    async fn fund_manager_cannot_change_status_and_nothing_is_written() {
        let doc = document(DocStatus::Pending);
        let returned = doc.clone();
        let mut documents = MockDocumentRepository::new();
        documents.expect_find_by_id().returning(move |_| Ok(Some(returned.clone())));
        documents.expect_update_status_with_audit().times(0);

        let svc = service(documents, MockFundRepository::new(), Arc::new(FlakyBlobStore::new(0)), fast_policy());
        let result = svc
            .update_status(&doc.id, DocStatus::Pending, None, &actor(UserRole::FundManager))
            .await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn compliance_officer_cannot_approve() {
        let doc = document(DocStatus::InReview);
        let returned = doc.clone();
        let mut documents = MockDocumentRepository::new();
        documents.expect_find_by_id().returning(move |_| Ok(Some(returned.clone())));
        documents.expect_update_status_with_audit().times(0);

        let svc = service(documents, MockFundRepository::new(), Arc::new(FlakyBlobStore::new(0)), fast_policy());
        let result = svc
            .update_status(&doc.id, DocStatus::Approved, None, &actor(UserRole::ComplianceOfficer))
            .await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn approval_records_old_status_in_audit_entry() {
        let doc = document(DocStatus::Pending);
        let returned = doc.clone();
        let mut documents = MockDocumentRepository::new();
        documents.expect_find_by_id().returning(move |_| Ok(Some(returned.clone())));
        documents
            .expect_update_status_with_audit()
            .withf(|_, from, to, audit| {
                *from == DocStatus::Pending
                    && *to == DocStatus::Approved
                    && audit.details["oldStatus"] == "PENDING"
                    && audit.details["comment"] == "looks good"
            })
            .times(1)
            .returning(|_, _, to, _| {
                let mut d = document(to);
                d.status = to;
                Ok(Some(d))
            });

        let svc = service(documents, MockFundRepository::new(), Arc::new(FlakyBlobStore::new(0)), fast_policy());
        let updated = svc
            .update_status(&doc.id, DocStatus::Approved, Some("looks good".into()), &actor(UserRole::Auditor))
            .await
            .unwrap();
        assert_eq!(updated.status, DocStatus::Approved);
    }

    #[tokio::test]
    async fn lost_compare_and_set_is_a_conflict() {
        let doc = document(DocStatus::Pending);
        let returned = doc.clone();
        let mut documents = MockDocumentRepository::new();
        documents.expect_find_by_id().returning(move |_| Ok(Some(returned.clone())));
        documents.expect_update_status_with_audit().returning(|_, _, _, _| Ok(None));

        let svc = service(documents, MockFundRepository::new(), Arc::new(FlakyBlobStore::new(0)), fast_policy());
        let result = svc
            .update_status(&doc.id, DocStatus::InReview, None, &actor(UserRole::Admin))
            .await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn strict_workflow_rejects_backward_moves() {
        let doc = document(DocStatus::Approved);
        let returned = doc.clone();
        let mut documents = MockDocumentRepository::new();
        documents.expect_find_by_id().returning(move |_| Ok(Some(returned.clone())));
        documents.expect_update_status_with_audit().times(0);

        let policy = LifecyclePolicy { enforce_forward_transitions: true, ..fast_policy() };
        let svc = service(documents, MockFundRepository::new(), Arc::new(FlakyBlobStore::new(0)), policy);
        let result = svc
            .update_status(&doc.id, DocStatus::Pending, None, &actor(UserRole::Admin))
            .await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn missing_document_is_reported_before_role_checks() {
        let mut documents = MockDocumentRepository::new();
        documents.expect_find_by_id().returning(|_| Ok(None));

        let svc = service(documents, MockFundRepository::new(), Arc::new(FlakyBlobStore::new(0)), fast_policy());
        let result = svc
            .update_status(&Uuid::new_v4(), DocStatus::Approved, None, &actor(UserRole::FundManager))
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { entity: "Document", .. })));
    }

    #[tokio::test]
    async fn disallowed_extension_is_rejected_before_storage() {
        let blobs = Arc::new(FlakyBlobStore::new(0));
        let svc = service(MockDocumentRepository::new(), MockFundRepository::new(), blobs.clone(), fast_policy());

        let (input, file) = upload("malware.exe", b"MZ");
        let result = svc.create(input, file, &actor(UserRole::Admin)).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(blobs.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_file_and_blank_title_are_rejected() {
        let svc = service(
            MockDocumentRepository::new(),
            MockFundRepository::new(),
            Arc::new(FlakyBlobStore::new(0)),
            fast_policy(),
        );

        let (input, file) = upload("empty.pdf", b"");
        assert!(matches!(
            svc.create(input, file, &actor(UserRole::Admin)).await,
            Err(DomainError::Validation(_))
        ));

        let (mut input, file) = upload("q1.pdf", b"%PDF");
        input.title = "   ".into();
        assert!(matches!(
            svc.create(input, file, &actor(UserRole::Admin)).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unknown_fund_is_not_found() {
        let mut funds = MockFundRepository::new();
        funds.expect_find_by_id().returning(|_| Ok(None));
        let svc = service(MockDocumentRepository::new(), funds, Arc::new(FlakyBlobStore::new(0)), fast_policy());

        let (input, file) = upload("q1.pdf", b"%PDF");
        let result = svc.create(input, file, &actor(UserRole::Admin)).await;
        assert!(matches!(result, Err(DomainError::NotFound { entity: "Fund", .. })));
    }

    #[tokio::test]
    async fn transient_blob_failures_are_retried() {
        let mut funds = MockFundRepository::new();
        funds.expect_find_by_id().returning(|_| Ok(Some(fund())));
        let mut documents = MockDocumentRepository::new();
        documents
            .expect_create_with_audit()
            .withf(|doc, audit| audit.details["fileKey"] == doc.file_key.as_str())
            .times(1)
            .returning(|doc, _| Ok(doc.clone()));

        let blobs = Arc::new(FlakyBlobStore::new(2));
        let svc = service(documents, funds, blobs.clone(), fast_policy());

        let (input, file) = upload("Q1.PDF", b"%PDF-1.7");
        let created = svc.create(input, file, &actor(UserRole::FundManager)).await.unwrap();
        assert_eq!(created.status, DocStatus::Pending);
        assert_eq!(created.file_key, "2-Q1.PDF");
        assert_eq!(blobs.puts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn blob_store_gives_up_after_configured_attempts() {
        let mut funds = MockFundRepository::new();
        funds.expect_find_by_id().returning(|_| Ok(Some(fund())));
        let mut documents = MockDocumentRepository::new();
        documents.expect_create_with_audit().times(0);

        let blobs = Arc::new(FlakyBlobStore::new(u32::MAX));
        let svc = service(documents, funds, blobs.clone(), fast_policy());

        let (input, file) = upload("q1.pdf", b"%PDF");
        let result = svc.create(input, file, &actor(UserRole::Admin)).await;
        assert!(matches!(result, Err(DomainError::Upstream(_))));
        assert_eq!(blobs.puts.load(Ordering::SeqCst), DEFAULT_UPLOAD_ATTEMPTS);
    }

    #[tokio::test]
    async fn failed_insert_removes_the_stored_blob() {
        let mut funds = MockFundRepository::new();
        funds.expect_find_by_id().returning(|_| Ok(Some(fund())));
        let mut documents = MockDocumentRepository::new();
        documents
            .expect_create_with_audit()
            .returning(|_, _| Err(DomainError::Database("deadlock".into())));

        let blobs = Arc::new(FlakyBlobStore::new(0));
        let svc = service(documents, funds, blobs.clone(), fast_policy());

        let (input, file) = upload("q1.docx", b"PK");
        let result = svc.create(input, file, &actor(UserRole::Admin)).await;
        assert!(matches!(result, Err(DomainError::Database(_))));
        assert_eq!(blobs.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fund_manager_without_funds_sees_nothing() {
        let mut funds = MockFundRepository::new();
        funds.expect_managed_fund_ids().returning(|_| Ok(vec![]));
        let mut documents = MockDocumentRepository::new();
        documents.expect_list().times(0);

        let svc = service(documents, funds, Arc::new(FlakyBlobStore::new(0)), fast_policy());
        let docs = svc
            .find_all(DocumentFilter::default(), &actor(UserRole::FundManager))
            .await
            .unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn fund_manager_query_is_scoped_to_managed_funds() {
        let managed = Uuid::new_v4();
        let mut funds = MockFundRepository::new();
        funds.expect_managed_fund_ids().returning(move |_| Ok(vec![managed]));
        let mut documents = MockDocumentRepository::new();
        documents
            .expect_list()
            .withf(move |q| q.fund_scope == Some(vec![managed]) && q.filter.status == Some(DocStatus::Pending))
            .times(1)
            .returning(|_| Ok(vec![]));

        let svc = service(documents, funds, Arc::new(FlakyBlobStore::new(0)), fast_policy());
        let filter = DocumentFilter { status: Some(DocStatus::Pending), ..Default::default() };
        svc.find_all(filter, &actor(UserRole::FundManager)).await.unwrap();
    }
}
