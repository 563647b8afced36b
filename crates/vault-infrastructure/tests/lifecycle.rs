//! Document lifecycle end to end over the in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use futures::TryStreamExt;
use uuid::Uuid;

use vault_core::domain::{
    AuditAction, AuthUser, DocStatus, DocType, Document, DocumentFilter, FilePayload, Fund,
    NewDocument, NewFund, NewRegistration, User, UserRole, UserStatus,
};
use vault_core::error::DomainError;
use vault_core::repositories::UserRepository;
use vault_core::services::{
    AuditService, AuthService, DocumentService, FundService, LifecyclePolicy, UserService,
};
use vault_infrastructure::{MemoryBlobStore, MemoryDatabase};
use vault_security::JwtService;

struct World {
    db: Arc<MemoryDatabase>,
    blobs: Arc<MemoryBlobStore>,
    documents: DocumentService,
    funds: FundService,
}

impl World {
    fn new(policy: LifecyclePolicy) -> Self {
        let db = Arc::new(MemoryDatabase::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let audit = Arc::new(AuditService::new(db.clone()));
        let documents = DocumentService::new(
            db.clone(),
            db.clone(),
            db.clone(),
            audit,
            blobs.clone(),
            policy,
        );
        let funds = FundService::new(db.clone(), db.clone());
        Self { db, blobs, documents, funds }
    }

    fn standard() -> Self {
        Self::new(LifecyclePolicy {
            upload_retry_delay: Duration::from_millis(1),
            ..Default::default()
        })
    }

    async fn user(&self, name: &str, role: UserRole) -> AuthUser {
        let email = format!("{}@auditvault.com", name.to_lowercase());
        let mut user = User::new(name.into(), email, "unused".into(), role).unwrap();
        user.status = UserStatus::Active;
        UserRepository::create(self.db.as_ref(), &user).await.unwrap().to_auth_user()
    }

    async fn fund(&self, code: &str, managers: Vec<Uuid>, admin: &AuthUser) -> Fund {
        let input = NewFund {
            code: code.into(),
            name: format!("{} Fund", code),
            region: Some("Europe".into()),
            currency: Some("EUR".into()),
            manager_ids: managers,
        };
        self.funds.create(input, admin).await.unwrap()
    }

    async fn upload(&self, fund: &Fund, filename: &str, data: &'static [u8], actor: &AuthUser) -> Result<Document, DomainError> {
        let input = NewDocument {
            title: format!("Report {}", filename),
            fund_id: fund.id,
            doc_type: DocType::QuarterlyReport,
            period_start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            period_end: Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap(),
            description: None,
        };
        let file = FilePayload {
            filename: filename.into(),
            content_type: Some("application/pdf".into()),
            data: Bytes::from_static(data),
        };
        self.documents.create(input, file, actor).await
    }
}

#[tokio::test]
async fn auditor_approves_pending_document() {
    let world = World::standard();
    let admin = world.user("Admin", UserRole::Admin).await;
    let auditor = world.user("Auditor", UserRole::Auditor).await;
    let fund = world.fund("GTF-001", vec![], &admin).await;

    let doc = world.upload(&fund, "q1.pdf", b"%PDF-1.7 q1", &admin).await.unwrap();
    assert_eq!(doc.status, DocStatus::Pending);

    let approved = world
        .documents
        .update_status(&doc.id, DocStatus::Approved, Some("Verified".into()), &auditor)
        .await
        .unwrap();
    assert_eq!(approved.status, DocStatus::Approved);

    let history = world.documents.history(&doc.id, &auditor).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].entry.action, AuditAction::StatusChanged);
    assert_eq!(history[0].entry.details["oldStatus"], "PENDING");
    assert_eq!(history[0].entry.details["newStatus"], "APPROVED");
    assert_eq!(history[0].entry.details["comment"], "Verified");
    assert_eq!(history[0].user.role, UserRole::Auditor);
    assert_eq!(history[1].entry.action, AuditAction::Created);
}

#[tokio::test]
async fn fund_manager_status_change_is_refused_without_trace() {
    let world = World::standard();
    let admin = world.user("Admin", UserRole::Admin).await;
    let manager = world.user("Manager", UserRole::FundManager).await;
    let fund = world.fund("GTF-001", vec![manager.id], &admin).await;
    let doc = world.upload(&fund, "q1.pdf", b"%PDF", &manager).await.unwrap();

    for target in DocStatus::ALL {
        let result = world.documents.update_status(&doc.id, target, None, &manager).await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))), "{:?}", target);
    }

    let detail = world.documents.find_one(&doc.id, &manager).await.unwrap();
    assert_eq!(detail.document.status, DocStatus::Pending);
    assert_eq!(detail.audit_logs.len(), 1);
    assert_eq!(detail.audit_logs[0].entry.action, AuditAction::Created);
}

#[tokio::test]
async fn creation_writes_one_created_entry_with_the_file_key() {
    let world = World::standard();
    let admin = world.user("Admin", UserRole::Admin).await;
    let fund = world.fund("GTF-001", vec![], &admin).await;

    let doc = world.upload(&fund, "Annual.DOCX", b"PK\x03\x04", &admin).await.unwrap();
    let entries = world.db.raw_audit_entries(&doc.id);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::Created);
    assert_eq!(entries[0].details["fileKey"], doc.file_key.as_str());
    assert_eq!(entries[0].details["sha256"], doc.file_sha256.as_str());
    assert!(world.blobs.contains(&doc.file_key));
}

#[tokio::test]
async fn fund_manager_only_sees_managed_funds() {
    let world = World::standard();
    let admin = world.user("Admin", UserRole::Admin).await;
    let manager = world.user("Manager", UserRole::FundManager).await;
    let mine = world.fund("MINE-1", vec![manager.id], &admin).await;
    let other = world.fund("OTHER-1", vec![], &admin).await;

    world.upload(&mine, "a.pdf", b"a", &admin).await.unwrap();
    world.upload(&other, "b.pdf", b"b", &admin).await.unwrap();
    world.upload(&other, "c.pdf", b"c", &admin).await.unwrap();

    let visible = world.documents.find_all(DocumentFilter::default(), &manager).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert!(visible.iter().all(|d| d.document.fund_id == mine.id));
    assert_eq!(visible[0].fund.code, "MINE-1");

    // Filtering on a foreign fund does not widen the scope
    let filter = DocumentFilter { fund_id: Some(other.id), ..Default::default() };
    assert!(world.documents.find_all(filter, &manager).await.unwrap().is_empty());

    let everything = world.documents.find_all(DocumentFilter::default(), &admin).await.unwrap();
    assert_eq!(everything.len(), 3);

    let outsider = world.user("Outsider", UserRole::FundManager).await;
    assert!(world.documents.find_all(DocumentFilter::default(), &outsider).await.unwrap().is_empty());
}

#[tokio::test]
async fn history_is_newest_first() {
    let world = World::standard();
    let admin = world.user("Admin", UserRole::Admin).await;
    let fund = world.fund("GTF-001", vec![], &admin).await;
    let doc = world.upload(&fund, "q1.pdf", b"%PDF", &admin).await.unwrap();

    for status in [DocStatus::InReview, DocStatus::Approved, DocStatus::Archived] {
        world.documents.update_status(&doc.id, status, None, &admin).await.unwrap();
    }

    let history = world.documents.history(&doc.id, &admin).await.unwrap();
    assert_eq!(history.len(), 4);
    assert!(history.windows(2).all(|w| w[0].entry.timestamp >= w[1].entry.timestamp));
    assert_eq!(history[0].entry.details["newStatus"], "ARCHIVED");
    assert_eq!(history[3].entry.action, AuditAction::Created);
}

#[tokio::test]
async fn delete_removes_document_audit_trail_and_blob() {
    let world = World::standard();
    let admin = world.user("Admin", UserRole::Admin).await;
    let manager = world.user("Manager", UserRole::FundManager).await;
    let fund = world.fund("GTF-001", vec![manager.id], &admin).await;
    let doc = world.upload(&fund, "q1.pdf", b"%PDF", &admin).await.unwrap();
    world.documents.update_status(&doc.id, DocStatus::InReview, None, &admin).await.unwrap();

    world.documents.remove(&doc.id, &manager).await.unwrap();

    assert!(world.db.raw_audit_entries(&doc.id).is_empty());
    assert!(!world.blobs.contains(&doc.file_key));
    assert!(matches!(
        world.documents.find_one(&doc.id, &manager).await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        world.documents.remove(&doc.id, &manager).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn download_returns_identical_bytes_and_is_audited() {
    let world = World::standard();
    let admin = world.user("Admin", UserRole::Admin).await;
    let fund = world.fund("GTF-001", vec![], &admin).await;
    let payload: &'static [u8] = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\n%%EOF";
    let doc = world.upload(&fund, "q1.pdf", payload, &admin).await.unwrap();

    let (meta, stream) = world.documents.download(&doc.id, &admin).await.unwrap();
    let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
    assert_eq!(chunks.concat(), payload);
    assert_eq!(meta.original_filename, "q1.pdf");

    let history = world.documents.history(&doc.id, &admin).await.unwrap();
    assert_eq!(history[0].entry.action, AuditAction::Downloaded);
}

#[tokio::test]
async fn fund_manager_cannot_read_foreign_documents() {
    let world = World::standard();
    let admin = world.user("Admin", UserRole::Admin).await;
    let manager = world.user("Manager", UserRole::FundManager).await;
    let fund = world.fund("OTHER-1", vec![], &admin).await;
    let doc = world.upload(&fund, "q1.pdf", b"%PDF", &admin).await.unwrap();

    assert!(matches!(
        world.documents.download(&doc.id, &manager).await,
        Err(DomainError::Forbidden(_))
    ));
    assert!(matches!(
        world.documents.find_one(&doc.id, &manager).await,
        Err(DomainError::Forbidden(_))
    ));
    assert!(matches!(
        world.documents.history(&doc.id, &manager).await,
        Err(DomainError::Forbidden(_))
    ));
    assert_eq!(world.db.raw_audit_entries(&doc.id).len(), 1);

    // Unknown ids stay 404 for every role
    assert!(matches!(
        world.documents.find_one(&Uuid::new_v4(), &manager).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn transient_blob_failures_are_absorbed() {
    let world = World::standard();
    let admin = world.user("Admin", UserRole::Admin).await;
    let fund = world.fund("GTF-001", vec![], &admin).await;

    world.blobs.fail_next_puts(2);
    let doc = world.upload(&fund, "q1.pdf", b"%PDF", &admin).await.unwrap();
    assert_eq!(world.blobs.put_attempts(), 3);
    assert!(world.blobs.contains(&doc.file_key));
}

#[tokio::test]
async fn persistent_blob_failure_surfaces_without_side_effects() {
    let world = World::standard();
    let admin = world.user("Admin", UserRole::Admin).await;
    let fund = world.fund("GTF-001", vec![], &admin).await;

    world.blobs.fail_next_puts(5);
    let result = world.upload(&fund, "q1.pdf", b"%PDF", &admin).await;
    assert!(matches!(result, Err(DomainError::Upstream(_))));
    assert_eq!(world.blobs.put_attempts(), 5);
    assert!(world.documents.find_all(DocumentFilter::default(), &admin).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_audit_write_rolls_back_everything() {
    let world = World::standard();
    let admin = world.user("Admin", UserRole::Admin).await;
    let fund = world.fund("GTF-001", vec![], &admin).await;
    let doc = world.upload(&fund, "q1.pdf", b"%PDF", &admin).await.unwrap();

    world.db.fail_audit_writes(true);
    assert!(world.upload(&fund, "q2.pdf", b"%PDF", &admin).await.is_err());
    assert!(matches!(
        world.documents.update_status(&doc.id, DocStatus::InReview, None, &admin).await,
        Err(DomainError::Database(_))
    ));
    world.db.fail_audit_writes(false);

    let all = world.documents.find_all(DocumentFilter::default(), &admin).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].document.status, DocStatus::Pending);
    // Only the first upload's blob remains
    assert_eq!(world.blobs.len(), 1);
}

#[tokio::test]
async fn strict_workflow_only_moves_forward() {
    let world = World::new(LifecyclePolicy {
        upload_retry_delay: Duration::from_millis(1),
        enforce_forward_transitions: true,
        ..Default::default()
    });
    let admin = world.user("Admin", UserRole::Admin).await;
    let fund = world.fund("GTF-001", vec![], &admin).await;
    let doc = world.upload(&fund, "q1.pdf", b"%PDF", &admin).await.unwrap();

    world.documents.update_status(&doc.id, DocStatus::Approved, None, &admin).await.unwrap();
    for target in [DocStatus::Pending, DocStatus::InReview, DocStatus::Rejected, DocStatus::Approved] {
        assert!(matches!(
            world.documents.update_status(&doc.id, target, None, &admin).await,
            Err(DomainError::Conflict(_))
        ));
    }
    world.documents.update_status(&doc.id, DocStatus::Archived, None, &admin).await.unwrap();
}

#[tokio::test]
async fn registration_waits_for_approval_before_login() {
    let db = Arc::new(MemoryDatabase::new());
    let auth = AuthService::new(db.clone(), JwtService::new("lifecycle-secret".into(), 3600));
    let users = UserService::new(db.clone());

    let registered = auth
        .register(NewRegistration {
            name: "Pending Person".into(),
            email: "pending@funds.com".into(),
            password: "password123".into(),
        })
        .await
        .unwrap();
    assert_eq!(registered.status, UserStatus::Pending);
    assert!(matches!(
        auth.login("pending@funds.com", "password123").await,
        Err(DomainError::Unauthenticated(_))
    ));

    let mut officer = User::new("Officer".into(), "officer@auditvault.com".into(), "x".into(), UserRole::ComplianceOfficer).unwrap();
    officer.status = UserStatus::Active;
    let officer = UserRepository::create(db.as_ref(), &officer).await.unwrap().to_auth_user();
    users.update_status(&registered.id, UserStatus::Active, &officer).await.unwrap();

    let login = auth.login("pending@funds.com", "password123").await.unwrap();
    let me = auth.authenticate(&login.access_token).await.unwrap();
    assert_eq!(me.id, registered.id);
    assert_eq!(me.role, UserRole::Auditor);
}
