// ============================================================================
// Vault Infrastructure - In-Memory Tables
// File: crates/vault-infrastructure/src/database/memory/tables.rs
// ============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use vault_core::domain::{
    AuditActor, AuditHistoryEntry, AuditLogEntry, ChatMessage, ChatSession, ChatSessionSummary,
    DocStatus, Document, DocumentQuery, DocumentSummary, Fund, FundRef, NewAuditEntry, User,
    UserStatus,
};
use vault_core::error::DomainError;
use vault_core::repositories::{
    AuditRepository, ChatRepository, DocumentRepository, FundRepository, UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    funds: HashMap<Uuid, Fund>,
    documents: HashMap<Uuid, Document>,
    /// Insertion order doubles as the tie breaker for equal timestamps.
    audit_logs: Vec<AuditLogEntry>,
    chat_sessions: HashMap<Uuid, ChatSession>,
    chat_messages: Vec<ChatMessage>,
}

impl Tables {
    fn insert_audit(&mut self, entry: &NewAuditEntry) -> AuditLogEntry {
        let stored = entry.clone().into_entry(Utc::now());
        self.audit_logs.push(stored.clone());
        stored
    }
}

#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
    fail_audit_writes: AtomicBool,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every audited write fail with a database error until reset.
    pub fn fail_audit_writes(&self, fail: bool) {
        self.fail_audit_writes.store(fail, Ordering::SeqCst);
    }

    /// Audit entries for `document_id` regardless of actor, insertion order.
    pub fn raw_audit_entries(&self, document_id: &Uuid) -> Vec<AuditLogEntry> {
        self.tables
            .lock()
            .audit_logs
            .iter()
            .filter(|e| e.document_id == *document_id)
            .cloned()
            .collect()
    }

    fn check_audit_writable(&self) -> Result<(), DomainError> {
        if self.fail_audit_writes.load(Ordering::SeqCst) {
            return Err(DomainError::Database("audit_logs unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryDatabase {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.tables.lock().users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let email = email.to_lowercase();
        Ok(self
            .tables
            .lock()
            .users
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn list(&self, status: Option<UserStatus>) -> Result<Vec<User>, DomainError> {
        let mut users: Vec<User> = self
            .tables
            .lock()
            .users
            .values()
            .filter(|u| status.map_or(true, |s| u.status == s))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn create(&self, user: &User) -> Result<User, DomainError> {
        let mut tables = self.tables.lock();
        let email = user.email.to_lowercase();
        if tables.users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(DomainError::Conflict("creating user: duplicate value".into()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn update_status(&self, id: &Uuid, status: UserStatus) -> Result<Option<User>, DomainError> {
        let mut tables = self.tables.lock();
        Ok(tables.users.get_mut(id).map(|user| {
            user.status = status;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

#[async_trait]
impl FundRepository for MemoryDatabase {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Fund>, DomainError> {
        Ok(self.tables.lock().funds.get(id).cloned())
    }

    async fn list(&self, managed_by: Option<Uuid>) -> Result<Vec<Fund>, DomainError> {
        let mut funds: Vec<Fund> = self
            .tables
            .lock()
            .funds
            .values()
            .filter(|f| managed_by.map_or(true, |user| f.is_managed_by(&user)))
            .cloned()
            .collect();
        funds.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(funds)
    }

    async fn create(&self, fund: &Fund) -> Result<Fund, DomainError> {
        let mut tables = self.tables.lock();
        if tables.funds.values().any(|f| f.code == fund.code) {
            return Err(DomainError::Conflict("creating fund: duplicate value".into()));
        }
        tables.funds.insert(fund.id, fund.clone());
        Ok(fund.clone())
    }

    async fn update(&self, fund: &Fund) -> Result<Fund, DomainError> {
        let mut tables = self.tables.lock();
        if tables.funds.values().any(|f| f.code == fund.code && f.id != fund.id) {
            return Err(DomainError::Conflict("updating fund: duplicate value".into()));
        }
        match tables.funds.get_mut(&fund.id) {
            Some(existing) => {
                *existing = fund.clone();
                Ok(fund.clone())
            }
            None => Err(DomainError::not_found("Fund", fund.id)),
        }
    }

    async fn managed_fund_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, DomainError> {
        Ok(self
            .tables
            .lock()
            .funds
            .values()
            .filter(|f| f.is_managed_by(user_id))
            .map(|f| f.id)
            .collect())
    }
}

#[async_trait]
impl DocumentRepository for MemoryDatabase {
    async fn create_with_audit(
        &self,
        document: &Document,
        audit: &NewAuditEntry,
    ) -> Result<Document, DomainError> {
        let mut tables = self.tables.lock();
        if !tables.funds.contains_key(&document.fund_id) {
            return Err(DomainError::Validation(
                "creating document: referenced record does not exist".into(),
            ));
        }
        self.check_audit_writable()?;

        tables.documents.insert(document.id, document.clone());
        tables.insert_audit(audit);
        debug!("Stored document {} in memory", document.id);
        Ok(document.clone())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Document>, DomainError> {
        Ok(self.tables.lock().documents.get(id).cloned())
    }

    async fn list(&self, query: &DocumentQuery) -> Result<Vec<DocumentSummary>, DomainError> {
        let tables = self.tables.lock();
        let filter = &query.filter;

        let mut rows: Vec<DocumentSummary> = tables
            .documents
            .values()
            .filter(|d| filter.fund_id.map_or(true, |id| d.fund_id == id))
            .filter(|d| filter.doc_type.map_or(true, |t| d.doc_type == t))
            .filter(|d| filter.status.map_or(true, |s| d.status == s))
            .filter(|d| query.fund_scope.as_ref().map_or(true, |scope| scope.contains(&d.fund_id)))
            .filter_map(|d| {
                let fund = tables.funds.get(&d.fund_id)?;
                Some(DocumentSummary {
                    document: d.clone(),
                    fund: FundRef { name: fund.name.clone(), code: fund.code.clone() },
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.document
                .created_at
                .cmp(&a.document.created_at)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });

        if let Some(page) = filter.pagination {
            rows = rows
                .into_iter()
                .skip(page.offset() as usize)
                .take(page.limit() as usize)
                .collect();
        }
        Ok(rows)
    }

    async fn update_status_with_audit(
        &self,
        id: &Uuid,
        from: DocStatus,
        to: DocStatus,
        audit: &NewAuditEntry,
    ) -> Result<Option<Document>, DomainError> {
        let mut tables = self.tables.lock();
        match tables.documents.get(id) {
            Some(doc) if doc.status == from => {}
            _ => return Ok(None),
        }
        self.check_audit_writable()?;

        let updated = match tables.documents.get_mut(id) {
            Some(doc) => {
                doc.status = to;
                doc.updated_at = Utc::now();
                doc.clone()
            }
            None => return Ok(None),
        };
        tables.insert_audit(audit);
        Ok(Some(updated))
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError> {
        let mut tables = self.tables.lock();
        if tables.documents.remove(id).is_none() {
            return Ok(false);
        }
        tables.audit_logs.retain(|e| e.document_id != *id);
        Ok(true)
    }
}

#[async_trait]
impl AuditRepository for MemoryDatabase {
    async fn append(&self, entry: &NewAuditEntry) -> Result<AuditLogEntry, DomainError> {
        self.check_audit_writable()?;
        let mut tables = self.tables.lock();
        if !tables.documents.contains_key(&entry.document_id) {
            return Err(DomainError::Validation(
                "appending audit entry: referenced record does not exist".into(),
            ));
        }
        Ok(tables.insert_audit(entry))
    }

    async fn history(&self, document_id: &Uuid) -> Result<Vec<AuditHistoryEntry>, DomainError> {
        let tables = self.tables.lock();
        let mut entries: Vec<AuditHistoryEntry> = tables
            .audit_logs
            .iter()
            .rev()
            .filter(|e| e.document_id == *document_id)
            .filter_map(|e| {
                let user = tables.users.get(&e.user_id)?;
                Some(AuditHistoryEntry {
                    entry: e.clone(),
                    user: AuditActor { name: user.name.clone(), role: user.role },
                })
            })
            .collect();
        // Stable: equal timestamps keep newest-inserted first
        entries.sort_by(|a, b| b.entry.timestamp.cmp(&a.entry.timestamp));
        Ok(entries)
    }
}

#[async_trait]
impl ChatRepository for MemoryDatabase {
    async fn list_sessions(&self, user_id: &Uuid) -> Result<Vec<ChatSessionSummary>, DomainError> {
        let tables = self.tables.lock();
        let mut sessions: Vec<ChatSessionSummary> = tables
            .chat_sessions
            .values()
            .filter(|s| s.user_id == *user_id)
            .map(|s| ChatSessionSummary {
                session: s.clone(),
                message_count: tables.chat_messages.iter().filter(|m| m.session_id == s.id).count() as i64,
            })
            .collect();
        sessions.sort_by(|a, b| b.session.updated_at.cmp(&a.session.updated_at));
        Ok(sessions)
    }

    async fn create_session(&self, session: &ChatSession) -> Result<ChatSession, DomainError> {
        self.tables.lock().chat_sessions.insert(session.id, session.clone());
        Ok(session.clone())
    }

    async fn find_session(&self, id: &Uuid) -> Result<Option<ChatSession>, DomainError> {
        Ok(self.tables.lock().chat_sessions.get(id).cloned())
    }

    async fn messages(&self, session_id: &Uuid) -> Result<Vec<ChatMessage>, DomainError> {
        Ok(self
            .tables
            .lock()
            .chat_messages
            .iter()
            .filter(|m| m.session_id == *session_id)
            .cloned()
            .collect())
    }

    async fn rename_session(&self, id: &Uuid, title: &str) -> Result<Option<ChatSession>, DomainError> {
        let mut tables = self.tables.lock();
        Ok(tables.chat_sessions.get_mut(id).map(|s| {
            s.title = title.to_string();
            s.updated_at = Utc::now();
            s.clone()
        }))
    }

    async fn delete_session(&self, id: &Uuid) -> Result<bool, DomainError> {
        let mut tables = self.tables.lock();
        if tables.chat_sessions.remove(id).is_none() {
            return Ok(false);
        }
        tables.chat_messages.retain(|m| m.session_id != *id);
        Ok(true)
    }

    async fn append_messages(&self, session_id: &Uuid, messages: &[ChatMessage]) -> Result<(), DomainError> {
        let mut tables = self.tables.lock();
        match tables.chat_sessions.get_mut(session_id) {
            Some(session) => session.updated_at = Utc::now(),
            None => return Err(DomainError::not_found("Chat session", session_id)),
        }
        tables.chat_messages.extend(messages.iter().cloned());
        Ok(())
    }
}
