//! PostgreSQL chat session repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use vault_core::domain::{ChatMessage, ChatRole, ChatSession, ChatSessionSummary};
use vault_core::error::DomainError;
use vault_core::repositories::ChatRepository;

use super::{corrupt, db_error};

pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for ChatSession {
    fn from(row: SessionRow) -> Self {
        ChatSession {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SessionSummaryRow {
    #[sqlx(flatten)]
    session: SessionRow,
    message_count: i64,
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: Uuid,
    session_id: Uuid,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for ChatMessage {
    type Error = DomainError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(ChatMessage {
            id: row.id,
            session_id: row.session_id,
            role: ChatRole::from_str(&row.role).ok_or_else(|| corrupt("chat_messages.role", &row.role))?,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn list_sessions(&self, user_id: &Uuid) -> Result<Vec<ChatSessionSummary>, DomainError> {
        let rows: Vec<SessionSummaryRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.user_id, s.title, s.created_at, s.updated_at,
                   COUNT(m.id) AS message_count
            FROM chat_sessions s
            LEFT JOIN chat_messages m ON m.session_id = s.id
            WHERE s.user_id = $1
            GROUP BY s.id
            ORDER BY s.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing chat sessions"))?;

        Ok(rows
            .into_iter()
            .map(|row| ChatSessionSummary { session: row.session.into(), message_count: row.message_count })
            .collect())
    }

    async fn create_session(&self, session: &ChatSession) -> Result<ChatSession, DomainError> {
        let row: SessionRow = sqlx::query_as(
            r#"
            INSERT INTO chat_sessions (id, user_id, title, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, created_at, updated_at
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.title)
        .bind(session.created_at)
        .bind(session.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("creating chat session"))?;

        Ok(row.into())
    }

    async fn find_session(&self, id: &Uuid) -> Result<Option<ChatSession>, DomainError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, user_id, title, created_at, updated_at FROM chat_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("finding chat session"))?;

        Ok(row.map(Into::into))
    }

    async fn messages(&self, session_id: &Uuid) -> Result<Vec<ChatMessage>, DomainError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, session_id, role, content, created_at
            FROM chat_messages
            WHERE session_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("loading chat messages"))?;

        rows.into_iter().map(ChatMessage::try_from).collect()
    }

    async fn rename_session(&self, id: &Uuid, title: &str) -> Result<Option<ChatSession>, DomainError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            UPDATE chat_sessions
            SET title = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, title, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("renaming chat session"))?;

        Ok(row.map(Into::into))
    }

    async fn delete_session(&self, id: &Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("deleting chat session"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn append_messages(&self, session_id: &Uuid, messages: &[ChatMessage]) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("starting transaction"))?;

        for message in messages {
            sqlx::query(
                r#"
                INSERT INTO chat_messages (id, session_id, role, content, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(message.id)
            .bind(session_id)
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error("appending chat message"))?;
        }

        sqlx::query("UPDATE chat_sessions SET updated_at = NOW() WHERE id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("touching chat session"))?;

        tx.commit().await.map_err(db_error("committing chat messages"))
    }
}
