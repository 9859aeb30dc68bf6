//! `PostgreSQL` conversation store.
//!
//! Queries are checked at runtime (`sqlx::query_as::<_, Row>`) so the crate
//! builds without a live database or an offline query cache.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

use shop_chat_core::{ChatRole, ConversationId, StoredMessage};

use super::{ConversationSummary, CustomerToken, MessageStore, RepositoryError};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    role: ChatRole,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for StoredMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            role: row.role,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ConversationRow {
    id: ConversationId,
    message_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ConversationRow> for ConversationSummary {
    fn from(row: ConversationRow) -> Self {
        Self {
            id: row.id,
            message_count: row.message_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerTokenRow {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl From<CustomerTokenRow> for CustomerToken {
    fn from(row: CustomerTokenRow) -> Self {
        Self {
            access_token: SecretString::from(row.access_token),
            expires_at: row.expires_at,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// [`MessageStore`] backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl MessageStore for PgStore {
    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        role: ChatRole,
        content: &str,
    ) -> Result<StoredMessage, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO conversation (id)
            VALUES ($1)
            ON CONFLICT (id) DO UPDATE SET updated_at = NOW()
            ",
        )
        .bind(conversation_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, MessageRow>(
            r"
            INSERT INTO message (conversation_id, role, content)
            VALUES ($1, $2, $3)
            RETURNING role, content, created_at
            ",
        )
        .bind(conversation_id)
        .bind(role)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    async fn get_history(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r"
            SELECT role, content, created_at
            FROM message
            WHERE conversation_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationSummary>, RepositoryError> {
        let row = sqlx::query_as::<_, ConversationRow>(
            r"
            SELECT c.id, COUNT(m.id) AS message_count, c.created_at, c.updated_at
            FROM conversation c
            LEFT JOIN message m ON m.conversation_id = c.id
            WHERE c.id = $1
            GROUP BY c.id
            ",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_conversations(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, ConversationRow>(
            r"
            SELECT c.id, COUNT(m.id) AS message_count, c.created_at, c.updated_at
            FROM conversation c
            LEFT JOIN message m ON m.conversation_id = c.id
            GROUP BY c.id
            ORDER BY c.updated_at DESC, c.id ASC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_conversations(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversation")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn customer_token(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<CustomerToken>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerTokenRow>(
            r"
            SELECT access_token, expires_at
            FROM customer_token
            WHERE conversation_id = $1
            ",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn store_customer_token(
        &self,
        conversation_id: &ConversationId,
        token: &CustomerToken,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO customer_token (conversation_id, access_token, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (conversation_id) DO UPDATE
            SET access_token = EXCLUDED.access_token,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
            ",
        )
        .bind(conversation_id)
        .bind(token.access_token.expose_secret())
        .bind(token.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
