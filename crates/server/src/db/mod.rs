//! Conversation persistence.
//!
//! # Tables
//!
//! - `conversation` - One row per conversation, created on first append
//! - `message` - Append-only message log (content is plain text or JSON-encoded blocks)
//! - `customer_token` - Customer account tokens written by the authorization callback
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p shop-chat-cli -- migrate
//! ```
//!
//! Without a database URL the server keeps conversations in a [`MemoryStore`].

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use shop_chat_core::{ChatRole, ConversationId, StoredMessage, TokenStatus};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Listing entry for a stored conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    /// Conversation ID.
    pub id: ConversationId,
    /// Number of stored messages.
    pub message_count: i64,
    /// When the first message was appended.
    pub created_at: DateTime<Utc>,
    /// When the last message was appended.
    pub updated_at: DateTime<Utc>,
}

/// A customer account token bound to a conversation.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct CustomerToken {
    /// Bearer token for customer-scoped tools.
    pub access_token: SecretString,
    /// Expiry, if the issuer supplied one.
    pub expires_at: Option<DateTime<Utc>>,
}

impl CustomerToken {
    /// Whether the token is still usable at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires| expires > now)
    }
}

impl std::fmt::Debug for CustomerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Persistence contract used by the chat routes and the turn loop.
pub trait MessageStore: Send + Sync {
    /// Append a message, creating the conversation on first use.
    fn append_message(
        &self,
        conversation_id: &ConversationId,
        role: ChatRole,
        content: &str,
    ) -> impl Future<Output = Result<StoredMessage, RepositoryError>> + Send;

    /// All messages of a conversation in append order (empty if unknown).
    fn get_history(
        &self,
        conversation_id: &ConversationId,
    ) -> impl Future<Output = Result<Vec<StoredMessage>, RepositoryError>> + Send;

    /// Summary of one conversation.
    fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> impl Future<Output = Result<Option<ConversationSummary>, RepositoryError>> + Send;

    /// Conversations ordered by most recent activity.
    fn list_conversations(
        &self,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<ConversationSummary>, RepositoryError>> + Send;

    /// Total number of conversations.
    fn count_conversations(&self) -> impl Future<Output = Result<i64, RepositoryError>> + Send;

    /// Customer token for a conversation, if one was stored.
    fn customer_token(
        &self,
        conversation_id: &ConversationId,
    ) -> impl Future<Output = Result<Option<CustomerToken>, RepositoryError>> + Send;

    /// Insert or replace the customer token for a conversation.
    fn store_customer_token(
        &self,
        conversation_id: &ConversationId,
        token: &CustomerToken,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Check that the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Authorization status derived from the stored customer token.
    fn token_status(
        &self,
        conversation_id: &ConversationId,
    ) -> impl Future<Output = Result<TokenStatus, RepositoryError>> + Send {
        async move {
            let token = self.customer_token(conversation_id).await?;
            Ok(match token {
                Some(token) if token.is_valid_at(Utc::now()) => TokenStatus::Authorized,
                _ => TokenStatus::Pending,
            })
        }
    }

    /// Unexpired customer token for a conversation.
    fn active_customer_token(
        &self,
        conversation_id: &ConversationId,
    ) -> impl Future<Output = Result<Option<SecretString>, RepositoryError>> + Send {
        async move {
            let token = self.customer_token(conversation_id).await?;
            Ok(token
                .filter(|t| t.is_valid_at(Utc::now()))
                .map(|t| t.access_token))
        }
    }
}

/// Store selected at startup.
#[derive(Clone)]
pub enum Store {
    /// `PostgreSQL`-backed store.
    Postgres(PgStore),
    /// Process-local store.
    Memory(MemoryStore),
}

impl Store {
    /// Short backend name for logs.
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

impl MessageStore for Store {
    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        role: ChatRole,
        content: &str,
    ) -> Result<StoredMessage, RepositoryError> {
        match self {
            Self::Postgres(s) => s.append_message(conversation_id, role, content).await,
            Self::Memory(s) => s.append_message(conversation_id, role, content).await,
        }
    }

    async fn get_history(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        match self {
            Self::Postgres(s) => s.get_history(conversation_id).await,
            Self::Memory(s) => s.get_history(conversation_id).await,
        }
    }

    async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationSummary>, RepositoryError> {
        match self {
            Self::Postgres(s) => s.get_conversation(conversation_id).await,
            Self::Memory(s) => s.get_conversation(conversation_id).await,
        }
    }

    async fn list_conversations(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        match self {
            Self::Postgres(s) => s.list_conversations(limit, offset).await,
            Self::Memory(s) => s.list_conversations(limit, offset).await,
        }
    }

    async fn count_conversations(&self) -> Result<i64, RepositoryError> {
        match self {
            Self::Postgres(s) => s.count_conversations().await,
            Self::Memory(s) => s.count_conversations().await,
        }
    }

    async fn customer_token(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<CustomerToken>, RepositoryError> {
        match self {
            Self::Postgres(s) => s.customer_token(conversation_id).await,
            Self::Memory(s) => s.customer_token(conversation_id).await,
        }
    }

    async fn store_customer_token(
        &self,
        conversation_id: &ConversationId,
        token: &CustomerToken,
    ) -> Result<(), RepositoryError> {
        match self {
            Self::Postgres(s) => s.store_customer_token(conversation_id, token).await,
            Self::Memory(s) => s.store_customer_token(conversation_id, token).await,
        }
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        match self {
            Self::Postgres(s) => s.ping().await,
            Self::Memory(s) => s.ping().await,
        }
    }
}
