//! Conversation browsing for store staff.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use shop_chat_core::{ConversationId, StoredMessage};

use crate::db::{ConversationSummary, MessageStore};
use crate::error::AppError;
use crate::state::AppState;

const CONVERSATIONS_PER_PAGE: i64 = 20;

const fn default_page() -> i64 {
    1
}

/// Query parameters for the conversation list.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: i64,
}

/// One page of conversations.
#[derive(Debug, Serialize)]
pub struct ConversationPage {
    /// Conversations on this page, most recent first.
    pub conversations: Vec<ConversationSummary>,
    /// Total number of conversations.
    pub total: i64,
    /// Current page.
    pub page: i64,
    /// Number of pages (at least 1).
    pub total_pages: i64,
}

/// A conversation with its messages.
#[derive(Debug, Serialize)]
pub struct ConversationDetail {
    /// Summary fields.
    #[serde(flatten)]
    pub summary: ConversationSummary,
    /// Stored messages in order.
    pub messages: Vec<StoredMessage>,
}

/// GET /conversations?page=
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ConversationPage>, AppError> {
    let page = params.page.max(1);
    let total = state.store().count_conversations().await?;
    let total_pages = total_pages(total);
    let offset = (page - 1).saturating_mul(CONVERSATIONS_PER_PAGE);

    let conversations = state
        .store()
        .list_conversations(CONVERSATIONS_PER_PAGE, offset)
        .await?;

    Ok(Json(ConversationPage {
        conversations,
        total,
        page,
        total_pages,
    }))
}

/// GET /conversations/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationDetail>, AppError> {
    let conversation_id = ConversationId::new(id);
    let summary = state
        .store()
        .get_conversation(&conversation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("conversation {conversation_id}")))?;
    let messages = state.store().get_history(&conversation_id).await?;

    Ok(Json(ConversationDetail { summary, messages }))
}

const fn total_pages(total: i64) -> i64 {
    let pages = (total + CONVERSATIONS_PER_PAGE - 1) / CONVERSATIONS_PER_PAGE;
    if pages < 1 { 1 } else { pages }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0), 1);
        assert_eq!(total_pages(20), 1);
        assert_eq!(total_pages(21), 2);
    }
}
