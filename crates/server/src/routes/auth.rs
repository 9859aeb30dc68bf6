//! Customer authorization status.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use shop_chat_core::{ConversationId, TokenStatusResponse};

use crate::db::MessageStore;
use crate::error::AppError;
use crate::state::AppState;

/// Query parameters for `GET /auth/token-status`.
#[derive(Debug, Deserialize)]
pub struct TokenStatusParams {
    /// Conversation being authorized.
    pub conversation_id: Option<ConversationId>,
}

/// Whether a customer token exists for the conversation.
///
/// GET /auth/token-status?conversation_id=
pub async fn token_status(
    State(state): State<AppState>,
    Query(params): Query<TokenStatusParams>,
) -> Result<Json<TokenStatusResponse>, AppError> {
    let conversation_id = params
        .conversation_id
        .ok_or_else(|| AppError::BadRequest("Missing conversation ID".to_string()))?;

    let status = state.store().token_status(&conversation_id).await?;
    Ok(Json(TokenStatusResponse { status }))
}
