//! Chat endpoint: streamed turns and stored history.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

use shop_chat_core::{ChatRequest, ConversationId, HistoryResponse};

use crate::db::MessageStore;
use crate::error::AppError;
use crate::services::{ChatTurnRequest, stream_chat_turn};
use crate::state::AppState;

/// Header carrying the storefront's shop ID.
pub const SHOP_ID_HEADER: &str = "x-shopify-shop-id";

/// Query parameters for `GET /chat`.
#[derive(Debug, Deserialize)]
pub struct HistoryQueryParams {
    /// Must be `true`; the endpoint only serves history.
    #[serde(default)]
    pub history: bool,
    /// Conversation to load.
    pub conversation_id: Option<ConversationId>,
}

/// Stream one chat turn via SSE.
///
/// POST /chat
///
/// Events are yielded as the model generates them; tool calls run between
/// model messages.
pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message is required".to_string()));
    }

    let shop_id = headers
        .get(SHOP_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    info!(
        shop_id,
        conversation_id = ?request.conversation_id,
        prompt_type = %request.prompt_type,
        "Chat request received"
    );

    // Customer-scoped tools authenticate with the conversation's token
    let customer_token = match &request.conversation_id {
        Some(id) => state
            .store()
            .active_customer_token(id)
            .await
            .unwrap_or_else(|e| {
                warn!(conversation_id = %id, error = %e, "Failed to load customer token");
                None
            }),
        None => None,
    };

    // Clone owned values for the streaming function (all use Arc internally)
    let claude = state.claude().clone();
    let mcp = state.mcp().with_customer_token(customer_token);
    let store = state.store().clone();
    let router = state.router().clone();

    let turn = ChatTurnRequest {
        message: request.message,
        conversation_id: request.conversation_id,
        prompt_type: request.prompt_type,
        shop_name: state.config().shop_name.clone(),
    };

    let event_stream = stream_chat_turn(claude, mcp, store, router, turn);

    // Map StreamEvent to SSE Event
    let sse_stream = event_stream.map(|event| {
        let json = serde_json::to_string(&event).unwrap_or_else(|_| {
            r#"{"type":"error","error":"Failed to serialize event"}"#.to_string()
        });
        Ok(Event::default().data(json))
    });

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

/// Stored messages of a conversation.
///
/// GET /chat?history=true&conversation_id=
pub async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQueryParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    if !params.history {
        return Err(AppError::BadRequest("Unsupported request".to_string()));
    }
    let conversation_id = params
        .conversation_id
        .ok_or_else(|| AppError::BadRequest("Missing conversation ID".to_string()))?;

    let messages = state.store().get_history(&conversation_id).await?;
    Ok(Json(HistoryResponse { messages }))
}
