//! HTTP route handlers for the chat server.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (store reachable)
//!
//! # Chat
//! POST /chat                   - Send message (returns SSE stream)
//! GET  /chat?history=true      - Stored messages of a conversation
//!
//! # Customer authorization
//! GET  /auth/token-status      - Whether the conversation has a customer token
//!
//! # Conversations
//! GET  /conversations          - List conversations (paginated)
//! GET  /conversations/{id}     - Conversation with messages
//! ```

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod auth;
pub mod chat;
pub mod conversations;
pub mod health;

/// Build the router with every route.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Chat
        .route("/chat", post(chat::send_message).get(chat::history))
        // Customer authorization
        .route("/auth/token-status", get(auth::token_status))
        // Conversations
        .route("/conversations", get(conversations::list))
        .route("/conversations/{id}", get(conversations::show))
}
