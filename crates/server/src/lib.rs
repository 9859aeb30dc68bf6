//! Shop Chat Server - Chat backend for the storefront widget.
//!
//! # Architecture
//!
//! - Axum web framework with SSE responses for chat turns
//! - Claude API for model streaming
//! - Storefront tool endpoint (JSON-RPC) for catalog and customer tools
//! - `PostgreSQL` (or an in-process store) for conversations and customer tokens
//!
//! # Modules
//!
//! - [`claude`] - Claude API client and streamed message assembly
//! - [`mcp`] - Storefront tool client
//! - [`services`] - Turn loop, tool result routing, product normalization
//! - [`db`] - Conversation store
//! - [`routes`] - HTTP handlers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod claude;
pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod routes;
pub mod services;
pub mod state;
