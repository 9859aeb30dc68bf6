//! Shop Chat Core - Shared types library.
//!
//! This crate provides common types used across all Shop Chat components:
//! - `server` - Chat backend (model streaming, tool calls, persistence)
//! - `widget` - Client engine embedded in the storefront
//! - `cli` - Terminal client and management tools
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - IDs, messages, content blocks, stream events, product cards, API bodies

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
