//! Core types for Shop Chat.
//!
//! This module provides the wire and data types shared by the server and the widget.

pub mod api;
pub mod event;
pub mod id;
pub mod message;
pub mod product;

pub use api::*;
pub use event::StreamEvent;
pub use id::*;
pub use message::*;
pub use product::*;
