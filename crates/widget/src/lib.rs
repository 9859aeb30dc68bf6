//! Shop Chat Widget - Client engine for the storefront chat widget.
//!
//! The engine owns the conversation logic of the widget; drawing is left to a
//! [`Presenter`] and the network to a [`ChatBackend`].
//!
//! # Modules
//!
//! - [`stream`] - SSE decoding and the event coordinator
//! - [`auth`] - Customer authorization handoff and status polling
//! - [`flow`] - Scripted FAQ flow
//! - [`history`] - Restoring a conversation on open
//! - [`client`] - HTTP backend
//! - [`widget`] - [`ChatWidget`], tying it together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod history;
pub mod ports;
pub mod session;
pub mod stream;
pub mod widget;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use client::HttpBackend;
pub use config::{FlowTiming, PollPolicy, WidgetConfig};
pub use error::WidgetError;
pub use ports::{ByteStream, ChatBackend, Presenter};
pub use session::Session;
pub use widget::{ChatWidget, WidgetOptions};
