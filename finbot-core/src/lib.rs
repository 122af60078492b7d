//! # finbot-core
//!
//! Core types and traits for the finance bot: [`Bot`] (transport), [`Event`] (inbound update),
//! [`Keyboard`] (inline buttons), error types, and tracing initialization.
//! Transport-agnostic; used by `dialogue` and `finbot-telegram`.

pub mod bot;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::{parse_message_id, Bot};
pub use error::{FinbotError, PayloadError, Result};
pub use logger::init_tracing;
pub use types::{Button, Chat, Event, EventKind, Keyboard, MessageRef, User};
