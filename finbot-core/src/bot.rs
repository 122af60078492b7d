//! Bot abstraction for sending and editing prompt messages.
//!
//! [`Bot`] is transport-agnostic; the Telegram implementation lives in `finbot-telegram`.

use crate::error::{FinbotError, Result};
use crate::types::{Chat, Keyboard};
use async_trait::async_trait;

/// Sends, edits and acknowledges. Implementations map to a transport (e.g. Telegram).
/// Text is HTML.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Sends a message with an optional inline keyboard and returns its transport-specific id.
    async fn send_message(
        &self,
        chat: &Chat,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<String>;

    /// Edits an already-sent message in place. `None` removes any keyboard.
    async fn edit_message(
        &self,
        chat: &Chat,
        message_id: &str,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()>;

    /// Strips the inline keyboard from a sent message, leaving its text.
    async fn remove_keyboard(&self, chat: &Chat, message_id: &str) -> Result<()>;

    /// Acknowledges a button press so the client stops showing a spinner.
    async fn answer_callback(&self, callback_id: &str) -> Result<()>;
}

/// Parses a message id string into an i32. Used by Telegram edits.
pub fn parse_message_id(s: &str) -> Result<i32> {
    s.parse()
        .map_err(|_| FinbotError::Bot(format!("Invalid message_id for edit: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_id_valid() {
        assert_eq!(parse_message_id("123").unwrap(), 123);
        assert_eq!(parse_message_id("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_message_id_invalid() {
        assert!(parse_message_id("").is_err());
        assert!(parse_message_id("abc").is_err());
        assert!(parse_message_id("12.3").is_err());
    }
}
