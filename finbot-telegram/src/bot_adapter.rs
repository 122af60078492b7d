//! Wraps teloxide::Bot and implements [`finbot_core::Bot`]. Production code sends messages via Telegram; tests can substitute another Bot impl.

use async_trait::async_trait;
use finbot_core::{parse_message_id, Bot as CoreBot, Chat, FinbotError, Keyboard, Result};
use teloxide::{
    prelude::*,
    types::{
        CallbackQueryId, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode,
    },
    ApiError, RequestError,
};
use tracing::debug;

/// Thin wrapper around teloxide::Bot that implements finbot-core's Bot trait.
/// All text is sent with HTML parse mode.
pub struct TelegramBotAdapter {
    bot: teloxide::Bot,
}

impl TelegramBotAdapter {
    /// Creates an adapter from an existing teloxide Bot.
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }

    /// Returns the underlying teloxide::Bot for direct API use when needed.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }
}

/// Maps a core [`Keyboard`] to Telegram inline markup, row by row.
pub fn inline_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.payload.clone()))
            .collect::<Vec<_>>()
    }))
}

fn bot_error(e: RequestError) -> FinbotError {
    FinbotError::Bot(e.to_string())
}

#[async_trait]
impl CoreBot for TelegramBotAdapter {
    async fn send_message(
        &self,
        chat: &Chat,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<String> {
        let mut request = self
            .bot
            .send_message(ChatId(chat.id), text.to_string())
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(inline_markup(keyboard));
        }
        let sent = request.await.map_err(bot_error)?;
        Ok(sent.id.to_string())
    }

    async fn edit_message(
        &self,
        chat: &Chat,
        message_id: &str,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let id = parse_message_id(message_id)?;
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat.id), MessageId(id), text.to_string())
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(inline_markup(keyboard));
        }
        match request.await {
            Ok(_) => Ok(()),
            // Re-rendering an unchanged prompt (e.g. calendar "ignore" cells) is not an error.
            Err(RequestError::Api(ApiError::MessageNotModified)) => {
                debug!(chat_id = chat.id, message_id = %message_id, "Message not modified");
                Ok(())
            }
            Err(e) => Err(bot_error(e)),
        }
    }

    async fn remove_keyboard(&self, chat: &Chat, message_id: &str) -> Result<()> {
        let id = parse_message_id(message_id)?;
        match self
            .bot
            .edit_message_reply_markup(ChatId(chat.id), MessageId(id))
            .await
        {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(bot_error(e)),
        }
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()))
            .await
            .map_err(bot_error)?;
        Ok(())
    }
}
