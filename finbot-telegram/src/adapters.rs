//! Adapters from Telegram (teloxide) types to finbot_core types.
//! Depends only on teloxide and finbot_core type definitions.

use finbot_core::{Chat, Event, EventKind, User};

/// Wraps a teloxide User for conversion to core [`User`].
pub struct TelegramUserWrapper<'a>(pub &'a teloxide::types::User);

impl<'a> TelegramUserWrapper<'a> {
    pub fn to_core(&self) -> User {
        User {
            id: self.0.id.0 as i64,
            username: self.0.username.clone(),
            first_name: Some(self.0.first_name.clone()),
            last_name: self.0.last_name.clone(),
        }
    }
}

fn core_chat(chat: &teloxide::types::Chat) -> Chat {
    let chat_type = if chat.is_private() {
        "private"
    } else if chat.is_supergroup() {
        "supergroup"
    } else if chat.is_group() {
        "group"
    } else if chat.is_channel() {
        "channel"
    } else {
        "unknown"
    };
    Chat {
        id: chat.id.0,
        chat_type: chat_type.to_string(),
    }
}

/// Extracts the command name from `/name`, `/name@botname` or `/name args`.
/// Returns `None` for text that is not a command.
pub fn parse_command(text: &str) -> Option<String> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or_default();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Wraps a teloxide Message for conversion to a core [`Event`] (command or text).
pub struct TelegramMessageWrapper<'a>(pub &'a teloxide::types::Message);

impl<'a> TelegramMessageWrapper<'a> {
    /// `None` for messages without a sender or without text (stickers, photos, service messages).
    pub fn to_event(&self) -> Option<Event> {
        let from = self.0.from.as_ref()?;
        let text = self.0.text()?;
        let message_id = self.0.id.to_string();
        let kind = match parse_command(text) {
            Some(name) => EventKind::Command { message_id, name },
            None => EventKind::Text {
                message_id,
                text: text.to_string(),
            },
        };
        Some(Event {
            user: TelegramUserWrapper(from).to_core(),
            chat: core_chat(&self.0.chat),
            kind,
            created_at: chrono::Utc::now(),
        })
    }
}

/// Wraps a teloxide CallbackQuery for conversion to a core callback [`Event`].
pub struct TelegramCallbackWrapper<'a>(pub &'a teloxide::types::CallbackQuery);

impl<'a> TelegramCallbackWrapper<'a> {
    /// Presses on inline-mode messages carry no chat; they are attributed to the user's private chat.
    /// A missing payload becomes an empty one, so the press is still acknowledged downstream.
    pub fn to_event(&self) -> Event {
        let query = self.0;
        let user = TelegramUserWrapper(&query.from).to_core();
        let chat = match query.message.as_ref() {
            Some(message) => core_chat(message.chat()),
            None => Chat {
                id: user.id,
                chat_type: "private".to_string(),
            },
        };
        Event {
            user,
            chat,
            kind: EventKind::Callback {
                callback_id: query.id.0.clone(),
                message_id: query.message.as_ref().map(|m| m.id().to_string()),
                data: query.data.clone().unwrap_or_default(),
            },
            created_at: chrono::Utc::now(),
        }
    }
}
