//! Core types: user, chat, inbound events, and inline keyboards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User identity (id, username, names).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Chat (channel or private) identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub chat_type: String,
}

/// Chat plus message id: enough to edit an already-sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: String,
}

/// One inbound update from the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub user: User,
    pub chat: Chat,
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
}

/// What the user did: sent a command, pressed a button, or typed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// `/name` without the slash and without any `@botname` suffix or arguments.
    Command { message_id: String, name: String },
    /// Inline button press. `data` is the opaque payload attached to the button.
    Callback {
        callback_id: String,
        message_id: Option<String>,
        data: String,
    },
    /// Plain text message.
    Text { message_id: String, text: String },
}

impl Event {
    /// Message that carried the pressed button, if this is a callback on an accessible message.
    pub fn callback_message(&self) -> Option<MessageRef> {
        match &self.kind {
            EventKind::Callback {
                message_id: Some(id),
                ..
            } => Some(MessageRef {
                chat_id: self.chat.id,
                message_id: id.clone(),
            }),
            _ => None,
        }
    }

    pub fn callback_id(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Callback { callback_id, .. } => Some(callback_id),
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EventKind::Command { .. } => "command",
            EventKind::Callback { .. } => "callback",
            EventKind::Text { .. } => "text",
        }
    }
}

/// A single inline button: visible label plus the payload sent back on press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Inline keyboard, row by row. Transport-agnostic; adapters map it to their own markup type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row and returns the keyboard (builder style).
    pub fn row(mut self, row: Vec<Button>) -> Self {
        self.rows.push(row);
        self
    }

    /// One button per row.
    pub fn column(buttons: impl IntoIterator<Item = Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.is_empty())
    }

    /// All buttons in display order.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    /// Finds the payload of the first button with the given label.
    pub fn payload_of(&self, label: &str) -> Option<&str> {
        self.buttons()
            .find(|b| b.label == label)
            .map(|b| b.payload.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind) -> Event {
        Event {
            user: User {
                id: 1,
                username: None,
                first_name: None,
                last_name: None,
            },
            chat: Chat {
                id: 10,
                chat_type: "private".to_string(),
            },
            kind,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_callback_message_only_for_callbacks() {
        let cb = event(EventKind::Callback {
            callback_id: "q1".to_string(),
            message_id: Some("55".to_string()),
            data: "confirm=yes".to_string(),
        });
        assert_eq!(
            cb.callback_message(),
            Some(MessageRef {
                chat_id: 10,
                message_id: "55".to_string()
            })
        );
        assert_eq!(cb.callback_id(), Some("q1"));

        let text = event(EventKind::Text {
            message_id: "56".to_string(),
            text: "hello".to_string(),
        });
        assert!(text.callback_message().is_none());
        assert!(text.callback_id().is_none());
        assert_eq!(text.kind_name(), "text");
    }

    #[test]
    fn test_keyboard_column_and_lookup() {
        let kb = Keyboard::column(vec![
            Button::new("Home", "budget-group=1;'Home'"),
            Button::new("Food", "budget-group=2;'Food'"),
        ]);
        assert_eq!(kb.rows.len(), 2);
        assert_eq!(kb.payload_of("Food"), Some("budget-group=2;'Food'"));
        assert!(kb.payload_of("Travel").is_none());
        assert!(Keyboard::new().is_empty());
    }
}
