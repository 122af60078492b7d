//! Per-user session: collected fields, current state, and the store that owns them.
//!
//! Handlers never hold a reference into the store. The engine clones a session out,
//! lets one handler mutate the copy, and writes it back with [`SessionStore::commit`],
//! which refuses the write if the session was destroyed or restarted meanwhile.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use finbot_core::{Event, FinbotError, MessageRef, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::State;

/// Identity of one conversation: a user inside a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub chat_id: i64,
    pub user_id: i64,
}

impl SessionKey {
    pub fn new(chat_id: i64, user_id: i64) -> Self {
        Self { chat_id, user_id }
    }

    pub fn from_event(event: &Event) -> Self {
        Self::new(event.chat.id, event.user.id)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chat_id, self.user_id)
    }
}

/// The action chosen on the first prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
        }
    }

    /// Button label on the action prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Create => "Create",
        }
    }
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            _ => Err(()),
        }
    }
}

/// Which value a field holds. Serialized in kebab-case (`budget-group`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKey {
    Date,
    BudgetGroup,
    BudgetType,
    Description,
    Amount,
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Date => "date",
            FieldKey::BudgetGroup => "budget-group",
            FieldKey::BudgetType => "budget-type",
            FieldKey::Description => "description",
            FieldKey::Amount => "amount",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldKey::Date => "Date",
            FieldKey::BudgetGroup => "Budget Group",
            FieldKey::BudgetType => "Budget Type",
            FieldKey::Description => "Description",
            FieldKey::Amount => "Amount",
        }
    }
}

/// One collected entry of the running summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: FieldKey,
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Field {
    pub fn new(key: FieldKey, value: impl Into<String>) -> Self {
        Self {
            key,
            label: key.label().to_string(),
            value: value.into(),
            id: None,
        }
    }

    pub fn with_id(key: FieldKey, id: i64, value: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            ..Self::new(key, value)
        }
    }
}

/// Parent state to return to and message to edit while a sub-dialogue is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeAnchor {
    pub state: State,
    pub message: MessageRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: SessionKey,
    pub state: State,
    /// Running summary; insertion order is display order.
    pub fields: Vec<Field>,
    pub command: Option<Action>,
    pub anchor: Option<ResumeAnchor>,
    /// Prompt message that later steps edit in place.
    pub prompt: Option<MessageRef>,
    /// Internal state of the active sub-dialogue. Only the sub-dialogue reads or writes it.
    pub scratch: Option<serde_json::Value>,
    pub confirmed: Option<bool>,
    pub last_active: DateTime<Utc>,
    generation: u64,
}

impl Session {
    pub fn new(key: SessionKey, generation: u64, now: DateTime<Utc>) -> Self {
        Self {
            key,
            state: State::InputAction,
            fields: Vec::new(),
            command: None,
            anchor: None,
            prompt: None,
            scratch: None,
            confirmed: None,
            last_active: now,
            generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Appends a field. Each key may be collected once per session.
    pub fn push_field(&mut self, field: Field) -> Result<()> {
        if self.field(field.key).is_some() {
            return Err(FinbotError::State(format!(
                "field {} already collected",
                field.key.as_str()
            )));
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn field(&self, key: FieldKey) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn keys(&self) -> Vec<FieldKey> {
        self.fields.iter().map(|f| f.key).collect()
    }

    pub fn is_idle(&self, now: DateTime<Utc>, max_idle: Duration) -> bool {
        now - self.last_active > max_idle
    }
}

/// Sessions keyed by [`SessionKey`]. Each `start` hands out a new generation number.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionKey, Session>,
    generations: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Snapshot of the session, if any.
    pub fn get(&self, key: &SessionKey) -> Option<Session> {
        self.sessions.get(key).map(|s| s.value().clone())
    }

    /// Snapshot of the existing session, or a fresh one in `InputAction` stored under `key`.
    pub fn get_or_create(&self, key: SessionKey, now: DateTime<Utc>) -> Session {
        self.sessions
            .entry(key)
            .or_insert_with(|| Session::new(key, self.next_generation(), now))
            .value()
            .clone()
    }

    /// Replaces whatever is stored under `key` with a fresh session.
    pub fn start(&self, key: SessionKey, now: DateTime<Utc>) -> Session {
        let session = Session::new(key, self.next_generation(), now);
        self.sessions.insert(key, session.clone());
        session
    }

    /// Writes a working copy back. Returns false (and drops the copy) when the stored
    /// session is gone or belongs to a newer generation.
    pub fn commit(&self, session: Session) -> bool {
        match self.sessions.get_mut(&session.key) {
            Some(mut slot) if slot.generation == session.generation => {
                *slot = session;
                true
            }
            _ => false,
        }
    }

    /// Removes the session only if it is still the given generation.
    pub fn end(&self, key: &SessionKey, generation: u64) -> bool {
        self.sessions
            .remove_if(key, |_, s| s.generation == generation)
            .is_some()
    }

    pub fn destroy(&self, key: &SessionKey) -> Option<Session> {
        self.sessions.remove(key).map(|(_, s)| s)
    }

    /// Removes sessions idle for longer than `max_idle`; returns how many were removed.
    pub fn purge_idle(&self, now: DateTime<Utc>, max_idle: Duration) -> usize {
        let expired: Vec<SessionKey> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_idle(now, max_idle))
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        for key in &expired {
            if self
                .sessions
                .remove_if(key, |_, s| s.is_idle(now, max_idle))
                .is_some()
            {
                info!(session = %key, "Idle session expired");
                removed += 1;
            }
        }
        removed
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
