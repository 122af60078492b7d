//! Shared fixtures: a recording [`MockBot`], event builders and a [`Harness`] wiring an
//! engine to an in-memory catalog and a fixed clock.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use dialogue::{
    DialogueEngine, FixedClock, FlowOptions, HandlebarsRenderer, Services, Session, SessionKey,
    Status,
};
use finbot_core::{Bot, Chat, Event, EventKind, FinbotError, Keyboard, Result, User};
use storage::{Catalog, CatalogEntry, InMemoryCatalog, Ledger, StorageError};
use tokio::sync::{mpsc, Notify};

pub const USER_ID: i64 = 123;
pub const CHAT_ID: i64 = 456;

/// One call made on the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Message {
        message_id: String,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Edit {
        message_id: String,
        text: String,
        keyboard: Option<Keyboard>,
    },
    ClearKeyboard {
        message_id: String,
    },
    Ack {
        callback_id: String,
    },
}

impl Sent {
    pub fn text(&self) -> Option<&str> {
        match self {
            Sent::Message { text, .. } | Sent::Edit { text, .. } => Some(text),
            Sent::ClearKeyboard { .. } | Sent::Ack { .. } => None,
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Sent::Message { keyboard, .. } | Sent::Edit { keyboard, .. } => keyboard.as_ref(),
            Sent::ClearKeyboard { .. } | Sent::Ack { .. } => None,
        }
    }
}

/// Mock Bot that records every call. `send_message` hands out increasing ids starting at 100.
pub struct MockBot {
    calls: Mutex<Vec<Sent>>,
    next_id: AtomicU64,
    failing_edits: AtomicUsize,
    tx: Option<mpsc::UnboundedSender<Sent>>,
}

impl MockBot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(100),
            failing_edits: AtomicUsize::new(0),
            tx: None,
        })
    }

    /// Creates a MockBot and returns a receiver that also gets every recorded call.
    pub fn with_receiver() -> (Arc<Self>, mpsc::UnboundedReceiver<Sent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bot = Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(100),
            failing_edits: AtomicUsize::new(0),
            tx: Some(tx),
        });
        (bot, rx)
    }

    /// The next `n` edits fail without being recorded, like a Telegram timeout.
    pub fn fail_next_edits(&self, n: usize) {
        self.failing_edits.store(n, Ordering::SeqCst);
    }

    fn record(&self, call: Sent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(call.clone());
        }
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Sent> {
        self.calls.lock().unwrap().clone()
    }

    /// Last send or edit (acks and keyboard removals skipped).
    pub fn last_render(&self) -> Option<Sent> {
        self.calls()
            .into_iter()
            .rev()
            .find(|c| matches!(c, Sent::Message { .. } | Sent::Edit { .. }))
    }

    pub fn last_text(&self) -> String {
        self.last_render()
            .and_then(|c| c.text().map(str::to_string))
            .unwrap_or_default()
    }

    pub fn last_keyboard(&self) -> Option<Keyboard> {
        self.last_render().and_then(|c| c.keyboard().cloned())
    }

    pub fn count(&self, pred: impl Fn(&Sent) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn sends(&self) -> usize {
        self.count(|c| matches!(c, Sent::Message { .. }))
    }

    pub fn acks(&self) -> usize {
        self.count(|c| matches!(c, Sent::Ack { .. }))
    }
}

#[async_trait]
impl Bot for MockBot {
    async fn send_message(
        &self,
        _chat: &Chat,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<String> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.record(Sent::Message {
            message_id: message_id.clone(),
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        _chat: &Chat,
        message_id: &str,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let failing = self
            .failing_edits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(FinbotError::Bot("edit timed out".to_string()));
        }
        self.record(Sent::Edit {
            message_id: message_id.to_string(),
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn remove_keyboard(&self, _chat: &Chat, message_id: &str) -> Result<()> {
        self.record(Sent::ClearKeyboard {
            message_id: message_id.to_string(),
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.record(Sent::Ack {
            callback_id: callback_id.to_string(),
        });
        Ok(())
    }
}

/// Catalog that blocks `list_groups` until released, for racing a step against cancel.
pub struct GatedCatalog {
    inner: InMemoryCatalog,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedCatalog {
    pub fn new(inner: InMemoryCatalog) -> Arc<Self> {
        Arc::new(Self {
            inner,
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl Catalog for GatedCatalog {
    async fn list_groups(&self) -> std::result::Result<Vec<CatalogEntry>, StorageError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.list_groups().await
    }

    async fn list_types(&self, group_id: i64) -> std::result::Result<Vec<CatalogEntry>, StorageError> {
        self.inner.list_types(group_id).await
    }
}

/// Catalog that fails every lookup while `failing` is set.
pub struct FlakyCatalog {
    inner: InMemoryCatalog,
    pub failing: AtomicBool,
}

impl FlakyCatalog {
    pub fn new(inner: InMemoryCatalog) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> std::result::Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Database("catalog unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Catalog for FlakyCatalog {
    async fn list_groups(&self) -> std::result::Result<Vec<CatalogEntry>, StorageError> {
        self.check()?;
        self.inner.list_groups().await
    }

    async fn list_types(&self, group_id: i64) -> std::result::Result<Vec<CatalogEntry>, StorageError> {
        self.check()?;
        self.inner.list_types(group_id).await
    }
}

pub fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_group(1, "Home")
        .with_group(2, "Food & Drink")
        .with_type(1, 3, "Rent")
        .with_type(1, 4, "Utilities")
        .with_type(2, 5, "Groceries")
}

fn event(kind: EventKind) -> Event {
    Event {
        user: User {
            id: USER_ID,
            username: Some("alice".to_string()),
            first_name: Some("Alice".to_string()),
            last_name: None,
        },
        chat: Chat {
            id: CHAT_ID,
            chat_type: "private".to_string(),
        },
        kind,
        created_at: Utc::now(),
    }
}

pub fn command(name: &str) -> Event {
    event(EventKind::Command {
        message_id: "1".to_string(),
        name: name.to_string(),
    })
}

pub fn text(text: &str) -> Event {
    event(EventKind::Text {
        message_id: "2".to_string(),
        text: text.to_string(),
    })
}

pub fn callback(data: &str, message_id: &str) -> Event {
    event(EventKind::Callback {
        callback_id: format!("cb-{}", data),
        message_id: Some(message_id.to_string()),
        data: data.to_string(),
    })
}

pub fn key() -> SessionKey {
    SessionKey::new(CHAT_ID, USER_ID)
}

/// 2024-05-01 10:00 UTC.
pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    ))
}

pub fn services(
    bot: Arc<MockBot>,
    catalog: Arc<dyn Catalog>,
    ledger: Option<Arc<dyn Ledger>>,
    clock: Arc<FixedClock>,
) -> Services {
    Services {
        bot,
        renderer: Arc::new(HandlebarsRenderer::new().unwrap()),
        catalog,
        ledger,
        clock,
    }
}

pub struct Harness {
    pub engine: DialogueEngine,
    pub bot: Arc<MockBot>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(Arc::new(catalog()), None, FlowOptions::default())
    }

    pub fn build(
        catalog: Arc<dyn Catalog>,
        ledger: Option<Arc<dyn Ledger>>,
        options: FlowOptions,
    ) -> Self {
        let bot = MockBot::new();
        let clock = fixed_clock();
        let services = services(bot.clone(), catalog, ledger, clock.clone());
        Self {
            engine: DialogueEngine::new(services, options),
            bot,
            clock,
        }
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.engine = self.engine.with_idle_timeout(Some(timeout));
        self
    }

    pub async fn send(&self, event: Event) -> Status {
        self.engine.handle(&event).await.expect("handle failed")
    }

    /// Presses a button on the current prompt message.
    pub async fn press(&self, data: &str) -> Status {
        let message_id = self
            .session()
            .and_then(|s| s.prompt)
            .map(|p| p.message_id)
            .unwrap_or_else(|| "100".to_string());
        self.send(callback(data, &message_id)).await
    }

    /// Presses the button labelled `label` on the last rendered keyboard.
    pub async fn tap(&self, label: &str) -> Status {
        let keyboard = self.bot.last_keyboard().expect("no keyboard on screen");
        let payload = keyboard
            .payload_of(label)
            .unwrap_or_else(|| panic!("no button {:?}", label))
            .to_string();
        self.press(&payload).await
    }

    pub fn session(&self) -> Option<Session> {
        self.engine.session(&key())
    }

    pub fn field_values(&self) -> Vec<String> {
        self.session()
            .map(|s| s.fields.iter().map(|f| f.value.clone()).collect())
            .unwrap_or_default()
    }
}
