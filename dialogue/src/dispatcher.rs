//! Per-session serialization: events of one (chat, user) are queued and handled one at a
//! time by a dedicated task; different sessions proceed concurrently. Cancel skips the
//! queue so it takes effect even while a slow step is in flight.
//!
//! A queue task removes its own map entry once its session is gone and nothing is queued.
//! Enqueueing and removal both happen under the map entry lock, so a key never has two
//! consumers at once.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use finbot_core::{Event, EventKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::engine::DialogueEngine;
use crate::intent::CANCEL_COMMAND;
use crate::session::SessionKey;

type QueueSender = mpsc::UnboundedSender<Event>;
type QueueMap = Arc<DashMap<SessionKey, QueueSender>>;

/// How long a queue task waits for an event before checking whether it can close.
pub const QUEUE_IDLE: Duration = Duration::from_secs(60);

enum QueueNext {
    Event(Event),
    Wait,
    Closed,
}

pub struct Dispatcher {
    engine: Arc<DialogueEngine>,
    queues: QueueMap,
    queue_idle: Duration,
}

impl Dispatcher {
    pub fn new(engine: Arc<DialogueEngine>) -> Self {
        Self {
            engine,
            queues: Arc::new(DashMap::new()),
            queue_idle: QUEUE_IDLE,
        }
    }

    pub fn with_queue_idle(mut self, idle: Duration) -> Self {
        self.queue_idle = idle;
        self
    }

    pub fn engine(&self) -> &Arc<DialogueEngine> {
        &self.engine
    }

    /// Number of live per-session queues.
    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// **Entry point.** Hands an event to its session's queue and returns without waiting
    /// for it to be processed. Cancel is handled right away.
    pub async fn submit(&self, event: Event) {
        if is_cancel(&event) {
            info!(user_id = event.user.id, "Cancel bypasses queue");
            if let Err(e) = self.engine.handle(&event).await {
                error!(error = %e, user_id = event.user.id, "Failed to cancel session");
            }
            return;
        }

        let key = SessionKey::from_event(&event);
        let mut entry = self
            .queues
            .entry(key)
            .or_insert_with(|| self.spawn_queue(key));

        if let Err(mpsc::error::SendError(event)) = entry.send(event) {
            error!(user_id = event.user.id, "Queue receiver dropped, respawning");
            *entry = self.spawn_queue(key);
            if entry.send(event).is_err() {
                error!(session = %key, "Failed to send event to new queue");
            }
        }
    }

    fn spawn_queue(&self, key: SessionKey) -> QueueSender {
        let (tx, rx) = mpsc::unbounded_channel::<Event>();
        tokio::spawn(Self::process_queue_loop(
            rx,
            tx.clone(),
            self.engine.clone(),
            self.queues.clone(),
            key,
            self.queue_idle,
        ));
        tx
    }

    async fn process_queue_loop(
        mut rx: mpsc::UnboundedReceiver<Event>,
        own: QueueSender,
        engine: Arc<DialogueEngine>,
        queues: QueueMap,
        key: SessionKey,
        idle: Duration,
    ) {
        let mut pending = None;
        loop {
            let event = match pending.take() {
                Some(event) => event,
                None => match tokio::time::timeout(idle, rx.recv()).await {
                    Ok(Some(event)) => event,
                    Ok(None) => break,
                    Err(_) => match Self::close_if_done(&queues, &engine, key, &own, &mut rx) {
                        QueueNext::Event(event) => event,
                        QueueNext::Wait => continue,
                        QueueNext::Closed => break,
                    },
                },
            };

            debug!(session = %key, kind = event.kind_name(), "Processing queued event");
            if let Err(e) = engine.handle(&event).await {
                error!(error = %e, session = %key, "Failed to process queued event");
            }

            match Self::close_if_done(&queues, &engine, key, &own, &mut rx) {
                QueueNext::Event(event) => pending = Some(event),
                QueueNext::Wait => {}
                QueueNext::Closed => break,
            }
        }
        debug!(session = %key, "Queue closed");
    }

    /// Under the entry lock: takes the next queued event if any, else removes the entry when
    /// the session is gone.
    fn close_if_done(
        queues: &DashMap<SessionKey, QueueSender>,
        engine: &DialogueEngine,
        key: SessionKey,
        own: &QueueSender,
        rx: &mut mpsc::UnboundedReceiver<Event>,
    ) -> QueueNext {
        let Entry::Occupied(entry) = queues.entry(key) else {
            return QueueNext::Closed;
        };
        if !entry.get().same_channel(own) {
            return QueueNext::Closed;
        }
        if let Ok(event) = rx.try_recv() {
            return QueueNext::Event(event);
        }
        if engine.sessions().contains(&key) {
            return QueueNext::Wait;
        }
        entry.remove();
        QueueNext::Closed
    }
}

fn is_cancel(event: &Event) -> bool {
    matches!(&event.kind, EventKind::Command { name, .. } if name == CANCEL_COMMAND)
}
