//! Transition table: for each state, an ordered list of routes. The first route whose
//! matcher accepts the intent runs; nothing matching means the event is ignored.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use finbot_core::{Event, Keyboard, MessageRef, Result};
use tracing::debug;

use crate::engine::Services;
use crate::intent::Intent;
use crate::render::{RenderContext, Template};
use crate::session::Session;
use crate::state::State;
use crate::subdialogue::SubDialogueEntry;

/// What a step asks the engine to do with the session after it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Keep the current state.
    Stay,
    To(State),
    /// Switch to `state` and feed `intent` through its routes, as if it had just arrived.
    Resume { state: State, intent: Intent },
    /// Terminal: the session is discarded.
    End,
}

/// Everything one step sees. The session is a working copy owned by the engine.
pub struct StepContext<'a> {
    pub session: &'a mut Session,
    pub event: &'a Event,
    pub intent: &'a Intent,
    pub services: &'a Services,
}

impl StepContext<'_> {
    /// Message to edit: the one carrying the pressed button, else the remembered prompt.
    pub fn target(&self) -> Option<MessageRef> {
        self.event
            .callback_message()
            .or_else(|| self.session.prompt.clone())
    }

    /// Renders `template` and puts it on screen, editing [`target`](Self::target) when there is
    /// one and sending a new message otherwise. The shown message becomes the session's prompt.
    pub async fn show(
        &mut self,
        template: Template,
        context: &RenderContext,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let text = self.services.renderer.render(template, context)?;
        let event = self.event;
        let chat = &event.chat;
        let shown = match self.target() {
            Some(target) => {
                self.services
                    .bot
                    .edit_message(chat, &target.message_id, &text, keyboard)
                    .await?;
                target
            }
            None => {
                let message_id = self.services.bot.send_message(chat, &text, keyboard).await?;
                MessageRef {
                    chat_id: chat.id,
                    message_id,
                }
            }
        };
        debug!(
            user_id = event.user.id,
            template = template.name(),
            message_id = %shown.message_id,
            "Prompt shown"
        );
        self.session.prompt = Some(shown);
        Ok(())
    }
}

#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn handle(&self, ctx: &mut StepContext<'_>) -> Result<Transition>;
}

pub type Matcher = Arc<dyn Fn(&Intent) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Route {
    pub name: &'static str,
    pub matcher: Matcher,
    pub handler: Arc<dyn StepHandler>,
}

impl Route {
    pub fn new(
        name: &'static str,
        matcher: impl Fn(&Intent) -> bool + Send + Sync + 'static,
        handler: Arc<dyn StepHandler>,
    ) -> Self {
        Self {
            name,
            matcher: Arc::new(matcher),
            handler,
        }
    }

    pub fn matches(&self, intent: &Intent) -> bool {
        (self.matcher)(intent)
    }
}

#[derive(Clone, Default)]
pub struct TransitionTable {
    rows: HashMap<State, Vec<Route>>,
    /// Tried in every state after the state's own row.
    fallbacks: Vec<Route>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(
        mut self,
        state: State,
        name: &'static str,
        matcher: impl Fn(&Intent) -> bool + Send + Sync + 'static,
        handler: Arc<dyn StepHandler>,
    ) -> Self {
        self.rows
            .entry(state)
            .or_default()
            .push(Route::new(name, matcher, handler));
        self
    }

    pub fn fallback(
        mut self,
        name: &'static str,
        matcher: impl Fn(&Intent) -> bool + Send + Sync + 'static,
        handler: Arc<dyn StepHandler>,
    ) -> Self {
        self.fallbacks.push(Route::new(name, matcher, handler));
        self
    }

    /// Hooks a sub-dialogue into `host`: its trigger joins the host's row, and its control
    /// and end rows are added under their own states.
    pub fn install(mut self, host: State, entry: SubDialogueEntry) -> Self {
        self.rows.entry(host).or_default().push(entry.trigger);
        self.rows
            .entry(entry.control_state)
            .or_default()
            .extend(entry.control);
        self.rows
            .entry(entry.end_state)
            .or_default()
            .extend(entry.end);
        self
    }

    pub fn resolve(&self, state: State, intent: &Intent) -> Option<&Route> {
        self.rows
            .get(&state)
            .into_iter()
            .flatten()
            .chain(self.fallbacks.iter())
            .find(|route| route.matches(intent))
    }

    /// Route names registered for `state`, in match order (fallbacks excluded).
    pub fn route_names(&self, state: State) -> Vec<&'static str> {
        self.rows
            .get(&state)
            .map(|routes| routes.iter().map(|r| r.name).collect())
            .unwrap_or_default()
    }
}
