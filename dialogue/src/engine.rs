//! Dialogue engine: owns the transition table and the session store, and runs one event
//! at a time against a session.
//!
//! Every step works on a clone of the stored session. The clone is committed only if the
//! step succeeds and the stored session is still the same generation, so a failed step
//! leaves the session where it was and a step racing a cancel cannot resurrect it.

use std::sync::Arc;

use chrono::Duration;
use finbot_core::{Bot, Event, FinbotError, Result};
use storage::{Catalog, Ledger};
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::intent::Intent;
use crate::render::Renderer;
use crate::session::{Session, SessionKey, SessionStore};
use crate::state::{State, Status};
use crate::steps::{
    CancelStep, ChooseAmount, ChooseDate, ChooseGroup, ChooseType, ConfirmStep,
    EnterDescription, SelectAction, Welcome,
};
use crate::subdialogue::{self, AmountKeypad, DatePicker, Wiring};
use crate::table::{StepContext, StepHandler, Transition, TransitionTable};

/// A resumed sub-dialogue result may trigger at most this many chained routes.
const MAX_RESUME_HOPS: usize = 4;

/// Collaborators every step can reach.
#[derive(Clone)]
pub struct Services {
    pub bot: Arc<dyn Bot>,
    pub renderer: Arc<dyn Renderer>,
    pub catalog: Arc<dyn Catalog>,
    pub ledger: Option<Arc<dyn Ledger>>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Default)]
pub struct FlowOptions {
    /// Extra one-tap amounts on the amount prompt, next to "Custom Amount".
    pub quick_amounts: Vec<String>,
}

/// Routes of the finance wizard, with the date picker hooked into `InputDate` and the
/// keypad into `InputAmount`.
pub fn finance_table(options: &FlowOptions) -> TransitionTable {
    let cancel: Arc<dyn StepHandler> = Arc::new(CancelStep);

    let calendar = subdialogue::create(
        DatePicker,
        Wiring {
            trigger: |i| matches!(i, Intent::OpenCalendar),
            control_state: State::CalendarControl,
            end_state: State::CalendarEndControl,
            after_conv_state: State::InputDate,
            cancel: cancel.clone(),
            resume: Intent::DateChosen,
            params: "date",
        },
    );
    let numpad = subdialogue::create(
        AmountKeypad::default(),
        Wiring {
            trigger: |i| matches!(i, Intent::OpenNumpad),
            control_state: State::NumpadControl,
            end_state: State::NumpadEndControl,
            after_conv_state: State::InputAmount,
            cancel: cancel.clone(),
            resume: Intent::AmountChosen,
            params: "amount",
        },
    );

    TransitionTable::new()
        .on(
            State::InputAction,
            "select_action",
            |i| matches!(i, Intent::ActionSelected(_)),
            Arc::new(SelectAction),
        )
        .on(
            State::InputDate,
            "date",
            |i| matches!(i, Intent::DateChosen(_)),
            Arc::new(ChooseDate),
        )
        .install(State::InputDate, calendar)
        .on(
            State::InputBudgetGroup,
            "budget_group",
            |i| matches!(i, Intent::GroupChosen(_)),
            Arc::new(ChooseGroup),
        )
        .on(
            State::InputBudgetType,
            "budget_type",
            |i| matches!(i, Intent::TypeChosen(_)),
            Arc::new(ChooseType),
        )
        .on(
            State::InputDescription,
            "description",
            |i| matches!(i, Intent::Text(_)),
            Arc::new(EnterDescription {
                quick_amounts: options.quick_amounts.clone(),
            }),
        )
        .on(
            State::InputAmount,
            "amount",
            |i| matches!(i, Intent::AmountChosen(_)),
            Arc::new(ChooseAmount),
        )
        .install(State::InputAmount, numpad)
        .on(
            State::InputConfirmation,
            "confirm",
            |i| matches!(i, Intent::Confirm(_)),
            Arc::new(ConfirmStep),
        )
        .fallback("cancel", |i| matches!(i, Intent::Cancel), cancel)
}

pub struct DialogueEngine {
    services: Services,
    table: TransitionTable,
    welcome: Arc<dyn StepHandler>,
    sessions: Arc<SessionStore>,
    idle_timeout: Option<Duration>,
}

impl DialogueEngine {
    pub fn new(services: Services, options: FlowOptions) -> Self {
        Self::with_table(services, finance_table(&options))
    }

    pub fn with_table(services: Services, table: TransitionTable) -> Self {
        Self {
            services,
            table,
            welcome: Arc::new(Welcome),
            sessions: Arc::new(SessionStore::new()),
            idle_timeout: None,
        }
    }

    /// Sessions idle longer than `timeout` are treated as absent. `None` disables expiry.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn session(&self, key: &SessionKey) -> Option<Session> {
        self.sessions.get(key)
    }

    pub fn status(&self, key: &SessionKey) -> Status {
        match self.sessions.get(key) {
            Some(session) => Status::Active(session.state),
            None => Status::Idle,
        }
    }

    fn expired(&self, session: &Session) -> bool {
        self.idle_timeout
            .map(|timeout| session.is_idle(self.services.clock.now(), timeout))
            .unwrap_or(false)
    }

    /// Drops sessions past the idle timeout. Returns how many were removed.
    pub fn purge_idle(&self) -> usize {
        match self.idle_timeout {
            Some(timeout) => self.sessions.purge_idle(self.services.clock.now(), timeout),
            None => 0,
        }
    }

    /// **Entry point.** Translates the event, runs it, and acknowledges callbacks whatever
    /// the outcome. Malformed payloads and unknown commands are logged and ignored.
    #[instrument(skip(self, event), fields(user_id = event.user.id, chat_id = event.chat.id, kind = event.kind_name()))]
    pub async fn handle(&self, event: &Event) -> Result<Status> {
        let key = SessionKey::from_event(event);
        let result = match Intent::from_event(event) {
            Ok(Some(Intent::Start)) => self.start(event).await,
            Ok(Some(Intent::Cancel)) => self.cancel(event).await,
            Ok(Some(intent)) => self.dispatch(event, intent).await,
            Ok(None) => {
                debug!(user_id = event.user.id, "Unknown command ignored");
                Ok(self.status(&key))
            }
            Err(e) => {
                warn!(user_id = event.user.id, error = %e, "Malformed payload ignored");
                Ok(self.status(&key))
            }
        };

        if let Some(callback_id) = event.callback_id() {
            if let Err(e) = self.services.bot.answer_callback(callback_id).await {
                warn!(user_id = event.user.id, error = %e, "Failed to answer callback");
            }
        }
        result
    }

    /// Starts a session and shows the action prompt. Ignored while a live session exists.
    pub async fn start(&self, event: &Event) -> Result<Status> {
        let key = SessionKey::from_event(event);
        if let Some(existing) = self.sessions.get(&key) {
            if !self.expired(&existing) {
                debug!(user_id = event.user.id, state = %existing.state, "Entry ignored, session active");
                return Ok(Status::Active(existing.state));
            }
        }

        let mut session = self.sessions.start(key, self.services.clock.now());
        let generation = session.generation();
        let intent = Intent::Start;
        let mut ctx = StepContext {
            session: &mut session,
            event,
            intent: &intent,
            services: &self.services,
        };
        if let Err(e) = self.welcome.handle(&mut ctx).await {
            self.sessions.end(&key, generation);
            return Err(e);
        }

        info!(user_id = event.user.id, chat_id = event.chat.id, "step: session started");
        Ok(self.commit(session))
    }

    /// Cancels from any state: the session is removed first, then the cancel route of the
    /// state it was in says goodbye. Without a session nothing happens.
    pub async fn cancel(&self, event: &Event) -> Result<Status> {
        let key = SessionKey::from_event(event);
        let Some(mut session) = self.sessions.destroy(&key) else {
            debug!(user_id = event.user.id, "Cancel without session ignored");
            return Ok(Status::Idle);
        };
        info!(user_id = event.user.id, state = %session.state, "step: session cancelled");

        let intent = Intent::Cancel;
        if let Some(route) = self.table.resolve(session.state, &intent) {
            let mut ctx = StepContext {
                session: &mut session,
                event,
                intent: &intent,
                services: &self.services,
            };
            route.handler.handle(&mut ctx).await?;
        }
        Ok(Status::Ended)
    }

    /// Runs `intent` against the current session. Unmatched intents leave it untouched.
    pub async fn dispatch(&self, event: &Event, intent: Intent) -> Result<Status> {
        let key = SessionKey::from_event(event);
        let Some(stored) = self.sessions.get(&key) else {
            debug!(user_id = event.user.id, "No session, event ignored");
            return Ok(Status::Idle);
        };
        if self.expired(&stored) {
            self.sessions.end(&key, stored.generation());
            info!(user_id = event.user.id, state = %stored.state, "Idle session expired");
            return Ok(Status::Idle);
        }

        let mut working = stored;
        working.last_active = self.services.clock.now();
        let mut intent = intent;

        for hop in 0..=MAX_RESUME_HOPS {
            let state = working.state;
            let Some(route) = self.table.resolve(state, &intent) else {
                if hop > 0 {
                    return Err(FinbotError::State(format!(
                        "no route in {} for resumed {:?}",
                        state, intent
                    )));
                }
                debug!(user_id = event.user.id, state = %state, intent = ?intent, "Unmatched event ignored");
                return Ok(Status::Active(state));
            };
            info!(user_id = event.user.id, state = %state, route = route.name, "step: route matched");

            let transition = {
                let mut ctx = StepContext {
                    session: &mut working,
                    event,
                    intent: &intent,
                    services: &self.services,
                };
                route.handler.handle(&mut ctx).await?
            };

            match transition {
                Transition::Stay => return Ok(self.commit(working)),
                Transition::To(next) => {
                    debug!(user_id = event.user.id, from = %state, to = %next, "Transition");
                    working.state = next;
                    return Ok(self.commit(working));
                }
                Transition::Resume {
                    state: resume_state,
                    intent: resumed,
                } => {
                    debug!(user_id = event.user.id, from = %state, to = %resume_state, "Resume");
                    working.state = resume_state;
                    intent = resumed;
                }
                Transition::End => {
                    if self.sessions.end(&key, working.generation()) {
                        info!(user_id = event.user.id, "step: session ended");
                        return Ok(Status::Ended);
                    }
                    return Ok(self.status(&key));
                }
            }
        }

        Err(FinbotError::State(format!(
            "resume chain longer than {} hops",
            MAX_RESUME_HOPS
        )))
    }

    fn commit(&self, session: Session) -> Status {
        let key = session.key;
        let state = session.state;
        if self.sessions.commit(session) {
            Status::Active(state)
        } else {
            info!(session = %key, "Session changed meanwhile, step result discarded");
            self.status(&key)
        }
    }
}
