//! Sub-dialogues: small modal state machines that borrow the session, collect one value
//! over several screens, and hand it back to a parent state.
//!
//! A component only describes screens and how its own intents change its scratch state.
//! [`create`] turns it into routes: a trigger for the host state, a control row and an end
//! row, each led by the cancel route. On completion the routes return
//! [`Transition::Resume`] so the value goes through the host's ordinary direct route.

pub mod calendar;
pub mod numpad;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use finbot_core::{FinbotError, Keyboard, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::intent::Intent;
use crate::render::{RenderContext, Template};
use crate::session::{ResumeAnchor, Session};
use crate::state::State;
use crate::table::{Route, StepContext, StepHandler, Transition};

pub use calendar::DatePicker;
pub use numpad::AmountKeypad;

/// One screen of a sub-dialogue: its keyboard plus an optional line under the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub keyboard: Keyboard,
    pub note: Option<String>,
}

/// Outcome of feeding one intent to a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubStep {
    /// Redraw, stay in the current sub-state.
    Stay(Screen),
    /// Move to the end (review) state.
    Review(Screen),
    /// Go back from the end state to the control state.
    Back(Screen),
    /// Finished with this value.
    Done(String),
    /// Nothing changed; no redraw.
    Ignore,
}

pub trait SubDialogue: Send + Sync + 'static {
    type Scratch: Serialize + DeserializeOwned + Send;

    fn name(&self) -> &'static str;

    fn open(&self, today: NaiveDate) -> (Self::Scratch, Screen);

    /// Intents owned by the control state.
    fn handles_control(&self, intent: &Intent) -> bool;

    /// Intents owned by the end state.
    fn handles_end(&self, intent: &Intent) -> bool;

    fn control(&self, scratch: &mut Self::Scratch, intent: &Intent) -> SubStep;

    fn finish(&self, scratch: &mut Self::Scratch, intent: &Intent) -> SubStep;
}

/// Where a sub-dialogue plugs into the parent flow.
#[derive(Clone)]
pub struct Wiring {
    pub trigger: fn(&Intent) -> bool,
    pub control_state: State,
    pub end_state: State,
    /// Parent state the result is delivered to.
    pub after_conv_state: State,
    pub cancel: Arc<dyn StepHandler>,
    /// Wraps the result into the intent the parent's direct route expects.
    pub resume: fn(String) -> Intent,
    /// Field name shown while the sub-dialogue is on screen.
    pub params: &'static str,
}

/// Routes produced by [`create`], merged into a table by `TransitionTable::install`.
pub struct SubDialogueEntry {
    pub trigger: Route,
    pub control_state: State,
    pub end_state: State,
    pub control: Vec<Route>,
    pub end: Vec<Route>,
}

pub fn create<C: SubDialogue>(component: C, wiring: Wiring) -> SubDialogueEntry {
    let component = Arc::new(component);

    let open = Arc::new(OpenStep {
        component: component.clone(),
        control_state: wiring.control_state,
        after_conv_state: wiring.after_conv_state,
        params: wiring.params,
    });
    let control = Arc::new(ControlStep {
        component: component.clone(),
        phase: Phase::Control,
        wiring: wiring.clone(),
    });
    let end = Arc::new(ControlStep {
        component: component.clone(),
        phase: Phase::End,
        wiring: wiring.clone(),
    });

    let control_matcher = {
        let component = component.clone();
        move |intent: &Intent| component.handles_control(intent)
    };
    let end_matcher = move |intent: &Intent| component.handles_end(intent);

    SubDialogueEntry {
        trigger: Route::new(open.component.name(), wiring.trigger, open.clone()),
        control_state: wiring.control_state,
        end_state: wiring.end_state,
        control: vec![
            Route::new("cancel", is_cancel, wiring.cancel.clone()),
            Route::new("control", control_matcher, control),
        ],
        end: vec![
            Route::new("cancel", is_cancel, wiring.cancel),
            Route::new("end", end_matcher, end),
        ],
    }
}

fn is_cancel(intent: &Intent) -> bool {
    matches!(intent, Intent::Cancel)
}

fn load_scratch<T: DeserializeOwned>(session: &Session) -> Result<T> {
    let value = session
        .scratch
        .clone()
        .ok_or_else(|| FinbotError::State(format!("no sub-dialogue scratch in {}", session.state)))?;
    serde_json::from_value(value).map_err(|e| FinbotError::State(format!("bad scratch: {}", e)))
}

fn store_scratch<T: Serialize>(session: &mut Session, scratch: &T) -> Result<()> {
    let value =
        serde_json::to_value(scratch).map_err(|e| FinbotError::State(format!("bad scratch: {}", e)))?;
    session.scratch = Some(value);
    Ok(())
}

async fn draw(ctx: &mut StepContext<'_>, params: &str, screen: Screen) -> Result<()> {
    let template = Template::for_fields(&ctx.session.fields);
    let context = RenderContext::from_session(ctx.session)
        .params(params)
        .note(screen.note);
    ctx.show(template, &context, Some(&screen.keyboard)).await
}

struct OpenStep<C> {
    component: Arc<C>,
    control_state: State,
    after_conv_state: State,
    params: &'static str,
}

#[async_trait]
impl<C: SubDialogue> StepHandler for OpenStep<C> {
    async fn handle(&self, ctx: &mut StepContext<'_>) -> Result<Transition> {
        let message = ctx
            .target()
            .ok_or_else(|| FinbotError::State("sub-dialogue opened without a prompt".to_string()))?;
        let (scratch, screen) = self.component.open(ctx.services.clock.today());

        store_scratch(ctx.session, &scratch)?;
        ctx.session.anchor = Some(ResumeAnchor {
            state: self.after_conv_state,
            message,
        });
        info!(
            user_id = ctx.event.user.id,
            component = self.component.name(),
            "step: sub-dialogue opened"
        );

        draw(ctx, self.params, screen).await?;
        Ok(Transition::To(self.control_state))
    }
}

#[derive(Clone, Copy)]
enum Phase {
    Control,
    End,
}

struct ControlStep<C> {
    component: Arc<C>,
    phase: Phase,
    wiring: Wiring,
}

#[async_trait]
impl<C: SubDialogue> StepHandler for ControlStep<C> {
    async fn handle(&self, ctx: &mut StepContext<'_>) -> Result<Transition> {
        let mut scratch: C::Scratch = load_scratch(ctx.session)?;
        let step = match self.phase {
            Phase::Control => self.component.control(&mut scratch, ctx.intent),
            Phase::End => self.component.finish(&mut scratch, ctx.intent),
        };

        let (screen, transition) = match step {
            SubStep::Ignore => return Ok(Transition::Stay),
            SubStep::Done(value) => {
                ctx.session.scratch = None;
                let state = match ctx.session.anchor.take() {
                    Some(anchor) => {
                        ctx.session.prompt = Some(anchor.message);
                        anchor.state
                    }
                    None => self.wiring.after_conv_state,
                };
                info!(
                    user_id = ctx.event.user.id,
                    component = self.component.name(),
                    value = %value,
                    resume = %state,
                    "step: sub-dialogue finished"
                );
                return Ok(Transition::Resume {
                    state,
                    intent: (self.wiring.resume)(value),
                });
            }
            SubStep::Stay(screen) => (screen, Transition::Stay),
            SubStep::Review(screen) => (screen, Transition::To(self.wiring.end_state)),
            SubStep::Back(screen) => (screen, Transition::To(self.wiring.control_state)),
        };

        store_scratch(ctx.session, &scratch)?;
        draw(ctx, self.wiring.params, screen).await?;
        Ok(transition)
    }
}
