//! Step handlers of the main finance flow, one per route.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use finbot_core::{Button, FinbotError, Keyboard, Result};
use storage::{CatalogEntry, StorageError, TransactionRecord};
use tracing::{info, warn};

use crate::intent::{Choice, Intent};
use crate::render::{RenderContext, Template};
use crate::session::{Action, Field, FieldKey, Session};
use crate::state::State;
use crate::table::{StepContext, StepHandler, Transition};

pub const FAREWELL: &str = "Bye! I hope we can talk again some day.";

fn payload(intent: Intent) -> String {
    intent.payload().unwrap_or_default()
}

fn choice_keyboard(entries: &[CatalogEntry], wrap: fn(Choice) -> Intent) -> Keyboard {
    Keyboard::column(entries.iter().map(|entry| {
        let choice = Choice::new(entry.id, entry.label.clone());
        Button::new(entry.label.clone(), payload(wrap(choice)))
    }))
}

/// Shows the prompt for the next field and moves to `next`.
async fn ask(
    ctx: &mut StepContext<'_>,
    params: &str,
    keyboard: Option<&Keyboard>,
    next: State,
) -> Result<Transition> {
    let template = Template::for_fields(&ctx.session.fields);
    let context = RenderContext::from_session(ctx.session).params(params);
    ctx.show(template, &context, keyboard).await?;
    Ok(Transition::To(next))
}

fn catalog_error(e: StorageError) -> FinbotError {
    FinbotError::Catalog(e.to_string())
}

/// Payload labels may be cut to fit the transport limit; the catalog holds the full one.
fn canonical_label(entries: &[CatalogEntry], choice: &Choice) -> String {
    entries
        .iter()
        .find(|entry| entry.id == choice.id)
        .map(|entry| entry.label.clone())
        .unwrap_or_else(|| choice.label.clone())
}

fn unexpected(ctx: &StepContext<'_>) -> FinbotError {
    FinbotError::State(format!(
        "unexpected intent {:?} in {}",
        ctx.intent, ctx.session.state
    ))
}

/// Entry: shows the action choices on a new message.
pub struct Welcome;

#[async_trait]
impl StepHandler for Welcome {
    async fn handle(&self, ctx: &mut StepContext<'_>) -> Result<Transition> {
        let action = Action::Create;
        let keyboard = Keyboard::new().row(vec![Button::new(
            action.label(),
            payload(Intent::ActionSelected(action)),
        )]);
        let context = RenderContext::from_session(ctx.session);
        ctx.show(Template::BaseInit, &context, Some(&keyboard)).await?;
        Ok(Transition::To(State::InputAction))
    }
}

pub struct SelectAction;

#[async_trait]
impl StepHandler for SelectAction {
    async fn handle(&self, ctx: &mut StepContext<'_>) -> Result<Transition> {
        let Intent::ActionSelected(action) = ctx.intent else {
            return Err(unexpected(ctx));
        };
        ctx.session.command = Some(*action);
        ctx.session.fields.clear();

        let today = ctx.services.clock.today().format("%Y-%m-%d").to_string();
        let keyboard = Keyboard::new()
            .row(vec![Button::new("Today", payload(Intent::DateChosen(today)))])
            .row(vec![Button::new("Choose Date", payload(Intent::OpenCalendar))]);
        ask(ctx, "date", Some(&keyboard), State::InputDate).await
    }
}

pub struct ChooseDate;

#[async_trait]
impl StepHandler for ChooseDate {
    async fn handle(&self, ctx: &mut StepContext<'_>) -> Result<Transition> {
        let Intent::DateChosen(date) = ctx.intent else {
            return Err(unexpected(ctx));
        };
        ctx.session.push_field(Field::new(FieldKey::Date, date.clone()))?;

        let groups = ctx
            .services
            .catalog
            .list_groups()
            .await
            .map_err(catalog_error)?;
        let keyboard = choice_keyboard(&groups, Intent::GroupChosen);
        ask(ctx, "budget group", Some(&keyboard), State::InputBudgetGroup).await
    }
}

pub struct ChooseGroup;

#[async_trait]
impl StepHandler for ChooseGroup {
    async fn handle(&self, ctx: &mut StepContext<'_>) -> Result<Transition> {
        let Intent::GroupChosen(group) = ctx.intent else {
            return Err(unexpected(ctx));
        };
        let catalog = &ctx.services.catalog;
        let groups = catalog.list_groups().await.map_err(catalog_error)?;
        let label = canonical_label(&groups, group);
        ctx.session
            .push_field(Field::with_id(FieldKey::BudgetGroup, group.id, label))?;

        let types = catalog.list_types(group.id).await.map_err(catalog_error)?;
        let keyboard = choice_keyboard(&types, Intent::TypeChosen);
        ask(ctx, "budget type", Some(&keyboard), State::InputBudgetType).await
    }
}

pub struct ChooseType;

#[async_trait]
impl StepHandler for ChooseType {
    async fn handle(&self, ctx: &mut StepContext<'_>) -> Result<Transition> {
        let Intent::TypeChosen(kind) = ctx.intent else {
            return Err(unexpected(ctx));
        };
        let group_id = ctx
            .session
            .field(FieldKey::BudgetGroup)
            .and_then(|f| f.id)
            .ok_or_else(|| FinbotError::State("budget type before budget group".to_string()))?;
        let types = ctx
            .services
            .catalog
            .list_types(group_id)
            .await
            .map_err(catalog_error)?;
        let label = canonical_label(&types, kind);
        ctx.session
            .push_field(Field::with_id(FieldKey::BudgetType, kind.id, label))?;
        ask(ctx, "description", None, State::InputDescription).await
    }
}

/// Free text. The event is a plain message, so the prompt edited is the remembered one.
pub struct EnterDescription {
    pub quick_amounts: Vec<String>,
}

#[async_trait]
impl StepHandler for EnterDescription {
    async fn handle(&self, ctx: &mut StepContext<'_>) -> Result<Transition> {
        let Intent::Text(text) = ctx.intent else {
            return Err(unexpected(ctx));
        };
        ctx.session
            .push_field(Field::new(FieldKey::Description, text.clone()))?;

        let mut keyboard =
            Keyboard::new().row(vec![Button::new("Custom Amount", payload(Intent::OpenNumpad))]);
        for chunk in self.quick_amounts.chunks(3) {
            keyboard = keyboard.row(
                chunk
                    .iter()
                    .map(|a| Button::new(a.clone(), payload(Intent::AmountChosen(a.clone()))))
                    .collect(),
            );
        }
        ask(ctx, "amount", Some(&keyboard), State::InputAmount).await
    }
}

pub struct ChooseAmount;

#[async_trait]
impl StepHandler for ChooseAmount {
    async fn handle(&self, ctx: &mut StepContext<'_>) -> Result<Transition> {
        let Intent::AmountChosen(amount) = ctx.intent else {
            return Err(unexpected(ctx));
        };
        ctx.session
            .push_field(Field::new(FieldKey::Amount, amount.clone()))?;

        let keyboard = Keyboard::new().row(vec![
            Button::new("Yes", payload(Intent::Confirm(true))),
            Button::new("No", payload(Intent::Confirm(false))),
        ]);
        let context = RenderContext::from_session(ctx.session);
        ctx.show(Template::BaseInputConfirmation, &context, Some(&keyboard))
            .await?;
        Ok(Transition::To(State::InputConfirmation))
    }
}

/// Final decision. `yes` is written to the ledger (when one is configured) before the
/// summary is shown. Once the row exists the session ends even if the summary cannot be
/// shown, so a retried `yes` never records twice.
pub struct ConfirmStep;

#[async_trait]
impl StepHandler for ConfirmStep {
    async fn handle(&self, ctx: &mut StepContext<'_>) -> Result<Transition> {
        let Intent::Confirm(yes) = ctx.intent else {
            return Err(unexpected(ctx));
        };
        ctx.session.confirmed = Some(*yes);

        let mut recorded = false;
        if *yes {
            if let Some(ledger) = &ctx.services.ledger {
                let record = transaction_record(ctx.session, ctx.services.clock.now())?;
                let id = ledger
                    .record(&record)
                    .await
                    .map_err(|e| FinbotError::Ledger(e.to_string()))?;
                info!(user_id = ctx.event.user.id, record_id = id, "step: transaction recorded");
                recorded = true;
            }
        }

        let context = RenderContext::from_session(ctx.session);
        if let Err(e) = ctx
            .show(Template::BaseInputConfirmation, &context, None)
            .await
        {
            if !recorded {
                return Err(e);
            }
            warn!(user_id = ctx.event.user.id, error = %e, "Summary not shown after recording");
        }
        Ok(Transition::End)
    }
}

/// Farewell on a new message; the engine has already dropped the session. The last
/// prompt loses its keyboard first.
pub struct CancelStep;

#[async_trait]
impl StepHandler for CancelStep {
    async fn handle(&self, ctx: &mut StepContext<'_>) -> Result<Transition> {
        if let Some(prompt) = &ctx.session.prompt {
            if let Err(e) = ctx
                .services
                .bot
                .remove_keyboard(&ctx.event.chat, &prompt.message_id)
                .await
            {
                warn!(user_id = ctx.event.user.id, error = %e, "Failed to clear prompt keyboard");
            }
        }
        ctx.services
            .bot
            .send_message(&ctx.event.chat, FAREWELL, None)
            .await?;
        Ok(Transition::End)
    }
}

/// Collected fields as a ledger row. Fails if any field is missing.
pub fn transaction_record(session: &Session, now: DateTime<Utc>) -> Result<TransactionRecord> {
    let get = |key: FieldKey| {
        session
            .field(key)
            .ok_or_else(|| FinbotError::State(format!("missing field {}", key.as_str())))
    };
    let group = get(FieldKey::BudgetGroup)?;
    let kind = get(FieldKey::BudgetType)?;

    Ok(TransactionRecord {
        user_id: session.key.user_id,
        chat_id: session.key.chat_id,
        command: session
            .command
            .map(|c| c.as_str().to_string())
            .unwrap_or_default(),
        date: get(FieldKey::Date)?.value.clone(),
        budget_group_id: group.id.unwrap_or_default(),
        budget_group: group.value.clone(),
        budget_type_id: kind.id.unwrap_or_default(),
        budget_type: kind.value.clone(),
        description: get(FieldKey::Description)?.value.clone(),
        amount: get(FieldKey::Amount)?.value.clone(),
        created_at: now,
    })
}
