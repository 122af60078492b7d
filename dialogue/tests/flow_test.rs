//! Integration tests for the main finance flow on [`dialogue::DialogueEngine`].

mod common;

use std::sync::Arc;

use chrono::Duration;
use common::{callback, command, key, text, FlakyCatalog, Harness, Sent, USER_ID};
use dialogue::{FieldKey, FlowOptions, State, Status};
use storage::{InMemoryCatalog, Ledger, LedgerRepository};

/// Drives a fresh harness from `/finance` up to the confirmation prompt via direct payloads.
async fn fill_direct(h: &Harness) {
    assert_eq!(h.send(command("finance")).await, Status::Active(State::InputAction));
    assert_eq!(h.press("command=create").await, Status::Active(State::InputDate));
    assert_eq!(h.press("date=2024-05-01").await, Status::Active(State::InputBudgetGroup));
    assert_eq!(
        h.press("budget-group=1;'Home'").await,
        Status::Active(State::InputBudgetType)
    );
    assert_eq!(
        h.press("budget-type=3;'Rent'").await,
        Status::Active(State::InputDescription)
    );
    assert_eq!(h.send(text("May rent")).await, Status::Active(State::InputAmount));
    assert_eq!(h.press("amount=1500").await, Status::Active(State::InputConfirmation));
}

/// **Test: Full direct round trip collects five fields in order and ends.**
///
/// **Setup:** Harness with in-memory catalog (Home/Rent).
/// **Action:** /finance → create → date → group → type → text → amount → confirm=yes.
/// **Expected:** Fields date, group, type, description, amount in order; final summary contains
/// every value; session discarded.
#[tokio::test]
async fn test_round_trip_direct() {
    let h = Harness::new();
    fill_direct(&h).await;

    let session = h.session().expect("session should exist before confirmation");
    let keys: Vec<FieldKey> = session.keys();
    assert_eq!(
        keys,
        vec![
            FieldKey::Date,
            FieldKey::BudgetGroup,
            FieldKey::BudgetType,
            FieldKey::Description,
            FieldKey::Amount
        ]
    );
    assert_eq!(
        h.field_values(),
        vec!["2024-05-01", "Home", "Rent", "May rent", "1500"]
    );
    assert_eq!(session.field(FieldKey::BudgetGroup).unwrap().id, Some(1));
    assert_eq!(session.field(FieldKey::BudgetType).unwrap().id, Some(3));

    assert_eq!(h.press("confirm=yes").await, Status::Ended);
    assert!(h.session().is_none());

    let summary = h.bot.last_text();
    let mut last = 0;
    for value in ["2024-05-01", "Home", "Rent", "May rent", "1500"] {
        let at = summary[last..]
            .find(value)
            .unwrap_or_else(|| panic!("{:?} missing or out of order in {:?}", value, summary));
        last += at;
    }
    assert!(summary.contains("Confirmed: <b>yes</b>"));
    assert!(h.bot.last_keyboard().is_none());
}

/// **Test: Every prompt after the first edits the same message.**
///
/// **Setup:** Harness.
/// **Action:** Run the direct flow including the text step.
/// **Expected:** Exactly one message is sent; every other render is an edit of message "100",
/// including the edit after the description (which arrives as plain text).
#[tokio::test]
async fn test_edit_in_place_including_text_step() {
    let h = Harness::new();
    fill_direct(&h).await;

    assert_eq!(h.bot.sends(), 1);
    let edits: Vec<String> = h
        .bot
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Sent::Edit { message_id, .. } => Some(message_id),
            _ => None,
        })
        .collect();
    assert_eq!(edits.len(), 6);
    assert!(edits.iter().all(|id| id == "100"));
}

/// **Test: Prompts offer the catalog options and today's date.**
///
/// **Setup:** Harness with fixed clock at 2024-05-01; catalog groups Home, Food & Drink.
/// **Action:** Walk to the budget type prompt.
/// **Expected:** "Today" carries the clock's date; groups list both groups; types list only
/// the chosen group's types.
#[tokio::test]
async fn test_prompts_list_catalog_and_today() {
    let h = Harness::new();
    h.send(command("finance")).await;
    let init = h.bot.last_keyboard().unwrap();
    assert_eq!(init.payload_of("Create"), Some("command=create"));

    h.tap("Create").await;
    let dates = h.bot.last_keyboard().unwrap();
    assert_eq!(dates.payload_of("Today"), Some("date=2024-05-01"));
    assert_eq!(dates.payload_of("Choose Date"), Some("gen-calendar"));
    assert!(h.bot.last_text().contains("Please choose the <b>date</b>"));

    h.tap("Today").await;
    let groups = h.bot.last_keyboard().unwrap();
    assert_eq!(groups.payload_of("Home"), Some("budget-group=1;'Home'"));
    assert_eq!(groups.payload_of("Food & Drink"), Some("budget-group=2;'Food & Drink'"));

    h.tap("Food & Drink").await;
    assert_eq!(h.session().unwrap().state, State::InputBudgetType);
    let types = h.bot.last_keyboard().unwrap();
    assert_eq!(types.payload_of("Groceries"), Some("budget-type=5;'Groceries'"));
    assert!(types.payload_of("Rent").is_none());
    assert_eq!(h.field_values(), vec!["2024-05-01", "Food & Drink"]);
}

/// **Test: Quick amounts configured in options appear next to "Custom Amount".**
#[tokio::test]
async fn test_quick_amounts() {
    let options = FlowOptions {
        quick_amounts: vec!["50".to_string(), "100".to_string()],
    };
    let h = Harness::build(Arc::new(common::catalog()), None, options);
    h.send(command("finance")).await;
    h.press("command=create").await;
    h.press("date=2024-05-01").await;
    h.press("budget-group=1;'Home'").await;
    h.press("budget-type=4;'Utilities'").await;
    h.send(text("Power bill")).await;

    let keyboard = h.bot.last_keyboard().unwrap();
    assert_eq!(keyboard.payload_of("Custom Amount"), Some("gen-numpad"));
    assert_eq!(keyboard.payload_of("100"), Some("amount=100"));

    assert_eq!(h.tap("100").await, Status::Active(State::InputConfirmation));
    assert_eq!(h.field_values().last().map(String::as_str), Some("100"));
}

/// **Test: A composite payload without the `;` separator is ignored.**
///
/// **Setup:** Session in InputBudgetGroup.
/// **Action:** Press `budget-group=42`.
/// **Expected:** State and fields unchanged, nothing rendered, callback still acknowledged.
#[tokio::test]
async fn test_malformed_composite_payload_is_ignored() {
    let h = Harness::new();
    h.send(command("finance")).await;
    h.press("command=create").await;
    h.press("date=2024-05-01").await;

    let renders = h.bot.calls().len();
    let acks = h.bot.acks();
    let status = h.press("budget-group=42").await;

    assert_eq!(status, Status::Active(State::InputBudgetGroup));
    assert_eq!(h.field_values(), vec!["2024-05-01"]);
    assert_eq!(h.bot.acks(), acks + 1);
    assert_eq!(h.bot.calls().len(), renders + 1);
}

/// **Test: Unmatched events are idempotent.**
///
/// **Setup:** Session in InputBudgetType.
/// **Action:** Send `confirm=yes` twice, then free text.
/// **Expected:** State and fields identical after each send.
#[tokio::test]
async fn test_unmatched_events_change_nothing() {
    let h = Harness::new();
    h.send(command("finance")).await;
    h.press("command=create").await;
    h.press("date=2024-05-01").await;
    h.press("budget-group=1;'Home'").await;

    let before = h.session().unwrap();
    for _ in 0..2 {
        assert_eq!(h.press("confirm=yes").await, Status::Active(State::InputBudgetType));
        let now = h.session().unwrap();
        assert_eq!(now.state, before.state);
        assert_eq!(now.fields, before.fields);
    }
    assert_eq!(h.send(text("hello")).await, Status::Active(State::InputBudgetType));
    assert_eq!(h.session().unwrap().fields, before.fields);
}

/// **Test: /finance while a session is active is ignored; unknown commands too.**
#[tokio::test]
async fn test_reentry_and_unknown_command_ignored() {
    let h = Harness::new();
    h.send(command("finance")).await;
    h.press("command=create").await;

    assert_eq!(h.send(command("finance")).await, Status::Active(State::InputDate));
    assert_eq!(h.send(command("help")).await, Status::Active(State::InputDate));
    assert_eq!(h.bot.sends(), 1);
}

/// **Test: Events without a session are ignored but callbacks are acknowledged.**
#[tokio::test]
async fn test_no_session_ignored() {
    let h = Harness::new();
    assert_eq!(h.send(callback("date=2024-05-01", "77")).await, Status::Idle);
    assert_eq!(h.send(text("hi")).await, Status::Idle);
    assert_eq!(h.bot.acks(), 1);
    assert_eq!(h.bot.sends(), 0);
}

/// **Test: Confirm yes writes one ledger row; confirm no writes none.**
///
/// **Setup:** In-memory SQLite ledger shared by two runs.
/// **Action:** Full flow answered yes, then full flow answered no.
/// **Expected:** One row for the user, carrying the collected values; both runs end.
#[tokio::test]
async fn test_ledger_records_only_confirmed() {
    let ledger = Arc::new(
        LedgerRepository::new("sqlite::memory:")
            .await
            .expect("Failed to create ledger"),
    );

    let yes = Harness::build(
        Arc::new(common::catalog()),
        Some(ledger.clone() as Arc<dyn Ledger>),
        FlowOptions::default(),
    );
    fill_direct(&yes).await;
    assert_eq!(yes.press("confirm=yes").await, Status::Ended);

    let no = Harness::build(
        Arc::new(common::catalog()),
        Some(ledger.clone() as Arc<dyn Ledger>),
        FlowOptions::default(),
    );
    fill_direct(&no).await;
    assert_eq!(no.press("confirm=no").await, Status::Ended);
    assert!(no.bot.last_text().contains("Confirmed: <b>no</b>"));

    let rows = ledger.recent_by_user(USER_ID, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date, "2024-05-01");
    assert_eq!(rows[0].budget_group, "Home");
    assert_eq!(rows[0].budget_type_id, 3);
    assert_eq!(rows[0].description, "May rent");
    assert_eq!(rows[0].amount, "1500");
}

/// **Test: Idle sessions expire.**
///
/// **Setup:** Idle timeout 30 minutes; session in InputDate.
/// **Action:** Advance the clock 31 minutes and press a date.
/// **Expected:** Event ignored as if no session; /finance starts a fresh one.
#[tokio::test]
async fn test_idle_session_expires() {
    let h = Harness::new().with_idle_timeout(Duration::minutes(30));
    h.send(command("finance")).await;
    h.press("command=create").await;

    h.clock.advance(Duration::minutes(31));
    assert_eq!(h.press("date=2024-05-01").await, Status::Idle);
    assert!(h.session().is_none());

    assert_eq!(h.send(command("finance")).await, Status::Active(State::InputAction));
    assert_eq!(h.bot.sends(), 2);
}

/// **Test: Activity keeps a session alive; purge removes only stale ones.**
#[tokio::test]
async fn test_purge_idle() {
    let h = Harness::new().with_idle_timeout(Duration::minutes(30));
    h.send(command("finance")).await;
    h.clock.advance(Duration::minutes(20));
    h.press("command=create").await;
    h.clock.advance(Duration::minutes(20));

    assert_eq!(h.engine.purge_idle(), 0);
    assert!(h.engine.sessions().contains(&key()));

    h.clock.advance(Duration::minutes(11));
    assert_eq!(h.engine.purge_idle(), 1);
    assert!(h.session().is_none());
}

/// **Test: A failing catalog lookup leaves the session where it was.**
///
/// **Setup:** Catalog that can be switched to fail; session in INPUT_DATE.
/// **Action:** Press a date while the catalog fails, then again after it recovers.
/// **Expected:** First press returns an error with state INPUT_DATE and no fields; the retry
/// moves on to INPUT_BUDGET_GROUP with the date collected once.
#[tokio::test]
async fn test_catalog_failure_keeps_prior_state() {
    let catalog = FlakyCatalog::new(common::catalog());
    let h = Harness::build(catalog.clone(), None, FlowOptions::default());
    h.send(command("finance")).await;
    h.press("command=create").await;

    catalog.set_failing(true);
    let result = h.engine.handle(&callback("date=2024-05-01", "100")).await;
    assert!(result.is_err());
    let session = h.session().unwrap();
    assert_eq!(session.state, State::InputDate);
    assert!(session.fields.is_empty());

    catalog.set_failing(false);
    assert_eq!(h.press("date=2024-05-01").await, Status::Active(State::InputBudgetGroup));
    assert_eq!(h.field_values(), vec!["2024-05-01"]);
}

/// **Test: A failed prompt edit leaves the session where it was.**
///
/// **Setup:** Session in INPUT_DATE; the bot's next edit fails.
/// **Action:** Press a date, then press it again.
/// **Expected:** Error and unchanged session first; the retry succeeds.
#[tokio::test]
async fn test_edit_failure_keeps_prior_state() {
    let h = Harness::new();
    h.send(command("finance")).await;
    h.press("command=create").await;

    h.bot.fail_next_edits(1);
    let result = h.engine.handle(&callback("date=2024-05-01", "100")).await;
    assert!(result.is_err());
    let session = h.session().unwrap();
    assert_eq!(session.state, State::InputDate);
    assert!(session.fields.is_empty());

    assert_eq!(h.press("date=2024-05-01").await, Status::Active(State::InputBudgetGroup));
    assert_eq!(h.field_values(), vec!["2024-05-01"]);
}

/// **Test: A recorded entry is not recorded again when its summary could not be shown.**
///
/// **Setup:** In-memory ledger; session at confirmation; the summary edit fails once.
/// **Action:** Press yes, then press yes again.
/// **Expected:** The first press ends the session; the second is ignored; one ledger row.
#[tokio::test]
async fn test_confirm_after_failed_summary_records_once() {
    let ledger = Arc::new(
        LedgerRepository::new("sqlite::memory:")
            .await
            .expect("Failed to create ledger"),
    );
    let h = Harness::build(
        Arc::new(common::catalog()),
        Some(ledger.clone() as Arc<dyn Ledger>),
        FlowOptions::default(),
    );
    fill_direct(&h).await;

    h.bot.fail_next_edits(1);
    assert_eq!(h.press("confirm=yes").await, Status::Ended);
    assert!(h.session().is_none());
    assert_eq!(h.press("confirm=yes").await, Status::Idle);

    let rows = ledger.recent_by_user(USER_ID, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
}

/// **Test: Labels too long for a button payload are collected in full.**
///
/// **Setup:** Catalog with a group and a type whose labels exceed the payload limit.
/// **Action:** Tap both buttons.
/// **Expected:** Payloads fit in 64 bytes; the fields hold the catalog labels unchanged.
#[tokio::test]
async fn test_long_catalog_labels_kept_in_full() {
    let group = "Household and family expenses shared between all the flatmates";
    let kind = "Electricity, water, heating and internet bills for the whole year";
    let catalog = InMemoryCatalog::new()
        .with_group(1, group)
        .with_type(1, 3, kind);
    let h = Harness::build(Arc::new(catalog), None, FlowOptions::default());
    h.send(command("finance")).await;
    h.press("command=create").await;
    h.press("date=2024-05-01").await;

    let payload = h.bot.last_keyboard().unwrap().payload_of(group).unwrap().to_string();
    assert!(payload.len() <= 64);
    assert_eq!(h.tap(group).await, Status::Active(State::InputBudgetType));
    assert_eq!(h.tap(kind).await, Status::Active(State::InputDescription));

    assert_eq!(h.field_values(), vec!["2024-05-01", group, kind]);
}
