//! Integration tests for the date picker and amount keypad sub-dialogues.

mod common;

use common::{command, text, Harness};
use dialogue::{State, Status};

async fn open_date_prompt(h: &Harness) {
    h.send(command("finance")).await;
    assert_eq!(h.press("command=create").await, Status::Active(State::InputDate));
}

async fn open_amount_prompt(h: &Harness) {
    open_date_prompt(h).await;
    h.press("date=2024-05-01").await;
    h.press("budget-group=1;'Home'").await;
    h.press("budget-type=3;'Rent'").await;
    assert_eq!(h.send(text("May rent")).await, Status::Active(State::InputAmount));
}

/// **Test: Picking a date through the calendar ends exactly where the direct path ends.**
///
/// **Setup:** Two harnesses at INPUT_DATE.
/// **Action:** One presses `date=2024-05-01`; the other opens the calendar, navigates a month
/// forward and back, picks 2024-05-01 and confirms.
/// **Expected:** Same state, same fields, same next keyboard; no anchor or scratch left.
#[tokio::test]
async fn test_calendar_converges_with_direct_date() {
    let direct = Harness::new();
    open_date_prompt(&direct).await;
    let direct_status = direct.press("date=2024-05-01").await;

    let delegated = Harness::new();
    open_date_prompt(&delegated).await;
    assert_eq!(
        delegated.press("gen-calendar").await,
        Status::Active(State::CalendarControl)
    );
    let anchor = delegated.session().unwrap().anchor.expect("anchor while calendar open");
    assert_eq!(anchor.state, State::InputDate);
    assert_eq!(anchor.message.message_id, "100");

    assert_eq!(
        delegated.press("calendar-nav=2024-06").await,
        Status::Active(State::CalendarControl)
    );
    assert!(delegated.bot.last_text().contains("Please choose the <b>date</b>"));
    assert!(delegated.session().unwrap().fields.is_empty());
    assert_eq!(
        delegated.press("calendar-nav=2024-05").await,
        Status::Active(State::CalendarControl)
    );
    assert_eq!(
        delegated.tap("1").await,
        Status::Active(State::CalendarEndControl)
    );
    assert!(delegated.bot.last_text().contains("Date: 2024-05-01"));
    let delegated_status = delegated.tap("Select").await;

    assert_eq!(direct_status, Status::Active(State::InputBudgetGroup));
    assert_eq!(delegated_status, direct_status);

    let a = direct.session().unwrap();
    let b = delegated.session().unwrap();
    assert_eq!(a.fields, b.fields);
    assert_eq!(a.prompt, b.prompt);
    assert!(b.anchor.is_none());
    assert!(b.scratch.is_none());
    assert_eq!(direct.bot.last_keyboard(), delegated.bot.last_keyboard());
}

/// **Test: Calendar back returns to the grid and inert cells do nothing.**
#[tokio::test]
async fn test_calendar_back_and_ignore() {
    let h = Harness::new();
    open_date_prompt(&h).await;
    h.press("gen-calendar").await;

    let calls = h.bot.calls().len();
    assert_eq!(
        h.press("calendar-ignore").await,
        Status::Active(State::CalendarControl)
    );
    assert_eq!(h.bot.calls().len(), calls + 1, "only the ack is recorded");

    h.press("calendar-day=2024-05-09").await;
    assert_eq!(
        h.press("calendar-back").await,
        Status::Active(State::CalendarControl)
    );
    assert_eq!(
        h.press("calendar-day=2024-05-10").await,
        Status::Active(State::CalendarEndControl)
    );
    assert_eq!(
        h.press("calendar-ok").await,
        Status::Active(State::InputBudgetGroup)
    );
    assert_eq!(h.field_values(), vec!["2024-05-10"]);
}

/// **Test: Main-flow payloads are not accepted while the calendar is open.**
#[tokio::test]
async fn test_calendar_is_modal() {
    let h = Harness::new();
    open_date_prompt(&h).await;
    h.press("gen-calendar").await;

    assert_eq!(
        h.press("date=2024-05-01").await,
        Status::Active(State::CalendarControl)
    );
    assert!(h.session().unwrap().fields.is_empty());
}

/// **Test: Keypad entry converges with a direct amount.**
///
/// **Setup:** Two harnesses at INPUT_AMOUNT.
/// **Action:** One presses `amount=12.5`; the other types 1, 2, dot, 5, OK, back, OK, confirm.
/// **Expected:** Both reach INPUT_CONFIRMATION with identical fields.
#[tokio::test]
async fn test_numpad_converges_with_direct_amount() {
    let direct = Harness::new();
    open_amount_prompt(&direct).await;
    assert_eq!(
        direct.press("amount=12.5").await,
        Status::Active(State::InputConfirmation)
    );

    let keypad = Harness::new();
    open_amount_prompt(&keypad).await;
    assert_eq!(
        keypad.tap("Custom Amount").await,
        Status::Active(State::NumpadControl)
    );
    for label in ["1", "2", ".", "5"] {
        assert_eq!(keypad.tap(label).await, Status::Active(State::NumpadControl));
    }
    assert!(keypad.bot.last_text().contains("Amount: 12.5"));

    assert_eq!(keypad.tap("OK").await, Status::Active(State::NumpadEndControl));
    assert_eq!(keypad.tap("Back").await, Status::Active(State::NumpadControl));
    assert_eq!(keypad.press("numpad-done").await, Status::Active(State::NumpadEndControl));
    assert_eq!(
        keypad.press("numpad-ok").await,
        Status::Active(State::InputConfirmation)
    );

    assert_eq!(direct.session().unwrap().fields, keypad.session().unwrap().fields);
    assert_eq!(direct.bot.last_text(), keypad.bot.last_text());
}

/// **Test: OK on an empty keypad does nothing.**
#[tokio::test]
async fn test_numpad_empty_done_ignored() {
    let h = Harness::new();
    open_amount_prompt(&h).await;
    h.press("gen-numpad").await;

    assert_eq!(h.press("numpad-done").await, Status::Active(State::NumpadControl));
    assert_eq!(h.press("numpad-key=0").await, Status::Active(State::NumpadControl));
    assert_eq!(h.press("numpad-key=back").await, Status::Active(State::NumpadControl));
    assert_eq!(h.press("numpad-done").await, Status::Active(State::NumpadControl));
    assert_eq!(h.field_values().len(), 4);
}
