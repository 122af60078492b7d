//! Dialogue states and the externally visible status of a session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Every state a session can be in. The calendar and numpad states belong to the
/// sub-dialogues but live in the same state space as the main flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    InputAction,
    InputDate,
    InputBudgetGroup,
    InputBudgetType,
    InputDescription,
    InputAmount,
    InputConfirmation,
    CalendarControl,
    CalendarEndControl,
    NumpadControl,
    NumpadEndControl,
}

impl State {
    pub const ALL: [State; 11] = [
        State::InputAction,
        State::InputDate,
        State::InputBudgetGroup,
        State::InputBudgetType,
        State::InputDescription,
        State::InputAmount,
        State::InputConfirmation,
        State::CalendarControl,
        State::CalendarEndControl,
        State::NumpadControl,
        State::NumpadEndControl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            State::InputAction => "INPUT_ACTION",
            State::InputDate => "INPUT_DATE",
            State::InputBudgetGroup => "INPUT_BUDGET_GROUP",
            State::InputBudgetType => "INPUT_BUDGET_TYPE",
            State::InputDescription => "INPUT_DESCRIPTION",
            State::InputAmount => "INPUT_AMOUNT",
            State::InputConfirmation => "INPUT_CONFIRMATION",
            State::CalendarControl => "CALENDAR_CONTROL",
            State::CalendarEndControl => "CALENDAR_END_CONTROL",
            State::NumpadControl => "NUMPAD_CONTROL",
            State::NumpadEndControl => "NUMPAD_END_CONTROL",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a session stands after an event has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Session exists and is waiting in this state.
    Active(State),
    /// Session reached the terminal state (confirmed, rejected or cancelled) and was discarded.
    Ended,
    /// No session for this user.
    Idle,
}

impl Status {
    pub fn state(&self) -> Option<State> {
        match self {
            Status::Active(state) => Some(*state),
            _ => None,
        }
    }
}
