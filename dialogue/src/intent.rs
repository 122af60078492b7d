//! Typed intents and the button payload codec.
//!
//! Transport payloads are plain strings (`key=value`, `key=id;'label'`, or a bare token).
//! They are parsed into [`Intent`] once at the boundary; routing only ever matches on variants.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use finbot_core::{Event, EventKind, PayloadError};
use serde::{Deserialize, Serialize};

use crate::session::Action;

/// Command that opens the wizard.
pub const ENTRY_COMMAND: &str = "finance";
/// Command that cancels the wizard from any state.
pub const CANCEL_COMMAND: &str = "cancel";
/// Telegram rejects callback data longer than this many bytes.
pub const MAX_PAYLOAD_LEN: usize = 64;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Start,
    Cancel,
    ActionSelected(Action),
    DateChosen(String),
    GroupChosen(Choice),
    TypeChosen(Choice),
    Text(String),
    AmountChosen(String),
    Confirm(bool),
    OpenCalendar,
    CalendarNavigate(YearMonth),
    CalendarDay(NaiveDate),
    CalendarConfirm,
    CalendarBack,
    CalendarIgnore,
    OpenNumpad,
    NumpadKey(NumpadKey),
    NumpadDone,
    NumpadConfirm,
    NumpadBack,
}

impl Intent {
    /// Translates an event. `Ok(None)` for commands this bot does not know.
    pub fn from_event(event: &Event) -> Result<Option<Intent>, PayloadError> {
        match &event.kind {
            EventKind::Command { name, .. } => Ok(match name.as_str() {
                ENTRY_COMMAND => Some(Intent::Start),
                CANCEL_COMMAND => Some(Intent::Cancel),
                _ => None,
            }),
            EventKind::Text { text, .. } => Ok(Some(Intent::Text(text.clone()))),
            EventKind::Callback { data, .. } => Intent::parse_payload(data).map(Some),
        }
    }

    pub fn parse_payload(data: &str) -> Result<Intent, PayloadError> {
        let (key, value) = match data.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (data, None),
        };

        match (key, value) {
            ("gen-calendar", None) => Ok(Intent::OpenCalendar),
            ("calendar-ok", None) => Ok(Intent::CalendarConfirm),
            ("calendar-back", None) => Ok(Intent::CalendarBack),
            ("calendar-ignore", None) => Ok(Intent::CalendarIgnore),
            ("gen-numpad", None) => Ok(Intent::OpenNumpad),
            ("numpad-done", None) => Ok(Intent::NumpadDone),
            ("numpad-ok", None) => Ok(Intent::NumpadConfirm),
            ("numpad-back", None) => Ok(Intent::NumpadBack),
            (key, Some("")) | (key, None) if VALUE_KEYS.contains(&key) => {
                Err(PayloadError::MissingValue(key.to_string()))
            }
            ("command", Some(v)) => v
                .parse()
                .map(Intent::ActionSelected)
                .map_err(|_| invalid(key, v)),
            ("date", Some(v)) => Ok(Intent::DateChosen(v.to_string())),
            ("budget-group", Some(v)) => Choice::parse(v).map(Intent::GroupChosen),
            ("budget-type", Some(v)) => Choice::parse(v).map(Intent::TypeChosen),
            ("amount", Some(v)) => Ok(Intent::AmountChosen(v.to_string())),
            ("confirm", Some("yes")) => Ok(Intent::Confirm(true)),
            ("confirm", Some("no")) => Ok(Intent::Confirm(false)),
            ("confirm", Some(v)) => Err(invalid(key, v)),
            ("calendar-nav", Some(v)) => v
                .parse()
                .map(Intent::CalendarNavigate)
                .map_err(|_| invalid(key, v)),
            ("calendar-day", Some(v)) => NaiveDate::parse_from_str(v, DATE_FORMAT)
                .map(Intent::CalendarDay)
                .map_err(|_| invalid(key, v)),
            ("numpad-key", Some(v)) => v
                .parse()
                .map(Intent::NumpadKey)
                .map_err(|_| invalid(key, v)),
            _ => Err(PayloadError::UnknownKey(key.to_string())),
        }
    }

    /// Button payload for this intent; `None` for intents that never come from a button.
    pub fn payload(&self) -> Option<String> {
        let payload = match self {
            Intent::Start | Intent::Cancel | Intent::Text(_) => return None,
            Intent::ActionSelected(action) => format!("command={}", action.as_str()),
            Intent::DateChosen(date) => format!("date={}", date),
            Intent::GroupChosen(choice) => choice.payload("budget-group"),
            Intent::TypeChosen(choice) => choice.payload("budget-type"),
            Intent::AmountChosen(amount) => format!("amount={}", amount),
            Intent::Confirm(true) => "confirm=yes".to_string(),
            Intent::Confirm(false) => "confirm=no".to_string(),
            Intent::OpenCalendar => "gen-calendar".to_string(),
            Intent::CalendarNavigate(month) => format!("calendar-nav={}", month),
            Intent::CalendarDay(day) => format!("calendar-day={}", day.format(DATE_FORMAT)),
            Intent::CalendarConfirm => "calendar-ok".to_string(),
            Intent::CalendarBack => "calendar-back".to_string(),
            Intent::CalendarIgnore => "calendar-ignore".to_string(),
            Intent::OpenNumpad => "gen-numpad".to_string(),
            Intent::NumpadKey(key) => format!("numpad-key={}", key),
            Intent::NumpadDone => "numpad-done".to_string(),
            Intent::NumpadConfirm => "numpad-ok".to_string(),
            Intent::NumpadBack => "numpad-back".to_string(),
        };
        Some(payload)
    }
}

const VALUE_KEYS: [&str; 9] = [
    "command",
    "date",
    "budget-group",
    "budget-type",
    "amount",
    "confirm",
    "calendar-nav",
    "calendar-day",
    "numpad-key",
];

fn invalid(key: &str, value: &str) -> PayloadError {
    PayloadError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Catalog pick carried in a payload as `id;'label'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub id: i64,
    pub label: String,
}

impl Choice {
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }

    /// Splits on the first `;`; quotes are stripped from the label.
    pub fn parse(value: &str) -> Result<Self, PayloadError> {
        let (id, label) = value
            .split_once(';')
            .ok_or_else(|| PayloadError::MissingSeparator(value.to_string()))?;
        let id = id
            .trim()
            .parse()
            .map_err(|_| PayloadError::InvalidId(id.to_string()))?;
        Ok(Self {
            id,
            label: label.replace('\'', ""),
        })
    }

    /// `key=id;'label'`, with the label cut on a char boundary so the whole payload fits
    /// in [`MAX_PAYLOAD_LEN`] bytes.
    pub fn payload(&self, key: &str) -> String {
        let prefix = format!("{}={};'", key, self.id);
        let budget = MAX_PAYLOAD_LEN.saturating_sub(prefix.len() + 1);
        let label = self.label.replace('\'', "");
        let mut end = label.len().min(budget);
        while !label.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}{}'", prefix, &label[..end])
    }
}

/// A calendar month, stored as its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth(NaiveDate);

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(YearMonth)
    }

    pub fn of(date: NaiveDate) -> Self {
        YearMonth(date.with_day(1).unwrap_or(date))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn next(&self) -> Self {
        self.0
            .checked_add_months(Months::new(1))
            .map(YearMonth)
            .unwrap_or(*self)
    }

    pub fn prev(&self) -> Self {
        self.0
            .checked_sub_months(Months::new(1))
            .map(YearMonth)
            .unwrap_or(*self)
    }

    pub fn days(&self) -> u32 {
        let next = self.next();
        if next == *self {
            return 31;
        }
        (next.0 - self.0).num_days() as u32
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for YearMonth {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s.split_once('-').ok_or(())?;
        let year = year.parse().map_err(|_| ())?;
        let month = month.parse().map_err(|_| ())?;
        YearMonth::new(year, month).ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumpadKey {
    Digit(u8),
    Dot,
    Backspace,
    Clear,
}

impl fmt::Display for NumpadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumpadKey::Digit(d) => write!(f, "{}", d),
            NumpadKey::Dot => f.write_str("dot"),
            NumpadKey::Backspace => f.write_str("back"),
            NumpadKey::Clear => f.write_str("clear"),
        }
    }
}

impl FromStr for NumpadKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dot" => Ok(NumpadKey::Dot),
            "back" => Ok(NumpadKey::Backspace),
            "clear" => Ok(NumpadKey::Clear),
            _ => match s.as_bytes() {
                [d @ b'0'..=b'9'] => Ok(NumpadKey::Digit(d - b'0')),
                _ => Err(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_composite_payload_strips_quotes() {
        let intent = Intent::parse_payload("budget-group=42;'Food & Drink'").unwrap();
        assert_eq!(intent, Intent::GroupChosen(Choice::new(42, "Food & Drink")));
    }

    #[test]
    fn test_parse_composite_without_separator_is_malformed() {
        assert_eq!(
            Intent::parse_payload("budget-group=42"),
            Err(PayloadError::MissingSeparator("42".to_string()))
        );
        assert!(matches!(
            Intent::parse_payload("budget-type=x;'Rent'"),
            Err(PayloadError::InvalidId(_))
        ));
    }

    #[test]
    fn test_label_may_contain_equals_and_semicolon() {
        let intent = Intent::parse_payload("budget-type=3;'a=b;c'").unwrap();
        assert_eq!(intent, Intent::TypeChosen(Choice::new(3, "a=b;c")));
    }

    #[test]
    fn test_parse_simple_payloads() {
        assert_eq!(
            Intent::parse_payload("command=create"),
            Ok(Intent::ActionSelected(Action::Create))
        );
        assert_eq!(
            Intent::parse_payload("date=2024-05-01"),
            Ok(Intent::DateChosen("2024-05-01".to_string()))
        );
        assert_eq!(
            Intent::parse_payload("amount=1500"),
            Ok(Intent::AmountChosen("1500".to_string()))
        );
        assert_eq!(Intent::parse_payload("confirm=no"), Ok(Intent::Confirm(false)));
        assert_eq!(Intent::parse_payload("gen-calendar"), Ok(Intent::OpenCalendar));
        assert_eq!(
            Intent::parse_payload("numpad-key=7"),
            Ok(Intent::NumpadKey(NumpadKey::Digit(7)))
        );
        assert_eq!(
            Intent::parse_payload("calendar-nav=2024-12"),
            Ok(Intent::CalendarNavigate(YearMonth::new(2024, 12).unwrap()))
        );
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(matches!(
            Intent::parse_payload("confirm=maybe"),
            Err(PayloadError::InvalidValue { .. })
        ));
        assert!(matches!(
            Intent::parse_payload("command=delete"),
            Err(PayloadError::InvalidValue { .. })
        ));
        assert_eq!(
            Intent::parse_payload("date="),
            Err(PayloadError::MissingValue("date".to_string()))
        );
        assert_eq!(
            Intent::parse_payload("amount"),
            Err(PayloadError::MissingValue("amount".to_string()))
        );
        assert!(matches!(
            Intent::parse_payload("whatever=1"),
            Err(PayloadError::UnknownKey(_))
        ));
        assert!(matches!(
            Intent::parse_payload("calendar-nav=2024-13"),
            Err(PayloadError::InvalidValue { .. })
        ));
        assert!(matches!(
            Intent::parse_payload("numpad-key=10"),
            Err(PayloadError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_choice_payload_fits_telegram_limit() {
        let long = Choice::new(12345, "Ünïcödé ".repeat(20));
        let payload = long.payload("budget-group");
        assert!(payload.len() <= MAX_PAYLOAD_LEN);
        assert!(payload.starts_with("budget-group=12345;'"));
        assert!(payload.ends_with('\''));
        assert!(Intent::parse_payload(&payload).is_ok());
    }

    #[test]
    fn test_year_month_navigation() {
        let dec = YearMonth::new(2024, 12).unwrap();
        assert_eq!(dec.next(), YearMonth::new(2025, 1).unwrap());
        assert_eq!(dec.prev(), YearMonth::new(2024, 11).unwrap());
        assert_eq!(YearMonth::new(2024, 2).unwrap().days(), 29);
        assert_eq!(YearMonth::new(2023, 2).unwrap().days(), 28);
        assert_eq!(dec.to_string(), "2024-12");
        assert_eq!(
            YearMonth::of(NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()),
            YearMonth::new(2024, 5).unwrap()
        );
    }
}
