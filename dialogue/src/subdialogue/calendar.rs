//! Date picker: a month grid with navigation, then a review screen.

use chrono::{Datelike, NaiveDate};
use finbot_core::{Button, Keyboard};
use serde::{Deserialize, Serialize};

use super::{Screen, SubDialogue, SubStep};
use crate::intent::{Intent, YearMonth};

const WEEKDAYS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarScratch {
    pub month: YearMonth,
    pub picked: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DatePicker;

impl DatePicker {
    pub fn grid(month: YearMonth) -> Keyboard {
        let ignore = || Intent::CalendarIgnore.payload().unwrap_or_default();
        let nav = |m: YearMonth| Intent::CalendarNavigate(m).payload().unwrap_or_default();

        let title = format!("{} {}", MONTHS[(month.month() - 1) as usize], month.year());
        let mut keyboard = Keyboard::new()
            .row(vec![
                Button::new("«", nav(month.prev())),
                Button::new(title, ignore()),
                Button::new("»", nav(month.next())),
            ])
            .row(WEEKDAYS.iter().map(|d| Button::new(*d, ignore())).collect());

        let first = month.first_day();
        let lead = first.weekday().num_days_from_monday() as usize;
        let mut cells: Vec<Button> = (0..lead).map(|_| Button::new(" ", ignore())).collect();
        for day in first.iter_days().take(month.days() as usize) {
            let payload = Intent::CalendarDay(day).payload().unwrap_or_default();
            cells.push(Button::new(day.day().to_string(), payload));
        }
        while cells.len() % 7 != 0 {
            cells.push(Button::new(" ", ignore()));
        }

        for week in cells.chunks(7) {
            keyboard = keyboard.row(week.to_vec());
        }
        keyboard
    }

    fn grid_screen(month: YearMonth) -> Screen {
        Screen {
            keyboard: Self::grid(month),
            note: None,
        }
    }

    fn review_screen(day: NaiveDate) -> Screen {
        Screen {
            keyboard: Keyboard::new().row(vec![
                Button::new("Select", Intent::CalendarConfirm.payload().unwrap_or_default()),
                Button::new("Back", Intent::CalendarBack.payload().unwrap_or_default()),
            ]),
            note: Some(format!("Date: {}", day.format("%Y-%m-%d"))),
        }
    }
}

impl SubDialogue for DatePicker {
    type Scratch = CalendarScratch;

    fn name(&self) -> &'static str {
        "calendar"
    }

    fn open(&self, today: NaiveDate) -> (CalendarScratch, Screen) {
        let month = YearMonth::of(today);
        (
            CalendarScratch {
                month,
                picked: None,
            },
            Self::grid_screen(month),
        )
    }

    fn handles_control(&self, intent: &Intent) -> bool {
        matches!(
            intent,
            Intent::CalendarNavigate(_) | Intent::CalendarDay(_) | Intent::CalendarIgnore
        )
    }

    fn handles_end(&self, intent: &Intent) -> bool {
        matches!(
            intent,
            Intent::CalendarConfirm | Intent::CalendarBack | Intent::CalendarIgnore
        )
    }

    fn control(&self, scratch: &mut CalendarScratch, intent: &Intent) -> SubStep {
        match intent {
            Intent::CalendarNavigate(month) if *month != scratch.month => {
                scratch.month = *month;
                SubStep::Stay(Self::grid_screen(*month))
            }
            Intent::CalendarDay(day) => {
                scratch.picked = Some(*day);
                scratch.month = YearMonth::of(*day);
                SubStep::Review(Self::review_screen(*day))
            }
            _ => SubStep::Ignore,
        }
    }

    fn finish(&self, scratch: &mut CalendarScratch, intent: &Intent) -> SubStep {
        match (intent, scratch.picked) {
            (Intent::CalendarConfirm, Some(day)) => SubStep::Done(day.format("%Y-%m-%d").to_string()),
            (Intent::CalendarBack, _) => {
                scratch.picked = None;
                SubStep::Back(Self::grid_screen(scratch.month))
            }
            _ => SubStep::Ignore,
        }
    }
}
