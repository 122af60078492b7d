//! # dialogue
//!
//! The finance wizard as a state machine: [`SessionStore`] holds one [`Session`] per
//! (chat, user); [`DialogueEngine`] routes each [`Intent`] through the [`TransitionTable`]
//! of the current [`State`]; sub-dialogues ([`DatePicker`], [`AmountKeypad`]) are plugged
//! in with [`subdialogue::create`] and [`TransitionTable::install`]. [`Dispatcher`] keeps
//! events of one session in order.
//!
//! ## Modules
//!
//! - [`state`] – states and [`Status`]
//! - [`session`] – session data and store
//! - [`intent`] – typed intents and the button payload codec
//! - [`table`] – transitions, routes, step handlers
//! - [`subdialogue`] – sub-dialogue combinator, date picker, amount keypad
//! - [`steps`] – handlers of the main flow
//! - [`render`] – templates
//! - [`clock`] – time source
//! - [`engine`] – engine and the finance table
//! - [`dispatcher`] – per-session queues

pub mod clock;
pub mod dispatcher;
pub mod engine;
pub mod intent;
pub mod render;
pub mod session;
pub mod state;
pub mod steps;
pub mod subdialogue;
pub mod table;

pub use clock::{Clock, FixedClock, SystemClock};
pub use dispatcher::{Dispatcher, QUEUE_IDLE};
pub use engine::{finance_table, DialogueEngine, FlowOptions, Services};
pub use intent::{Choice, Intent, NumpadKey, YearMonth, CANCEL_COMMAND, ENTRY_COMMAND};
pub use render::{HandlebarsRenderer, RenderContext, Renderer, Template};
pub use session::{Action, Field, FieldKey, ResumeAnchor, Session, SessionKey, SessionStore};
pub use state::{State, Status};
pub use steps::FAREWELL;
pub use subdialogue::{AmountKeypad, DatePicker, Screen, SubDialogue, SubDialogueEntry, SubStep, Wiring};
pub use table::{Route, StepContext, StepHandler, Transition, TransitionTable};
