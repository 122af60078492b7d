//! # finbot-telegram
//!
//! Telegram transport for the finance bot: teloxide updates become [`finbot_core::Event`]s,
//! [`TelegramBotAdapter`] implements [`finbot_core::Bot`] with inline keyboards and HTML, and
//! [`run_dispatcher`] feeds every update into a [`dialogue::Dispatcher`].
//! No dialogue logic lives here.

mod adapters;
mod bot_adapter;
mod config;
mod runner;

pub use adapters::{
    parse_command, TelegramCallbackWrapper, TelegramMessageWrapper, TelegramUserWrapper,
};
pub use bot_adapter::{inline_markup, TelegramBotAdapter};
pub use config::TelegramConfig;
pub use runner::run_dispatcher;
