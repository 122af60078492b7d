//! Bot configuration: BaseConfig (Telegram + log + DB) + DialogueExtensions (wizard tuning).

mod base;
mod bot_config;
mod extensions;


pub use base::BaseConfig;
pub use bot_config::BotConfig;
pub use extensions::DialogueExtensions;
