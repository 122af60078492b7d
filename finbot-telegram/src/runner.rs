//! Update loop: converts teloxide messages and button presses to core events and submits them
//! to the session dispatcher. Ordering per session is the dispatcher's job; this loop only
//! translates.

use anyhow::Result;
use dialogue::Dispatcher as SessionDispatcher;
use std::sync::Arc;
use teloxide::{dispatching::UpdateHandler, prelude::*, types::CallbackQuery, RequestError};
use tracing::{debug, info, instrument};

use super::adapters::{TelegramCallbackWrapper, TelegramMessageWrapper};

async fn on_message(msg: Message, sessions: Arc<SessionDispatcher>) -> ResponseResult<()> {
    match TelegramMessageWrapper(&msg).to_event() {
        Some(event) => {
            info!(
                user_id = event.user.id,
                chat_id = event.chat.id,
                kind = event.kind_name(),
                "Received message"
            );
            sessions.submit(event).await;
        }
        None => debug!(chat_id = msg.chat.id.0, "Skipping non-text message"),
    }
    Ok(())
}

async fn on_callback(query: CallbackQuery, sessions: Arc<SessionDispatcher>) -> ResponseResult<()> {
    let event = TelegramCallbackWrapper(&query).to_event();
    info!(
        user_id = event.user.id,
        chat_id = event.chat.id,
        data = query.data.as_deref().unwrap_or_default(),
        "Received callback"
    );
    sessions.submit(event).await;
    Ok(())
}

fn schema() -> UpdateHandler<RequestError> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback))
}

/// Runs long polling until Ctrl-C. Logs the bot username from get_me() before starting.
#[instrument(skip(bot, sessions))]
pub async fn run_dispatcher(bot: teloxide::Bot, sessions: Arc<SessionDispatcher>) -> Result<()> {
    if let Ok(me) = bot.get_me().await {
        if let Some(username) = &me.user.username {
            info!(username = %username, "Bot identity resolved");
        }
    }

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![sessions])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
