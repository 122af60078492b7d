use anyhow::Result;
use dialogue::Dispatcher as SessionDispatcher;
use finbot_core::init_tracing;
use finbot_telegram::run_dispatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use super::components::{build_bot_components, build_engine};
use super::config::BotConfig;

/// Upper bound on how often idle sessions are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One sweep: drops expired sessions and returns how many. Their queue tasks close on
/// their own once idle.
pub fn sweep_idle(dispatcher: &SessionDispatcher) -> usize {
    dispatcher.engine().purge_idle()
}

/// Sweeps every `period` until the handle is aborted.
pub fn spawn_idle_sweeper(dispatcher: Arc<SessionDispatcher>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let sessions = sweep_idle(&dispatcher);
            if sessions > 0 {
                info!(sessions, queues = dispatcher.queue_count(), "Idle sweep");
            }
        }
    })
}

/// Main entry: validate config, init logging, build components, then poll Telegram until Ctrl-C.
#[instrument(skip(config))]
pub async fn run_bot(config: BotConfig) -> Result<()> {
    config.validate()?;
    init_tracing(config.log_file())?;

    let ext = config.extensions();
    info!(
        database_url = %config.database_url(),
        tz_offset_hours = ext.tz_offset_hours,
        session_idle_timeout_secs = ext.session_idle_timeout_secs,
        quick_amounts = ext.quick_amounts.len(),
        "Initializing bot"
    );

    let components = build_bot_components(&config, None).await?;
    let engine = build_engine(&config, &components)?;
    let dispatcher = Arc::new(SessionDispatcher::new(Arc::new(engine)));

    let sweeper = ext
        .session_idle_timeout()
        .map(|timeout| spawn_idle_sweeper(dispatcher.clone(), timeout.min(SWEEP_INTERVAL)));

    info!("Bot started successfully");
    let result = run_dispatcher(components.teloxide_bot.clone(), dispatcher).await;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("Bot stopped");
    result
}
