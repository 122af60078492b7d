//! Component factory: builds BotComponents from config. Isolates assembly logic from runner.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use dialogue::{
    Clock, DialogueEngine, FlowOptions, HandlebarsRenderer, Renderer, Services, SystemClock,
};
use finbot_core::Bot;
use finbot_telegram::{TelegramBotAdapter, TelegramConfig};
use storage::{CatalogRepository, Ledger, LedgerRepository};
use tracing::{error, info, instrument};

use super::config::BotConfig;

/// Everything the runner needs; produced by the component factory.
#[derive(Clone)]
pub struct BotComponents {
    pub teloxide_bot: teloxide::Bot,
    pub catalog: Arc<CatalogRepository>,
    pub ledger: Arc<LedgerRepository>,
    pub services: Services,
    pub options: FlowOptions,
}

/// Creates the directory holding a file-backed SQLite database. In-memory URLs are left alone.
fn ensure_database_dir(database_url: &str) -> Result<()> {
    if database_url.contains(":memory:") || database_url.contains("mode=memory") {
        return Ok(());
    }
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(dir) = Path::new(path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
        }
    }
    Ok(())
}

/// Opens (and migrates) the catalog tables.
#[instrument]
pub async fn open_catalog(database_url: &str) -> Result<Arc<CatalogRepository>> {
    ensure_database_dir(database_url)?;
    let repo = CatalogRepository::new(database_url).await.map_err(|e| {
        error!(error = %e, "Failed to initialize catalog repository");
        anyhow::anyhow!("Failed to initialize catalog repository: {}", e)
    })?;
    Ok(Arc::new(repo))
}

/// Opens (and migrates) the ledger table.
#[instrument]
pub async fn open_ledger(database_url: &str) -> Result<Arc<LedgerRepository>> {
    ensure_database_dir(database_url)?;
    let repo = LedgerRepository::new(database_url).await.map_err(|e| {
        error!(error = %e, "Failed to initialize ledger repository");
        anyhow::anyhow!("Failed to initialize ledger repository: {}", e)
    })?;
    Ok(Arc::new(repo))
}

/// Built-in templates, overridden per file from `template_dir` when given.
pub fn build_renderer(template_dir: Option<&str>) -> Result<Arc<dyn Renderer>> {
    let renderer = match template_dir {
        Some(dir) => {
            info!(template_dir = %dir, "Loading template overrides");
            HandlebarsRenderer::with_template_dir(dir)?
        }
        None => HandlebarsRenderer::new()?,
    };
    Ok(Arc::new(renderer))
}

pub fn build_clock(tz_offset_hours: i32) -> Result<Arc<dyn Clock>> {
    let clock = SystemClock::with_offset_hours(tz_offset_hours)
        .ok_or_else(|| anyhow::anyhow!("Invalid TZ_OFFSET_HOURS: {}", tz_offset_hours))?;
    Ok(Arc::new(clock))
}

/// Builds bot, repositories, renderer and clock.
///
/// When `bot_override` is `Some` it replaces the Telegram adapter in [`Services`], so tests can
/// drive the whole stack with a recording bot. The teloxide Bot is still built (no network
/// call happens until it is used).
#[instrument(skip(config, bot_override))]
pub async fn build_bot_components(
    config: &BotConfig,
    bot_override: Option<Arc<dyn Bot>>,
) -> Result<BotComponents> {
    let teloxide_bot = TelegramConfig::with_token(config.bot_token().to_string())
        .with_api_url(config.telegram_api_url().map(str::to_string))
        .build_bot()?;

    let catalog = open_catalog(config.database_url()).await?;
    let ledger = open_ledger(config.database_url()).await?;

    let ext = config.extensions();
    let bot: Arc<dyn Bot> = match bot_override {
        Some(bot) => bot,
        None => Arc::new(TelegramBotAdapter::new(teloxide_bot.clone())),
    };
    let services = Services {
        bot,
        renderer: build_renderer(ext.template_dir.as_deref())?,
        catalog: catalog.clone(),
        ledger: Some(ledger.clone() as Arc<dyn Ledger>),
        clock: build_clock(ext.tz_offset_hours)?,
    };
    let options = FlowOptions {
        quick_amounts: ext.quick_amounts.clone(),
    };

    Ok(BotComponents {
        teloxide_bot,
        catalog,
        ledger,
        services,
        options,
    })
}

/// Engine over the components, with the configured idle timeout.
pub fn build_engine(config: &BotConfig, components: &BotComponents) -> Result<DialogueEngine> {
    let idle_timeout = config
        .extensions()
        .session_idle_timeout()
        .map(chrono::Duration::from_std)
        .transpose()
        .context("SESSION_IDLE_TIMEOUT_SECS out of range")?;
    Ok(
        DialogueEngine::new(components.services.clone(), components.options.clone())
            .with_idle_timeout(idle_timeout),
    )
}
