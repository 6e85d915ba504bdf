//! Application entry point for fa-search-bot.
//!
//! Initializes all components and starts the Discord bot and the watcher.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use dotenv::dotenv;
use fa_search_bot::api::SearchSource;
use fa_search_bot::api::fa_export_api::FaExportApi;
use fa_search_bot::bot::Bot;
use fa_search_bot::bot::Data;
use fa_search_bot::config::Config;
use fa_search_bot::logging::setup_logging;
use fa_search_bot::notify::discord_notifier::DiscordNotifier;
use fa_search_bot::repository::Repository;
use fa_search_bot::service::Services;
use fa_search_bot::task::subscription_watcher::SubscriptionWatcher;
use log::debug;
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let init_start = Instant::now();
    let config = load_config()?;
    let shutdown = CancellationToken::new();

    let db = setup_database(&config, init_start).await?;
    let services = setup_services(db).await?;
    let source: Arc<dyn SearchSource> = Arc::new(FaExportApi::new(
        &config.api_url,
        config.search_rate_per_minute,
    )?);

    let bot = Bot::new(&config);
    let watcher = SubscriptionWatcher::new(
        services.subscription.clone(),
        source.clone(),
        Arc::new(DiscordNotifier::new(bot.http.clone())),
        config.watcher_options(),
    );

    let bot_handle = bot.start(
        Data {
            service: services,
            source,
            watcher: watcher.clone(),
        },
        shutdown.clone(),
    );
    let watcher_handle = watcher.start(shutdown.clone());
    info!(
        "Watcher setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    run(init_start, shutdown, vec![bot_handle, watcher_handle]).await
}

fn load_config() -> Result<Config> {
    debug!("Loading configuration...");
    let mut config = Config::new();
    config.load()?;
    setup_logging(&config)?;
    info!("Starting fa-search-bot...");
    Ok(config)
}

async fn setup_database(config: &Config, init_start: Instant) -> Result<Arc<Repository>> {
    debug!("Setting up Database...");
    let db = Arc::new(Repository::new(&config.db_url, &config.db_path).await?);

    info!("Running database migrations...");
    db.run_migrations().await?;
    info!(
        "Database setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    Ok(db)
}

async fn setup_services(db: Arc<Repository>) -> Result<Arc<Services>> {
    debug!("Setting up Services...");
    Ok(Arc::new(Services::new(db).await?))
}

async fn run(
    init_start: Instant,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
) -> Result<()> {
    info!(
        "fa-search-bot is up in {:.2}s. Press Ctrl+C to stop.",
        init_start.elapsed().as_secs_f64()
    );

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down.");
    shutdown.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            log::error!("Task ended abnormally: {e}");
        }
    }
    Ok(())
}
