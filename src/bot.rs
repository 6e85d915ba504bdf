//! Discord chat layer.

pub mod commands;
pub mod error_handler;
pub mod event_handler;
pub mod views;

use std::sync::Arc;

use log::error;
use log::info;
use poise::Framework;
use poise::FrameworkOptions;
use poise::serenity_prelude::ClientBuilder;
use poise::serenity_prelude::GatewayIntents;
use poise::serenity_prelude::Http;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::SearchSource;
use crate::bot::commands::Cog;
use crate::bot::commands::Cogs;
use crate::bot::commands::Error;
use crate::bot::error_handler::ErrorHandler;
use crate::bot::event_handler::BotEventHandler;
use crate::config::Config;
use crate::service::Services;
use crate::task::subscription_watcher::SubscriptionWatcher;

/// Prefix of text commands.
pub const PREFIX: &str = "/";

pub struct Data {
    pub service: Arc<Services>,
    pub source: Arc<dyn SearchSource>,
    pub watcher: Arc<SubscriptionWatcher>,
}

pub struct Bot {
    pub http: Arc<Http>,
    token: String,
}

impl Bot {
    pub fn new(config: &Config) -> Self {
        info!("Initializing bot...");
        Self {
            http: Arc::new(Http::new(&config.discord_token)),
            token: config.discord_token.clone(),
        }
    }

    /// Connects to Discord and serves commands until `shutdown` is cancelled.
    pub fn start(&self, data: Data, shutdown: CancellationToken) -> JoinHandle<()> {
        info!("Starting bot client...");
        let event_handler = BotEventHandler::new(data.source.clone());
        let framework = Self::create_framework(data);
        let token = self.token.clone();
        // Message content is read to neaten submission links.
        let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;

        tokio::spawn(async move {
            info!("Connecting bot to Discord...");
            let mut client = match ClientBuilder::new(&token, intents)
                .event_handler(event_handler)
                .framework(framework)
                .await
            {
                Ok(client) => client,
                Err(e) => {
                    error!("Failed to build Discord client: {e}");
                    return;
                }
            };
            let shard_manager = client.shard_manager.clone();

            tokio::select! {
                res = client.start() => {
                    if let Err(e) = res {
                        error!("Bot client crashed: {e}");
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Shutting down bot client.");
                    shard_manager.shutdown_all().await;
                }
            }
        })
    }

    fn create_framework(data: Data) -> Framework<Data, Error> {
        let options = FrameworkOptions::<Data, Error> {
            commands: Cogs.commands(),
            on_error: |error| Box::pin(ErrorHandler::handle(error)),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(PREFIX.into()),
                ..Default::default()
            },
            ..Default::default()
        };

        Framework::builder()
            .options(options)
            .setup(move |ctx, ready, framework| {
                Box::pin(async move {
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                    info!("Bot connected to Discord as {}.", ready.user.name);
                    Ok(data)
                })
            })
            .build()
    }
}
