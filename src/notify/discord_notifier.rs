//! Notifier sending embeds to Discord channels.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serenity::all::ChannelId;
use serenity::all::CreateEmbed;
use serenity::all::CreateEmbedAuthor;
use serenity::all::CreateMessage;
use serenity::all::Http;

use crate::notify::Notification;
use crate::notify::Notifier;
use crate::notify::error::DeliveryError;

pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        debug!("Initializing DiscordNotifier.");
        Self { http }
    }

    async fn send(&self, destination: u64, message: CreateMessage) -> Result<(), DeliveryError> {
        if destination == 0 {
            return Err(DeliveryError::DestinationInvalid {
                destination,
                message: "channel id 0".to_string(),
            });
        }
        ChannelId::new(destination)
            .send_message(&*self.http, message)
            .await
            .map(|_| ())
            .map_err(|err| classify_error(destination, err))
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send_result(
        &self,
        destination: u64,
        notification: &Notification,
    ) -> Result<(), DeliveryError> {
        let message = CreateMessage::new()
            .content(notification.text())
            .embed(result_embed(notification));
        self.send(destination, message).await
    }

    async fn send_notice(&self, destination: u64, text: &str) -> Result<(), DeliveryError> {
        self.send(destination, CreateMessage::new().content(text))
            .await
    }
}

fn result_embed(notification: &Notification) -> CreateEmbed {
    let result = &notification.result;
    CreateEmbed::new()
        .title(&result.title)
        .url(result.link())
        .image(&result.thumbnail_url)
        .author(CreateEmbedAuthor::new(&result.author.name).url(result.author.link()))
}

/// Forbidden and unknown-channel responses mean the channel is gone for us.
fn classify_error(destination: u64, err: serenity::Error) -> DeliveryError {
    let status = match &err {
        serenity::Error::Http(http_err) => http_err.status_code().map(|s| s.as_u16()),
        _ => None,
    };
    match status {
        Some(403) | Some(404) => DeliveryError::DestinationInvalid {
            destination,
            message: err.to_string(),
        },
        _ => DeliveryError::DeliveryFailed {
            destination,
            message: err.to_string(),
        },
    }
}
