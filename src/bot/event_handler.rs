//! Gateway events handled outside of commands.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use log::info;
use log::warn;
use poise::serenity_prelude::Context;
use poise::serenity_prelude::CreateMessage;
use poise::serenity_prelude::EventHandler;
use poise::serenity_prelude::Message;
use poise::serenity_prelude::Ready;

use crate::api::SearchSource;
use crate::api::error::ApiError;
use crate::bot::PREFIX;
use crate::bot::views;
use crate::submission::SubmissionId;

/// Replies to plain messages containing submission links with a neat embed.
pub struct BotEventHandler {
    source: Arc<dyn SearchSource>,
}

impl BotEventHandler {
    pub fn new(source: Arc<dyn SearchSource>) -> Self {
        Self { source }
    }

    async fn neaten(&self, ctx: &Context, message: &Message, id: SubmissionId) {
        debug!("Found a link to {id} in message {}", message.id);
        let reply = match self.source.fetch_submission(id).await {
            Ok(full) => CreateMessage::new()
                .embed(views::submission_embed(&full))
                .reference_message(message),
            // Errors are only worth a reply in direct messages.
            Err(err) if message.guild_id.is_some() => {
                debug!("Not neatening {id}: {err}");
                return;
            }
            Err(ApiError::NotFound { .. }) => CreateMessage::new()
                .content(format!("This doesn't seem to be a valid submission: {id}"))
                .reference_message(message),
            Err(err) => {
                warn!("Failed to fetch linked submission {id}: {err}");
                return;
            }
        };

        if let Err(e) = message.channel_id.send_message(ctx, reply).await {
            warn!("Failed to reply to message {}: {e}", message.id);
        }
    }
}

#[async_trait]
impl EventHandler for BotEventHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Gateway session ready for {}.", ready.user.name);
    }

    async fn message(&self, ctx: Context, new_message: Message) {
        let ids = links_to_neaten(&new_message.content, new_message.author.bot);
        for id in ids {
            self.neaten(&ctx, &new_message, id).await;
        }
    }
}

/// Submissions linked in a message that should get a neat reply.
///
/// Bots and commands are left alone.
pub fn links_to_neaten(content: &str, from_bot: bool) -> Vec<SubmissionId> {
    if from_bot || content.trim_start().starts_with(PREFIX) {
        return Vec::new();
    }
    SubmissionId::find_all_in(content)
}
