//! Commands managing the subscriptions of a chat.

use poise::Command;

use crate::bot::Data;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::views;
use crate::service::error::ServiceError;

pub struct SubscriptionCog;

impl SubscriptionCog {
    /// Subscribe this chat to new results of a search query
    #[poise::command(slash_command, prefix_command)]
    pub async fn add_subscription(
        ctx: Context<'_>,
        #[description = "Search query to watch"]
        #[rest]
        query: Option<String>,
    ) -> Result<(), Error> {
        let destination = ctx.channel_id().get();
        let service = &ctx.data().service.subscription;
        let query = query.unwrap_or_default();

        match service.add(destination, &query).await {
            Ok(sub) => {
                let queries = service.list(destination).await;
                ctx.say(views::added_reply(&sub.query, &queries)).await?;
            }
            Err(err @ (ServiceError::BlankQuery | ServiceError::DuplicateSubscription { .. })) => {
                ctx.say(err.to_string()).await?;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    /// Remove a subscription from this chat
    #[poise::command(slash_command, prefix_command)]
    pub async fn remove_subscription(
        ctx: Context<'_>,
        #[description = "Search query to stop watching"]
        #[rest]
        query: Option<String>,
    ) -> Result<(), Error> {
        let destination = ctx.channel_id().get();
        let service = &ctx.data().service.subscription;
        let query = query.unwrap_or_default();

        match service.remove(destination, &query).await {
            Ok(sub) => {
                let queries = service.list(destination).await;
                ctx.say(views::removed_reply(&sub.query, &queries)).await?;
            }
            Err(err @ ServiceError::NotFound { .. }) => {
                ctx.say(err.to_string()).await?;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    /// List the subscriptions of this chat
    #[poise::command(slash_command, prefix_command)]
    pub async fn list_subscriptions(ctx: Context<'_>) -> Result<(), Error> {
        let queries = ctx
            .data()
            .service
            .subscription
            .list(ctx.channel_id().get())
            .await;
        ctx.say(views::subscription_list(&queries)).await?;
        Ok(())
    }
}

impl Cog for SubscriptionCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![
            Self::add_subscription(),
            Self::remove_subscription(),
            Self::list_subscriptions(),
        ]
    }
}
