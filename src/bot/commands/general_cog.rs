use poise::Command;

use crate::bot::Data;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::views;

pub struct GeneralCog;

impl GeneralCog {
    /// Say hello and explain what the bot does
    #[poise::command(slash_command, prefix_command)]
    pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
        ctx.say(views::welcome_text()).await?;
        Ok(())
    }

    /// Check that the bot is alive
    #[poise::command(slash_command, prefix_command)]
    pub async fn beep(ctx: Context<'_>) -> Result<(), Error> {
        ctx.say("boop").await?;
        Ok(())
    }

    /// Show information about the bot
    #[poise::command(slash_command, prefix_command)]
    pub async fn about(ctx: Context<'_>) -> Result<(), Error> {
        let snapshot = ctx.data().watcher.snapshot().await;
        ctx.say(views::about_text(&snapshot)).await?;
        Ok(())
    }
}

impl Cog for GeneralCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::start(), Self::beep(), Self::about()]
    }
}
