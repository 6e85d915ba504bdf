//! Looking up single submissions.

use log::warn;
use poise::ChoiceParameter;
use poise::Command;
use poise::CreateReply;

use crate::api::UserFolder;
use crate::api::error::ApiError;
use crate::bot::Data;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::views;
use crate::submission::SubmissionId;

#[derive(ChoiceParameter)]
enum Folder {
    Gallery,
    Scraps,
    Favorites,
}

impl From<&Folder> for UserFolder {
    fn from(value: &Folder) -> Self {
        match value {
            Folder::Gallery => UserFolder::Gallery,
            Folder::Scraps => UserFolder::Scraps,
            Folder::Favorites => UserFolder::Favorites,
        }
    }
}

pub struct SubmissionCog;

impl SubmissionCog {
    /// Show a submission from its link or id
    #[poise::command(slash_command, prefix_command)]
    pub async fn submission(
        ctx: Context<'_>,
        #[description = "Submission link or id"]
        #[rest]
        link: String,
    ) -> Result<(), Error> {
        let Some(id) = SubmissionId::parse_user_input(&link) else {
            ctx.say("Could not find a submission link or id in that message.")
                .await?;
            return Ok(());
        };

        ctx.defer().await?;
        match ctx.data().source.fetch_submission(id).await {
            Ok(full) => {
                ctx.send(CreateReply::default().embed(views::submission_embed(&full)))
                    .await?;
            }
            Err(ApiError::NotFound { .. }) => {
                ctx.say(format!("Submission {id} could not be found."))
                    .await?;
            }
            Err(err) => {
                warn!("Failed to fetch submission {id}: {err}");
                ctx.say("The export API is unavailable right now. Please try again later.")
                    .await?;
            }
        }
        Ok(())
    }

    /// List the latest submissions in a user's gallery, scraps or favorites
    #[poise::command(slash_command, prefix_command)]
    pub async fn folder(
        ctx: Context<'_>,
        #[description = "User name as in their profile link"] user: String,
        #[description = "Folder to list (default: gallery)"] folder: Option<Folder>,
    ) -> Result<(), Error> {
        let folder = folder.as_ref().map_or(UserFolder::Gallery, UserFolder::from);

        ctx.defer().await?;
        match ctx.data().source.user_folder(&user, folder, 1).await {
            Ok(results) => {
                ctx.say(views::folder_listing(&user, folder, &results))
                    .await?;
            }
            Err(ApiError::NotFound { .. }) => {
                ctx.say(format!("User \"{}\" could not be found.", user.trim()))
                    .await?;
            }
            Err(err) => {
                warn!("Failed to fetch {folder} of {user}: {err}");
                ctx.say("The export API is unavailable right now. Please try again later.")
                    .await?;
            }
        }
        Ok(())
    }
}

impl Cog for SubmissionCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::submission(), Self::folder()]
    }
}
