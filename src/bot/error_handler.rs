//! Error handling for Discord bot commands.

use log::error;
use poise::FrameworkError;

use crate::api::error::ApiError;
use crate::bot::Data;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::service::error::ServiceError;

/// Handles framework errors and sends appropriate responses to users.
pub struct ErrorHandler;

impl ErrorHandler {
    pub async fn handle(error: FrameworkError<'_, Data, Error>) {
        match error {
            FrameworkError::Command { error, ctx, .. } => {
                let message = Self::classify_error(&error, &ctx);
                if let Err(e) = ctx.say(message).await {
                    error!("Failed to send error reply: {e}");
                }
            }
            FrameworkError::ArgumentParse { error, ctx, .. } => {
                let message = format!(
                    "Invalid arguments for `/{}`: {}",
                    ctx.command().name,
                    error
                );
                if let Err(e) = ctx.say(message).await {
                    error!("Failed to send error reply: {e}");
                }
            }
            error => {
                if let Err(e) = poise::builtins::on_error(error).await {
                    error!("Error while handling error: {}", e);
                }
            }
        }
    }

    fn classify_error(error: &Error, ctx: &Context<'_>) -> String {
        if let Some(service_error) = error.downcast_ref::<ServiceError>() {
            if !matches!(service_error, ServiceError::DatabaseError(_)) {
                return service_error.to_string();
            }
        } else if let Some(api_error) = error.downcast_ref::<ApiError>() {
            return api_error.to_string();
        }
        error!(
            "Unexpected error in command `{}`: {:?}",
            ctx.command().name,
            error
        );
        "An unexpected error occurred. Please try again later.".to_string()
    }
}
