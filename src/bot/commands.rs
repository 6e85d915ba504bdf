use poise::Command;

use crate::bot::Data;

pub mod general_cog;
pub mod submission_cog;
pub mod subscription_cog;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub use general_cog::GeneralCog;
pub use submission_cog::SubmissionCog;
pub use subscription_cog::SubscriptionCog;

pub trait Cog {
    fn commands(&self) -> Vec<Command<Data, Error>>;
}

pub struct Cogs;

impl Cog for Cogs {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        SubscriptionCog
            .commands()
            .into_iter()
            .chain(SubmissionCog.commands())
            .chain(GeneralCog.commands())
            .collect()
    }
}
