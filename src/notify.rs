//! Outbound notifications to chat destinations.

use async_trait::async_trait;

use crate::notify::error::DeliveryError;
use crate::submission::SearchResult;

pub mod discord_notifier;
pub mod dispatcher;
pub mod error;

/// A new search result for a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub query: String,
    pub result: SearchResult,
}

impl Notification {
    pub fn new(query: impl Into<String>, result: SearchResult) -> Self {
        Self {
            query: query.into(),
            result,
        }
    }

    /// First line of the message, naming the subscription.
    pub fn heading(&self) -> String {
        format!("Update on \"{}\" subscription:", self.query)
    }

    /// Plain text rendering of the notification.
    pub fn text(&self) -> String {
        format!("{}\n{}", self.heading(), self.result.link())
    }
}

/// Sends messages to chat destinations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one search result notification.
    async fn send_result(
        &self,
        destination: u64,
        notification: &Notification,
    ) -> Result<(), DeliveryError>;

    /// Sends a plain text notice, used for operator messages.
    async fn send_notice(&self, destination: u64, text: &str) -> Result<(), DeliveryError>;
}
