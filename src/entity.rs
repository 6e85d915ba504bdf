//! Rows stored in the database.

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use sqlx::FromRow;

use crate::subscription::Subscription;
use crate::subscription::Watermark;

/// A stored subscription.
///
/// The watermark is split over two nullable columns: `latest_id` once a
/// submission has been seen, `latest_polled_at` while the query has only
/// returned empty pages. See [`Watermark::from_columns`].
#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct SubscriptionModel {
    #[serde(default)]
    pub id: i32,
    /// Normalized search query
    #[serde(default)]
    pub query: String,
    /// Discord channel snowflake
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub destination: u64,
    #[serde(default)]
    pub latest_id: Option<i64>,
    #[serde(default)]
    pub latest_polled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub flagged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl From<&Subscription> for SubscriptionModel {
    fn from(sub: &Subscription) -> Self {
        Self {
            id: 0,
            query: sub.query.clone(),
            destination: sub.destination,
            latest_id: sub.latest_update.latest_id_column(),
            latest_polled_at: sub.latest_update.polled_at_column(),
            flagged_at: sub.flagged_at,
            created_at: sub.created_at,
        }
    }
}

impl From<SubscriptionModel> for Subscription {
    fn from(model: SubscriptionModel) -> Self {
        Self {
            latest_update: Watermark::from_columns(model.latest_id, model.latest_polled_at),
            query: model.query,
            destination: model.destination,
            flagged_at: model.flagged_at,
            created_at: model.created_at,
        }
    }
}
