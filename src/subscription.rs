//! Subscriptions: a saved search query bound to a chat destination.

use chrono::DateTime;
use chrono::Utc;

pub mod delta;
pub mod registry;
pub mod watermark;

pub use registry::RegistryError;
pub use registry::SubscriptionRegistry;
pub use watermark::Watermark;

/// Identity of a subscription. Two subscriptions are the same iff their keys
/// are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionKey {
    pub query: String,
    pub destination: u64,
}

impl SubscriptionKey {
    /// Builds a key from user input. Returns `None` when the query is blank.
    pub fn new(query: &str, destination: u64) -> Option<Self> {
        normalize_query(query).map(|query| Self { query, destination })
    }
}

impl std::fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" -> {}", self.query, self.destination)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub query: String,
    pub destination: u64,
    pub latest_update: Watermark,
    /// Set when the destination turned out to be unreachable for good.
    pub flagged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(key: SubscriptionKey) -> Self {
        Self {
            query: key.query,
            destination: key.destination,
            latest_update: Watermark::Unset,
            flagged_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey {
            query: self.query.clone(),
            destination: self.destination,
        }
    }

    pub fn is_flagged(&self) -> bool {
        self.flagged_at.is_some()
    }
}

/// Trims, collapses inner whitespace and lowercases a query.
///
/// Returns `None` if nothing is left.
pub fn normalize_query(query: &str) -> Option<String> {
    let normalized = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
