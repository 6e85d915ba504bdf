//! In-memory registry of subscriptions, keyed by query and destination.

use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::DateTime;
use chrono::Utc;

use super::Subscription;
use super::SubscriptionKey;
use super::Watermark;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("A subscription for \"{query}\" already exists for destination {destination}.")]
    DuplicateSubscription { query: String, destination: u64 },

    #[error("There is no subscription for \"{query}\" for destination {destination}.")]
    NotFound { query: String, destination: u64 },
}

/// In-memory set of subscriptions, unique by (query, destination).
#[derive(Debug, Default, Clone)]
pub struct SubscriptionRegistry {
    subscriptions: HashMap<SubscriptionKey, Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from stored rows. Later duplicates keep the furthest
    /// watermark.
    pub fn from_subscriptions(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let mut registry = Self::new();
        for sub in subscriptions {
            match registry.subscriptions.get_mut(&sub.key()) {
                Some(existing) => {
                    existing.latest_update = existing.latest_update.merge(sub.latest_update);
                }
                None => {
                    registry.subscriptions.insert(sub.key(), sub);
                }
            }
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn contains(&self, key: &SubscriptionKey) -> bool {
        self.subscriptions.contains_key(key)
    }

    pub fn get(&self, key: &SubscriptionKey) -> Option<&Subscription> {
        self.subscriptions.get(key)
    }

    pub fn add(&mut self, subscription: Subscription) -> Result<&Subscription, RegistryError> {
        let key = subscription.key();
        if self.subscriptions.contains_key(&key) {
            return Err(RegistryError::DuplicateSubscription {
                query: key.query,
                destination: key.destination,
            });
        }
        Ok(self.subscriptions.entry(key).or_insert(subscription))
    }

    pub fn remove(&mut self, key: &SubscriptionKey) -> Result<Subscription, RegistryError> {
        self.subscriptions
            .remove(key)
            .ok_or_else(|| RegistryError::NotFound {
                query: key.query.clone(),
                destination: key.destination,
            })
    }

    /// Subscriptions of one destination, sorted by query.
    pub fn list_for_destination(&self, destination: u64) -> Vec<&Subscription> {
        let mut subs: Vec<&Subscription> = self
            .subscriptions
            .values()
            .filter(|sub| sub.destination == destination)
            .collect();
        subs.sort_by(|a, b| a.query.cmp(&b.query));
        subs
    }

    /// Active subscriptions grouped by their query, so each query is searched
    /// once per cycle. Flagged subscriptions are left out.
    pub fn group_by_query(&self) -> BTreeMap<String, Vec<Subscription>> {
        let mut groups: BTreeMap<String, Vec<Subscription>> = BTreeMap::new();
        for sub in self.subscriptions.values().filter(|sub| !sub.is_flagged()) {
            groups.entry(sub.query.clone()).or_default().push(sub.clone());
        }
        for subs in groups.values_mut() {
            subs.sort_by_key(|sub| sub.destination);
        }
        groups
    }

    /// Merges `watermark` into the subscription's current one.
    ///
    /// Returns the resulting watermark, or `None` if the subscription is no
    /// longer tracked.
    pub fn advance_watermark(
        &mut self,
        key: &SubscriptionKey,
        watermark: Watermark,
    ) -> Option<Watermark> {
        let sub = self.subscriptions.get_mut(key)?;
        sub.latest_update = sub.latest_update.merge(watermark);
        Some(sub.latest_update)
    }

    /// Marks a subscription for operator review. Returns `false` if it is not
    /// tracked.
    pub fn flag(&mut self, key: &SubscriptionKey, at: DateTime<Utc>) -> bool {
        match self.subscriptions.get_mut(key) {
            Some(sub) => {
                sub.flagged_at.get_or_insert(at);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::SubmissionId;

    fn sub(query: &str, destination: u64) -> Subscription {
        Subscription::new(SubscriptionKey::new(query, destination).unwrap())
    }

    fn key(query: &str, destination: u64) -> SubscriptionKey {
        SubscriptionKey::new(query, destination).unwrap()
    }

    #[test]
    fn test_add_duplicate_is_rejected() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(sub("dragon", 42)).unwrap();

        let err = registry.add(sub("Dragon", 42)).unwrap_err();

        assert_eq!(
            err,
            RegistryError::DuplicateSubscription {
                query: "dragon".to_string(),
                destination: 42
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_requires_exact_match() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(sub("dragon", 42)).unwrap();

        let err = registry.remove(&key("dragon", 99)).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { destination: 99, .. }));
        assert_eq!(registry.len(), 1);

        let removed = registry.remove(&key("dragon", 42)).unwrap();
        assert_eq!(removed.destination, 42);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_for_destination_is_alphabetical() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(sub("zebra", 42)).unwrap();
        registry.add(sub("apple", 42)).unwrap();
        registry.add(sub("mango", 7)).unwrap();

        let queries: Vec<&str> = registry
            .list_for_destination(42)
            .iter()
            .map(|s| s.query.as_str())
            .collect();

        assert_eq!(queries, vec!["apple", "zebra"]);
    }

    #[test]
    fn test_group_by_query_batches_destinations() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(sub("dragon", 2)).unwrap();
        registry.add(sub("dragon", 1)).unwrap();
        registry.add(sub("deer", 1)).unwrap();
        registry.add(sub("fox", 3)).unwrap();
        registry.flag(&key("fox", 3), Utc::now());

        let groups = registry.group_by_query();

        assert_eq!(groups.len(), 2);
        let dests: Vec<u64> = groups["dragon"].iter().map(|s| s.destination).collect();
        assert_eq!(dests, vec![1, 2]);
        assert_eq!(groups["deer"].len(), 1);
        assert!(!groups.contains_key("fox"));
    }

    #[test]
    fn test_advance_watermark_is_monotonic_and_per_subscription() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(sub("dragon", 1)).unwrap();
        registry.add(sub("dragon", 2)).unwrap();

        let high = Watermark::Submission(SubmissionId(105));
        let low = Watermark::Submission(SubmissionId(101));
        assert_eq!(registry.advance_watermark(&key("dragon", 1), high), Some(high));
        assert_eq!(registry.advance_watermark(&key("dragon", 1), low), Some(high));

        assert_eq!(
            registry.get(&key("dragon", 2)).unwrap().latest_update,
            Watermark::Unset
        );
        assert_eq!(registry.advance_watermark(&key("dragon", 3), high), None);
    }

    #[test]
    fn test_from_subscriptions_keeps_furthest_watermark() {
        let mut a = sub("dragon", 1);
        a.latest_update = Watermark::Submission(SubmissionId(5));
        let mut b = sub("dragon", 1);
        b.latest_update = Watermark::Submission(SubmissionId(9));

        let registry = SubscriptionRegistry::from_subscriptions(vec![b, a]);

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get(&key("dragon", 1)).unwrap().latest_update,
            Watermark::Submission(SubmissionId(9))
        );
    }
}
