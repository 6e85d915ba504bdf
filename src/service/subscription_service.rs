//! Subscription management service.
//!
//! Holds the in-memory [`SubscriptionRegistry`] behind one lock and writes
//! every change through to the database before applying it in memory, so a
//! failed write leaves both sides untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use log::debug;
use log::info;
use log::warn;
use sqlx::error::ErrorKind;
use tokio::sync::Mutex;

use crate::entity::SubscriptionModel;
use crate::repository::Repository;
use crate::repository::error::DatabaseError;
use crate::repository::table::Table;
use crate::service::error::ServiceError;
use crate::subscription::Subscription;
use crate::subscription::SubscriptionKey;
use crate::subscription::SubscriptionRegistry;
use crate::subscription::Watermark;

/// Service for managing subscriptions and their watermarks.
pub struct SubscriptionService {
    db: Arc<Repository>,
    registry: Mutex<SubscriptionRegistry>,
}

impl SubscriptionService {
    /// Creates the service and loads every stored subscription.
    ///
    /// # Performance
    /// * DB calls: 1
    pub async fn new(db: Arc<Repository>) -> Result<Self, ServiceError> {
        let rows = db.subscription.select_all().await?;
        let registry =
            SubscriptionRegistry::from_subscriptions(rows.into_iter().map(Subscription::from));
        info!("Loaded {} subscriptions.", registry.len());
        Ok(Self {
            db,
            registry: Mutex::new(registry),
        })
    }

    /// # Performance
    /// * DB calls: 1
    pub async fn add(&self, destination: u64, query: &str) -> Result<Subscription, ServiceError> {
        let key = SubscriptionKey::new(query, destination).ok_or(ServiceError::BlankQuery)?;
        let mut registry = self.registry.lock().await;

        if registry.contains(&key) {
            return Err(ServiceError::DuplicateSubscription {
                query: key.query,
                destination,
            });
        }

        let subscription = Subscription::new(key.clone());
        // DB 1
        if let Err(err) = self
            .db
            .subscription
            .insert(&SubscriptionModel::from(&subscription))
            .await
        {
            if is_unique_violation(&err) {
                warn!("Subscription {key} exists in db but not in memory.");
                return Err(ServiceError::DuplicateSubscription {
                    query: key.query,
                    destination,
                });
            }
            return Err(err.into());
        }

        registry.add(subscription.clone())?;
        info!("Added subscription {key}.");
        Ok(subscription)
    }

    /// # Performance
    /// * DB calls: 1
    pub async fn remove(&self, destination: u64, query: &str) -> Result<Subscription, ServiceError> {
        let Some(key) = SubscriptionKey::new(query, destination) else {
            return Err(ServiceError::NotFound {
                query: query.trim().to_string(),
                destination,
            });
        };
        let mut registry = self.registry.lock().await;

        if !registry.contains(&key) {
            return Err(ServiceError::NotFound {
                query: key.query,
                destination,
            });
        }

        // DB 1
        self.db
            .subscription
            .delete_by_key(&key.query, destination)
            .await?;
        let removed = registry.remove(&key)?;
        info!("Removed subscription {key}.");
        Ok(removed)
    }

    /// Queries subscribed by a destination, alphabetically.
    pub async fn list(&self, destination: u64) -> Vec<String> {
        self.list_subscriptions(destination)
            .await
            .into_iter()
            .map(|sub| sub.query)
            .collect()
    }

    pub async fn list_subscriptions(&self, destination: u64) -> Vec<Subscription> {
        self.registry
            .lock()
            .await
            .list_for_destination(destination)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Snapshot of active subscriptions grouped by query.
    pub async fn group_by_query(&self) -> BTreeMap<String, Vec<Subscription>> {
        self.registry.lock().await.group_by_query()
    }

    pub async fn get(&self, key: &SubscriptionKey) -> Option<Subscription> {
        self.registry.lock().await.get(key).cloned()
    }

    /// Whether `sub` is still the live subscription for its key, and not a
    /// later one added under the same query and destination.
    pub async fn is_current(&self, sub: &Subscription) -> bool {
        self.get(&sub.key())
            .await
            .is_some_and(|live| live.created_at == sub.created_at)
    }

    pub async fn count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Merges `watermark` into the stored one of `sub`.
    ///
    /// Returns the resulting watermark, or `None` if `sub` was removed in the
    /// meantime. A subscription re-added under the same key is left untouched.
    ///
    /// # Performance
    /// * DB calls: 0 or 1
    pub async fn advance_watermark(
        &self,
        sub: &Subscription,
        watermark: Watermark,
    ) -> Result<Option<Watermark>, ServiceError> {
        let key = sub.key();
        let mut registry = self.registry.lock().await;
        let Some(current) = live(&registry, sub).map(|current| current.latest_update) else {
            debug!("Subscription {key} is gone, dropping watermark {watermark}.");
            return Ok(None);
        };

        let merged = current.merge(watermark);
        if merged == current {
            return Ok(Some(current));
        }

        // DB 1
        self.db
            .subscription
            .update_watermark(
                &key.query,
                key.destination,
                merged.latest_id_column(),
                merged.polled_at_column(),
            )
            .await?;
        debug!("Watermark of {key}: {current} -> {merged}");
        Ok(registry.advance_watermark(&key, merged))
    }

    /// Marks `sub` for operator review; the watcher skips it from then on.
    /// Returns `false` if it is no longer tracked.
    ///
    /// # Performance
    /// * DB calls: 0 or 1
    pub async fn flag_for_review(&self, sub: &Subscription) -> Result<bool, ServiceError> {
        let key = sub.key();
        let mut registry = self.registry.lock().await;
        let Some(current) = live(&registry, sub) else {
            return Ok(false);
        };
        if current.is_flagged() {
            return Ok(true);
        }

        let now = Utc::now();
        // DB 1
        self.db
            .subscription
            .update_flagged_at(&key.query, key.destination, Some(now))
            .await?;
        warn!("Flagged subscription {key} for review.");
        Ok(registry.flag(&key, now))
    }
}

/// The tracked subscription with the key of `sub`, if it is the same one.
fn live<'a>(registry: &'a SubscriptionRegistry, sub: &Subscription) -> Option<&'a Subscription> {
    registry
        .get(&sub.key())
        .filter(|live| live.created_at == sub.created_at)
}

fn is_unique_violation(err: &DatabaseError) -> bool {
    let DatabaseError::BackendError(sqlx_err) = err;
    sqlx_err
        .as_database_error()
        .is_some_and(|db_err| matches!(db_err.kind(), ErrorKind::UniqueViolation))
}
