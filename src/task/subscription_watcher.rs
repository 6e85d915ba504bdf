//! Background task polling the export API for new submissions.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use derive_builder::Builder;
use futures::StreamExt;
use futures::future::join_all;
use futures::stream;
use log::debug;
use log::error;
use log::info;
use log::warn;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::api::SearchSource;
use crate::api::error::ApiError;
use crate::notify::Notifier;
use crate::notify::dispatcher::DeliveryReport;
use crate::notify::dispatcher::Dispatcher;
use crate::notify::error::DeliveryError;
use crate::service::subscription_service::SubscriptionService;
use crate::submission::SearchResult;
use crate::submission::SubmissionId;
use crate::subscription::Subscription;
use crate::subscription::SubscriptionKey;
use crate::subscription::Watermark;
use crate::subscription::delta::advance_past;
use crate::subscription::delta::compute_delta;
use crate::subscription::delta::normalize_page;

#[derive(Builder, Clone, Debug)]
#[builder(pattern = "immutable")]
pub struct WatcherOptions {
    #[builder(default = "Duration::from_secs(30)")]
    pub poll_interval: Duration,
    /// Searches in flight at once.
    #[builder(default = "4")]
    pub search_concurrency: usize,
    #[builder(default = "Duration::from_secs(20)")]
    pub search_timeout: Duration,
    /// Consecutive failures before a query is escalated, and failed attempts
    /// before a single notification is given up on.
    #[builder(default = "5")]
    pub failure_threshold: u32,
    /// Channel receiving escalations and give-up reports.
    #[builder(default)]
    pub operator_destination: Option<u64>,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            search_concurrency: 4,
            search_timeout: Duration::from_secs(20),
            failure_threshold: 5,
            operator_destination: None,
        }
    }
}

/// Point-in-time diagnostics of the watcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherSnapshot {
    pub tracked_subscriptions: usize,
    pub last_success: BTreeMap<String, DateTime<Utc>>,
    pub consecutive_failures: BTreeMap<String, u32>,
    /// Failed notifications still waiting for another attempt.
    pub pending_retries: usize,
}

/// Counters of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub searched: usize,
    pub failed_searches: usize,
    pub delivered: usize,
    pub failed_deliveries: usize,
    pub cancelled: bool,
}

#[derive(Default)]
struct WatcherState {
    consecutive_failures: HashMap<String, u32>,
    last_success: HashMap<String, DateTime<Utc>>,
    item_failures: HashMap<(SubscriptionKey, SubmissionId), u32>,
}

/// New results of one subscription waiting to be sent.
struct PendingBatch {
    /// The subscription as it was when the cycle started.
    sub: Subscription,
    results: Vec<SearchResult>,
}

#[derive(Default)]
struct BatchCounts {
    delivered: usize,
    failed: usize,
}

/// Task that periodically searches every subscribed query and notifies
/// destinations about new results.
pub struct SubscriptionWatcher {
    service: Arc<SubscriptionService>,
    source: Arc<dyn SearchSource>,
    dispatcher: Dispatcher,
    options: WatcherOptions,
    state: Mutex<WatcherState>,
    cycle: AtomicU64,
}

impl SubscriptionWatcher {
    pub fn new(
        service: Arc<SubscriptionService>,
        source: Arc<dyn SearchSource>,
        notifier: Arc<dyn Notifier>,
        options: WatcherOptions,
    ) -> Arc<Self> {
        info!(
            "Initializing SubscriptionWatcher with poll interval {:?}",
            options.poll_interval
        );
        Arc::new(Self {
            service,
            source,
            dispatcher: Dispatcher::new(notifier),
            options,
            state: Mutex::new(WatcherState::default()),
            cycle: AtomicU64::new(0),
        })
    }

    /// Starts the polling loop. It runs until `token` is cancelled.
    pub fn start(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        info!("Starting SubscriptionWatcher check loop.");
        let mut interval = tokio::time::interval(self.options.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                self.run_cycle(&token).await;
            }
            info!("Stopped SubscriptionWatcher check loop.");
        })
    }

    /// Runs a single poll cycle.
    pub async fn run_cycle(&self, token: &CancellationToken) -> CycleSummary {
        let cycle = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        let span = tracing::info_span!("watcher_cycle", cycle);
        self.check_subscriptions(token).instrument(span).await
    }

    pub async fn snapshot(&self) -> WatcherSnapshot {
        let tracked_subscriptions = self.service.count().await;
        let state = self.state.lock().await;
        WatcherSnapshot {
            tracked_subscriptions,
            last_success: state
                .last_success
                .iter()
                .map(|(query, at)| (query.clone(), *at))
                .collect(),
            consecutive_failures: state
                .consecutive_failures
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(query, count)| (query.clone(), *count))
                .collect(),
            pending_retries: state.item_failures.len(),
        }
    }

    async fn check_subscriptions(&self, token: &CancellationToken) -> CycleSummary {
        let mut summary = CycleSummary::default();
        if token.is_cancelled() {
            summary.cancelled = true;
            return summary;
        }

        let groups = self.service.group_by_query().await;
        self.forget_untracked(&groups).await;
        if groups.is_empty() {
            debug!("No subscriptions to check.");
            return summary;
        }
        debug!("Checking {} queries.", groups.len());

        let pages: Vec<(String, Option<Result<Vec<SearchResult>, ApiError>>)> =
            stream::iter(groups.keys().cloned())
                .map(|query| async move {
                    if token.is_cancelled() {
                        return (query, None);
                    }
                    let page = self.search(&query).await;
                    (query, Some(page))
                })
                .buffer_unordered(self.options.search_concurrency.max(1))
                .collect()
                .await;

        let mut deliveries: BTreeMap<u64, Vec<PendingBatch>> = BTreeMap::new();
        for (query, page) in pages {
            let Some(page) = page else {
                summary.cancelled = true;
                continue;
            };
            summary.searched += 1;
            let page = match page {
                Ok(page) => {
                    self.record_success(&query).await;
                    page
                }
                Err(err) => {
                    summary.failed_searches += 1;
                    self.record_failure(&query, &err).await;
                    continue;
                }
            };

            let (page, fixed) = normalize_page(page);
            if fixed {
                warn!("Results for \"{query}\" were not in descending order. Re-sorted.");
            }

            let subs = groups.get(&query).map(Vec::as_slice).unwrap_or_default();
            for sub in subs {
                if let Some(batch) = self.plan_subscription(sub, &page).await {
                    deliveries.entry(sub.destination).or_default().push(batch);
                }
            }
        }

        if !deliveries.is_empty() {
            let outcomes = join_all(
                deliveries
                    .into_iter()
                    .map(|(destination, batches)| self.deliver_to(destination, batches, token)),
            )
            .await;
            for counts in outcomes {
                summary.delivered += counts.delivered;
                summary.failed_deliveries += counts.failed;
            }
        }
        if token.is_cancelled() {
            summary.cancelled = true;
        }

        info!(
            "Cycle finished: {} searched, {} failed searches, {} sent, {} failed sends.",
            summary.searched, summary.failed_searches, summary.delivered, summary.failed_deliveries
        );
        summary
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ApiError> {
        let timeout = self.options.search_timeout;
        match tokio::time::timeout(timeout, self.source.search(query, 1)).await {
            Ok(page) => page,
            Err(_) => Err(ApiError::Timeout {
                secs: timeout.as_secs(),
            }),
        }
    }

    /// Commits what needs no delivery and returns the results to send, if any.
    async fn plan_subscription(
        &self,
        sub: &Subscription,
        page: &[SearchResult],
    ) -> Option<PendingBatch> {
        let key = sub.key();
        let delta = compute_delta(sub.latest_update, page, Utc::now());

        if delta.baseline {
            info!("Baseline for {key} set to {}", delta.watermark);
            self.commit(sub, delta.watermark).await;
            return None;
        }
        if delta.new_results.is_empty() {
            if delta.watermark != sub.latest_update {
                self.commit(sub, delta.watermark).await;
            }
            return None;
        }
        if delta.possible_gap {
            warn!(
                "Every result on the page for {key} is new. Older results may have been missed."
            );
        }

        debug!("{} new results for {key}", delta.new_results.len());
        Some(PendingBatch {
            sub: sub.clone(),
            results: delta.new_results,
        })
    }

    /// Sends the batches of one destination, one after another.
    async fn deliver_to(
        &self,
        destination: u64,
        batches: Vec<PendingBatch>,
        token: &CancellationToken,
    ) -> BatchCounts {
        let mut counts = BatchCounts::default();
        for batch in batches {
            if token.is_cancelled() {
                debug!("Cancelled before sending to {destination}.");
                break;
            }
            if !self.service.is_current(&batch.sub).await {
                debug!("Subscription {} was removed or replaced. Skipping.", batch.sub.key());
                continue;
            }

            let report = self
                .dispatcher
                .dispatch(destination, &batch.sub.query, &batch.results)
                .await;
            counts.delivered += report.delivered.len();
            counts.failed += report.failed.len();

            let destination_invalid = report.destination_invalid;
            self.settle(&batch.sub, report).await;
            if destination_invalid {
                break;
            }
        }
        counts
    }

    /// Advances the watermark past everything processed in a batch.
    async fn settle(&self, sub: &Subscription, report: DeliveryReport) {
        let key = sub.key();
        let threshold = self.options.failure_threshold.max(1);
        let mut processed = report.delivered.clone();
        let mut given_up: Vec<(SubmissionId, DeliveryError)> = Vec::new();
        {
            let mut state = self.state.lock().await;
            for id in &report.delivered {
                state.item_failures.remove(&(key.clone(), *id));
            }
            for (id, err) in &report.failed {
                if err.is_destination_invalid() {
                    continue;
                }
                let entry = (key.clone(), *id);
                let attempts = state.item_failures.entry(entry.clone()).or_insert(0);
                *attempts += 1;
                if *attempts >= threshold {
                    state.item_failures.remove(&entry);
                    processed.push(*id);
                    given_up.push((*id, err.clone()));
                }
            }
        }

        for (id, err) in &given_up {
            error!("Giving up on {id} for {key} after {threshold} attempts: {err}");
            self.notify_operator(&format!(
                "Gave up sending {} for {key} after {threshold} attempts: {err}",
                id.link()
            ))
            .await;
        }

        let target = advance_past(sub.latest_update, processed);
        let committed = self.commit(sub, target).await;
        // Nothing at or below the watermark is retried.
        if let Some(newest) = committed.and_then(|wm| wm.submission_id()) {
            self.state
                .lock()
                .await
                .item_failures
                .retain(|(k, id), _| *k != key || *id > newest);
        }

        if report.destination_invalid {
            self.flag(sub, &report).await;
        }
    }

    async fn flag(&self, sub: &Subscription, report: &DeliveryReport) {
        let key = sub.key();
        let reason = report
            .failed
            .iter()
            .find(|(_, err)| err.is_destination_invalid())
            .map_or_else(|| "destination invalid".to_string(), |(_, err)| err.to_string());

        match self.service.flag_for_review(sub).await {
            Ok(true) => {
                warn!("Paused {key}: {reason}");
                self.notify_operator(&format!(
                    "Paused subscription {key} until it is removed: {reason}"
                ))
                .await;
            }
            Ok(false) => debug!("Subscription {key} was removed before it could be flagged."),
            Err(e) => error!("Failed to flag {key}: {e}"),
        }
    }

    /// Returns the stored watermark, or `None` if the subscription is gone
    /// or the write failed.
    async fn commit(&self, sub: &Subscription, watermark: Watermark) -> Option<Watermark> {
        match self.service.advance_watermark(sub, watermark).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(
                    "Failed to store watermark {watermark} for {}: {e}",
                    sub.key()
                );
                None
            }
        }
    }

    async fn record_success(&self, query: &str) {
        let previous = {
            let mut state = self.state.lock().await;
            state.last_success.insert(query.to_string(), Utc::now());
            state.consecutive_failures.remove(query)
        };
        if let Some(count) = previous {
            info!("Searches for \"{query}\" recovered after {count} failures.");
        }
    }

    async fn record_failure(&self, query: &str, err: &ApiError) {
        let count = {
            let mut state = self.state.lock().await;
            let count = state
                .consecutive_failures
                .entry(query.to_string())
                .or_insert(0);
            *count += 1;
            *count
        };
        warn!("Search for \"{query}\" failed ({count} in a row): {err}");

        if count == self.options.failure_threshold {
            error!("Search for \"{query}\" has failed {count} times in a row.");
            self.notify_operator(&format!(
                "Searches for \"{query}\" have failed {count} times in a row. Last error: {err}"
            ))
            .await;
        }
    }

    async fn notify_operator(&self, text: &str) {
        let Some(destination) = self.options.operator_destination else {
            return;
        };
        if let Err(e) = self
            .dispatcher
            .notifier()
            .send_notice(destination, text)
            .await
        {
            error!("Failed to notify operator channel {destination}: {e}");
        }
    }

    /// Drops bookkeeping of queries and subscriptions no longer polled.
    async fn forget_untracked(&self, groups: &BTreeMap<String, Vec<Subscription>>) {
        let mut state = self.state.lock().await;
        state
            .consecutive_failures
            .retain(|query, _| groups.contains_key(query));
        state.last_success.retain(|query, _| groups.contains_key(query));
        state.item_failures.retain(|(key, _), _| {
            groups
                .get(&key.query)
                .is_some_and(|subs| subs.iter().any(|sub| sub.destination == key.destination))
        });
    }
}
