use std::sync::Arc;

use log::debug;
use log::warn;

use crate::notify::Notification;
use crate::notify::Notifier;
use crate::notify::error::DeliveryError;
use crate::submission::SearchResult;
use crate::submission::SubmissionId;

/// Per-item outcome of one batch sent to one destination.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<SubmissionId>,
    pub failed: Vec<(SubmissionId, DeliveryError)>,
    /// The destination rejected us for good; the rest of the batch was not sent.
    pub destination_invalid: bool,
}

impl DeliveryReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.destination_invalid
    }
}

/// Sends batches of results to a destination in ascending id order.
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub async fn dispatch(
        &self,
        destination: u64,
        query: &str,
        results: &[SearchResult],
    ) -> DeliveryReport {
        let mut ordered: Vec<&SearchResult> = results.iter().collect();
        ordered.sort_by_key(|result| result.id);

        let mut report = DeliveryReport::default();
        for result in ordered {
            let notification = Notification::new(query, result.clone());
            match self.notifier.send_result(destination, &notification).await {
                Ok(()) => {
                    debug!("Sent {} for \"{query}\" to {destination}", result.id);
                    report.delivered.push(result.id);
                }
                Err(err) if err.is_destination_invalid() => {
                    warn!("Stopping batch for \"{query}\": {err}");
                    report.failed.push((result.id, err));
                    report.destination_invalid = true;
                    break;
                }
                Err(err) => {
                    warn!("Failed to send {} for \"{query}\": {err}", result.id);
                    report.failed.push((result.id, err));
                }
            }
        }
        report
    }
}
