//! Working out which results on a search page are new for a subscription.

use chrono::DateTime;
use chrono::Utc;

use super::Watermark;
use crate::submission::SearchResult;
use crate::submission::SubmissionId;

/// Outcome of comparing a search page against a watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    /// Results to notify about, oldest first.
    pub new_results: Vec<SearchResult>,
    /// Watermark to commit when every new result is processed.
    pub watermark: Watermark,
    /// First poll of the subscription; nothing is sent.
    pub baseline: bool,
    /// Every result on the page was newer than the watermark, so older new
    /// results may sit on later pages.
    pub possible_gap: bool,
}

/// Makes a page strictly descending by id, dropping repeated ids.
///
/// Returns the page and whether it had to be fixed up.
pub fn normalize_page(mut page: Vec<SearchResult>) -> (Vec<SearchResult>, bool) {
    let well_formed = page.windows(2).all(|pair| pair[0].id > pair[1].id);
    if well_formed {
        return (page, false);
    }
    page.sort_by(|a, b| b.id.cmp(&a.id));
    page.dedup_by_key(|result| result.id);
    (page, true)
}

/// Computes the delta of a newest-first page against `current`.
pub fn compute_delta(current: Watermark, page: &[SearchResult], now: DateTime<Utc>) -> Delta {
    let newest = page.first().map(|result| Watermark::Submission(result.id));
    match current {
        Watermark::Unset => Delta {
            new_results: Vec::new(),
            watermark: newest.unwrap_or(Watermark::Polled(now)),
            baseline: true,
            possible_gap: false,
        },
        // The query had no matches when the baseline was taken, so all of them are new.
        Watermark::Polled(_) => Delta {
            new_results: page.iter().rev().cloned().collect(),
            watermark: newest.unwrap_or(Watermark::Polled(now)),
            baseline: false,
            possible_gap: false,
        },
        Watermark::Submission(latest) => {
            let mut new_results: Vec<SearchResult> = page
                .iter()
                .take_while(|result| result.id > latest)
                .cloned()
                .collect();
            let possible_gap = !page.is_empty() && new_results.len() == page.len();
            new_results.reverse();
            Delta {
                watermark: new_results
                    .last()
                    .map_or(current, |result| Watermark::Submission(result.id)),
                new_results,
                baseline: false,
                possible_gap,
            }
        }
    }
}

/// Watermark after a batch: the furthest processed id, never behind `current`.
pub fn advance_past(current: Watermark, processed: impl IntoIterator<Item = SubmissionId>) -> Watermark {
    processed
        .into_iter()
        .max()
        .map_or(current, |id| current.merge(Watermark::Submission(id)))
}
