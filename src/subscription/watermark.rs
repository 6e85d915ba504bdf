//! Per-subscription progress marker.

use chrono::DateTime;
use chrono::Utc;

use crate::submission::SubmissionId;

/// How far a subscription has been caught up.
///
/// Variants are ordered: `Unset < Polled(_) < Submission(_)`, then by the
/// inner value. Updates go through [`Watermark::merge`], so a watermark never
/// moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Watermark {
    /// Never polled.
    #[default]
    Unset,
    /// Polled while the query had no results at all.
    Polled(DateTime<Utc>),
    /// Highest submission already delivered (or given up on).
    Submission(SubmissionId),
}

impl Watermark {
    pub fn merge(self, other: Watermark) -> Watermark {
        self.max(other)
    }

    pub fn submission_id(&self) -> Option<SubmissionId> {
        match self {
            Watermark::Submission(id) => Some(*id),
            _ => None,
        }
    }

    /// Rebuilds a watermark from its stored columns.
    pub fn from_columns(latest_id: Option<i64>, polled_at: Option<DateTime<Utc>>) -> Watermark {
        match (latest_id, polled_at) {
            (Some(id), _) if id >= 0 => Watermark::Submission(SubmissionId(id as u64)),
            (_, Some(at)) => Watermark::Polled(at),
            _ => Watermark::Unset,
        }
    }

    pub fn latest_id_column(&self) -> Option<i64> {
        self.submission_id().map(|id| id.get() as i64)
    }

    pub fn polled_at_column(&self) -> Option<DateTime<Utc>> {
        match self {
            Watermark::Polled(at) => Some(*at),
            _ => None,
        }
    }
}

impl std::fmt::Display for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Watermark::Unset => write!(f, "unset"),
            Watermark::Polled(at) => write!(f, "polled at {}", at.to_rfc3339()),
            Watermark::Submission(id) => write!(f, "#{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_merge_never_regresses() {
        let earlier = Utc::now();
        let later = earlier + Duration::seconds(30);

        assert_eq!(
            Watermark::Submission(SubmissionId(105)).merge(Watermark::Submission(SubmissionId(101))),
            Watermark::Submission(SubmissionId(105))
        );
        assert_eq!(
            Watermark::Submission(SubmissionId(1)).merge(Watermark::Polled(later)),
            Watermark::Submission(SubmissionId(1))
        );
        assert_eq!(
            Watermark::Polled(later).merge(Watermark::Polled(earlier)),
            Watermark::Polled(later)
        );
        assert_eq!(
            Watermark::Unset.merge(Watermark::Polled(earlier)),
            Watermark::Polled(earlier)
        );
        assert_eq!(Watermark::Polled(earlier).merge(Watermark::Unset), Watermark::Polled(earlier));
    }

    #[test]
    fn test_column_mapping() {
        let at = Utc::now();
        assert_eq!(Watermark::from_columns(None, None), Watermark::Unset);
        assert_eq!(Watermark::from_columns(None, Some(at)), Watermark::Polled(at));
        assert_eq!(
            Watermark::from_columns(Some(101), Some(at)),
            Watermark::Submission(SubmissionId(101))
        );

        let wm = Watermark::Submission(SubmissionId(7));
        assert_eq!(wm.latest_id_column(), Some(7));
        assert_eq!(wm.polled_at_column(), None);
        assert_eq!(Watermark::Polled(at).polled_at_column(), Some(at));
    }
}
