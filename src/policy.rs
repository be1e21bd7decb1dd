//! Time-window eligibility predicates for questions.
//!
//! All predicates take an explicit `now` so callers decide the evaluation
//! instant; the voting endpoint evaluates at submission time, not at
//! page-render time.

use chrono::{DateTime, Duration, Utc};

use crate::db::schema::Question;

impl Question {
    /// A question is published once its publication date has passed.
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.pub_date <= now
    }

    /// Published within the last day. A `pub_date` in the future is not
    /// "recent", it is unpublished.
    pub fn was_published_recently(&self, now: DateTime<Utc>) -> bool {
        now - Duration::days(1) <= self.pub_date && self.pub_date <= now
    }

    /// Voting is allowed between `pub_date` and `end_date`; with no
    /// `end_date`, any time after publication.
    pub fn can_vote(&self, now: DateTime<Utc>) -> bool {
        match self.end_date {
            Some(end) => self.pub_date <= now && now <= end,
            None => self.pub_date <= now,
        }
    }
}

/// Reject an inverted voting window before it ever reaches the database.
/// An `end_date` before `pub_date` would silently produce a question that can
/// never be voted on.
pub fn validate_window(
    pub_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
) -> anyhow::Result<()> {
    match end_date {
        Some(end) if end < pub_date => {
            anyhow::bail!("end date {} precedes publication date {}", end, pub_date)
        }
        _ => Ok(()),
    }
}
