//! Health event
//!
//! One assessed change request's outcome: the unit of aggregation input.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Accepted range for a per-PR score.
pub const PR_SCORE_MIN: i32 = 0;
pub const PR_SCORE_MAX: i32 = 10;

/// Accepted range for a per-event health delta.
pub const HEALTH_DELTA_MIN: i32 = -5;
pub const HEALTH_DELTA_MAX: i32 = 5;

/// Clamp a raw PR score into [0, 10].
pub fn clamp_pr_score(value: i32) -> i32 {
    value.clamp(PR_SCORE_MIN, PR_SCORE_MAX)
}

/// Clamp a raw health delta into [-5, +5].
pub fn clamp_health_delta(value: i32) -> i32 {
    value.clamp(HEALTH_DELTA_MIN, HEALTH_DELTA_MAX)
}

/// One risk-assessment outcome for a single change request.
///
/// Immutable once normalized; the aggregator clamps scores and assigns a
/// timestamp before any store sees the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthEvent {
    pub repo: String,
    pub pr_number: i64,
    pub author: String,
    pub pr_score: i32,
    pub health_delta: i32,
    /// ISO-8601 string. Caller-supplied values are passed through
    /// unparsed; arrival order in storage is authoritative regardless.
    pub timestamp: String,
    /// Free-text annotation from the assessor, kept in history records.
    pub reason: String,
}

impl HealthEvent {
    /// Clamp scores into their accepted ranges, assign an arrival
    /// timestamp when the caller did not supply one, and default the
    /// author. Every event passes through here exactly once, before it
    /// reaches a store.
    pub fn normalized(mut self) -> Self {
        self.pr_score = clamp_pr_score(self.pr_score);
        self.health_delta = clamp_health_delta(self.health_delta);
        if self.timestamp.is_empty() {
            self.timestamp = Utc::now().to_rfc3339();
        }
        if self.author.is_empty() {
            self.author = "unknown".to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(pr_score: i32, health_delta: i32) -> HealthEvent {
        HealthEvent {
            repo: "acme/widgets".to_string(),
            pr_number: 7,
            author: "alice".to_string(),
            pr_score,
            health_delta,
            timestamp: String::new(),
            reason: String::new(),
        }
    }

    #[test]
    fn test_pr_score_clamped_above() {
        let e = event(15, 0).normalized();
        assert_eq!(e.pr_score, 10);
    }

    #[test]
    fn test_pr_score_clamped_below() {
        let e = event(-3, 0).normalized();
        assert_eq!(e.pr_score, 0);
    }

    #[test]
    fn test_health_delta_clamped() {
        let e = event(5, -9).normalized();
        assert_eq!(e.health_delta, -5);

        let e = event(5, 12).normalized();
        assert_eq!(e.health_delta, 5);
    }

    #[test]
    fn test_in_range_values_untouched() {
        let e = event(10, -5).normalized();
        assert_eq!(e.pr_score, 10);
        assert_eq!(e.health_delta, -5);
    }

    #[test]
    fn test_missing_timestamp_assigned() {
        let e = event(5, 0).normalized();
        assert!(!e.timestamp.is_empty());
        // Assigned timestamps are RFC 3339 and parseable
        assert!(chrono::DateTime::parse_from_rfc3339(&e.timestamp).is_ok());
    }

    #[test]
    fn test_supplied_timestamp_passed_through() {
        let mut e = event(5, 0);
        e.timestamp = "2026-08-01T12:00:00Z".to_string();
        let e = e.normalized();
        assert_eq!(e.timestamp, "2026-08-01T12:00:00Z");
    }

    #[test]
    fn test_empty_author_defaulted() {
        let mut e = event(5, 0);
        e.author = String::new();
        let e = e.normalized();
        assert_eq!(e.author, "unknown");
    }
}
