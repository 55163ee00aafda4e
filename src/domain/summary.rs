//! Per-repository summary
//!
//! The mutable rollup of every event recorded for a repository. Only the
//! storage backends mutate a summary; everything else reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::HealthEvent;

/// Base health for a repository that has never been seen.
pub const INITIAL_REPO_HEALTH: i64 = 100;

/// Number of compact event records kept in `recent`, newest first.
pub const RECENT_LIMIT: usize = 20;

/// Compact record of one event, kept in a summary's recent window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub pr_number: i64,
    pub score: i32,
    pub timestamp: String,
    pub author: String,
    pub health_delta: i32,
}

impl RecentEntry {
    pub fn from_event(event: &HealthEvent) -> Self {
        Self {
            pr_number: event.pr_number,
            score: event.pr_score,
            timestamp: event.timestamp.clone(),
            author: event.author.clone(),
            health_delta: event.health_delta,
        }
    }
}

/// Running per-repository health summary.
///
/// Invariants, with N = events recorded for `repo`:
/// - `total_prs == N`, monotonically non-decreasing
/// - `cumulative_score` == sum of clamped scores
/// - `current_health == INITIAL_REPO_HEALTH` + sum of clamped deltas,
///   with no floor or ceiling
/// - `recent.len() == min(N, RECENT_LIMIT)`, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSummary {
    pub repo: String,
    pub total_prs: i64,
    pub cumulative_score: i64,
    pub avg_score: f64,
    pub current_health: i64,
    pub recent: Vec<RecentEntry>,
    pub updated_at: DateTime<Utc>,
}

impl RepoSummary {
    /// The zero-valued summary served for a repository with no events.
    pub fn empty(repo: &str) -> Self {
        Self {
            repo: repo.to_string(),
            total_prs: 0,
            cumulative_score: 0,
            avg_score: 0.0,
            current_health: INITIAL_REPO_HEALTH,
            recent: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Fold one normalized event into the summary.
    ///
    /// This is the reference semantics of the aggregation; the durable
    /// store implements the same fold server-side in a single statement.
    pub fn apply(&mut self, event: &HealthEvent) {
        self.total_prs += 1;
        self.cumulative_score += event.pr_score as i64;
        self.avg_score = self.cumulative_score as f64 / self.total_prs as f64;
        self.current_health += event.health_delta as i64;
        self.recent.insert(0, RecentEntry::from_event(event));
        self.recent.truncate(RECENT_LIMIT);
        self.updated_at = Utc::now();
    }
}
