//! Storage backends
//!
//! Two variants behind one contract: a durable PostgreSQL store and a
//! bounded in-memory substitute used when the database is unavailable.

mod error;
mod memory;
mod postgres;

pub use error::StoreError;
pub use memory::{MemoryStore, HISTORY_CAP};
pub use postgres::PostgresStore;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{HealthEvent, RepoSummary};

/// Full audit record of one recorded event, kept in the history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub repo: String,
    pub pr_number: i64,
    pub author: String,
    pub pr_score: i32,
    pub health_delta: i32,
    /// Repository health after this event was applied.
    pub overall_health: i64,
    pub reason: String,
    pub timestamp: String,
}

impl HistoryRecord {
    pub fn from_event(event: &HealthEvent, overall_health: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            repo: event.repo.clone(),
            pr_number: event.pr_number,
            author: event.author.clone(),
            pr_score: event.pr_score,
            health_delta: event.health_delta,
            overall_health,
            reason: event.reason.clone(),
            timestamp: event.timestamp.clone(),
        }
    }
}

/// Contract both storage variants satisfy identically.
///
/// `upsert_summary` is the unit of mutual exclusion: concurrent calls for
/// the same repository serialize and compose (no lost increments), calls
/// for different repositories do not block one another, and no caller
/// ever observes a partially-updated summary.
#[allow(async_fn_in_trait)]
pub trait SummaryStore {
    /// Apply one normalized event atomically, returning the post-update
    /// summary.
    async fn upsert_summary(&self, event: &HealthEvent) -> Result<RepoSummary, StoreError>;

    /// Fetch the summary for a repository, `None` if never seen.
    async fn get_summary(&self, repo: &str) -> Result<Option<RepoSummary>, StoreError>;

    /// Append a full audit record to the history log.
    async fn insert_history(&self, record: &HistoryRecord) -> Result<(), StoreError>;

    /// Most recent history records for a repository, newest first,
    /// at most `limit` entries.
    async fn query_history(&self, repo: &str, limit: i64)
        -> Result<Vec<HistoryRecord>, StoreError>;
}
