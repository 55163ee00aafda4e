//! Bounded in-memory storage backend
//!
//! Process-local substitute used when the durable store is unreachable
//! (or when no database is configured at all). A single mutex over the
//! summary map serializes same-repo updates; the history log is capped at
//! `HISTORY_CAP` records process-wide, oldest evicted first.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::domain::{HealthEvent, RepoSummary};

use super::{HistoryRecord, StoreError, SummaryStore};

/// Retention cap for the in-memory history log, process-wide.
pub const HISTORY_CAP: usize = 1000;

#[derive(Debug, Default)]
struct Inner {
    summaries: Mutex<HashMap<String, RepoSummary>>,
    history: Mutex<VecDeque<HistoryRecord>>,
}

/// Capacity-bounded in-memory summary store. Cheap to clone; clones share
/// state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SummaryStore for MemoryStore {
    async fn upsert_summary(&self, event: &HealthEvent) -> Result<RepoSummary, StoreError> {
        let mut summaries = self
            .inner
            .summaries
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?;

        let summary = summaries
            .entry(event.repo.clone())
            .or_insert_with(|| RepoSummary::empty(&event.repo));
        summary.apply(event);

        Ok(summary.clone())
    }

    async fn get_summary(&self, repo: &str) -> Result<Option<RepoSummary>, StoreError> {
        let summaries = self
            .inner
            .summaries
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?;

        Ok(summaries.get(repo).cloned())
    }

    async fn insert_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        let mut history = self
            .inner
            .history
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?;

        history.push_back(record.clone());
        while history.len() > HISTORY_CAP {
            history.pop_front();
        }

        Ok(())
    }

    async fn query_history(
        &self,
        repo: &str,
        limit: i64,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        let history = self
            .inner
            .history
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?;

        Ok(history
            .iter()
            .rev()
            .filter(|r| r.repo == repo)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{INITIAL_REPO_HEALTH, RECENT_LIMIT};

    fn event(repo: &str, pr_number: i64, pr_score: i32, health_delta: i32) -> HealthEvent {
        HealthEvent {
            repo: repo.to_string(),
            pr_number,
            author: "alice".to_string(),
            pr_score,
            health_delta,
            timestamp: "2026-08-01T12:00:00Z".to_string(),
            reason: String::new(),
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_accumulates() {
        let store = MemoryStore::new();

        let s1 = store
            .upsert_summary(&event("acme/widgets", 1, 10, 2))
            .await
            .unwrap();
        assert_eq!(s1.total_prs, 1);
        assert_eq!(s1.current_health, INITIAL_REPO_HEALTH + 2);

        let s2 = store
            .upsert_summary(&event("acme/widgets", 2, 0, -5))
            .await
            .unwrap();
        assert_eq!(s2.total_prs, 2);
        assert_eq!(s2.cumulative_score, 10);
        assert_eq!(s2.avg_score, 5.0);
        assert_eq!(s2.current_health, 97);
    }

    #[tokio::test]
    async fn test_repos_tracked_independently() {
        let store = MemoryStore::new();

        for n in 0..3 {
            store.upsert_summary(&event("acme/a", n, 5, 1)).await.unwrap();
        }
        store.upsert_summary(&event("acme/b", 0, 5, 1)).await.unwrap();

        let a = store.get_summary("acme/a").await.unwrap().unwrap();
        let b = store.get_summary("acme/b").await.unwrap().unwrap();
        assert_eq!(a.total_prs, 3);
        assert_eq!(b.total_prs, 1);
    }

    #[tokio::test]
    async fn test_unseen_repo_is_none() {
        let store = MemoryStore::new();
        assert!(store.get_summary("nobody/nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_window_truncated() {
        let store = MemoryStore::new();
        for n in 1..=30 {
            store
                .upsert_summary(&event("acme/widgets", n, 5, 0))
                .await
                .unwrap();
        }
        let summary = store.get_summary("acme/widgets").await.unwrap().unwrap();
        assert_eq!(summary.recent.len(), RECENT_LIMIT);
        assert_eq!(summary.recent[0].pr_number, 30);
    }

    #[tokio::test]
    async fn test_history_cap_evicts_oldest() {
        let store = MemoryStore::new();

        for n in 0..(HISTORY_CAP as i64 + 50) {
            let e = event("acme/widgets", n, 5, 0);
            let record = HistoryRecord::from_event(&e, 100);
            store.insert_history(&record).await.unwrap();
        }

        let rows = store
            .query_history("acme/widgets", HISTORY_CAP as i64 * 2)
            .await
            .unwrap();
        assert_eq!(rows.len(), HISTORY_CAP);
        // Newest first; the oldest 50 records were evicted
        assert_eq!(rows[0].pr_number, HISTORY_CAP as i64 + 49);
        assert_eq!(rows[rows.len() - 1].pr_number, 50);
    }

    #[tokio::test]
    async fn test_query_history_filters_by_repo_and_limit() {
        let store = MemoryStore::new();

        for n in 0..10 {
            let e = event(if n % 2 == 0 { "acme/a" } else { "acme/b" }, n, 5, 0);
            store
                .insert_history(&HistoryRecord::from_event(&e, 100))
                .await
                .unwrap();
        }

        let rows = store.query_history("acme/a", 3).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.repo == "acme/a"));
        assert_eq!(rows[0].pr_number, 8);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_lose_nothing() {
        let store = MemoryStore::new();

        let mut handles = Vec::new();
        for n in 0..100 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .upsert_summary(&event("acme/widgets", n, 5, 1))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let summary = store.get_summary("acme/widgets").await.unwrap().unwrap();
        assert_eq!(summary.total_prs, 100);
        assert_eq!(summary.cumulative_score, 500);
        assert_eq!(summary.current_health, INITIAL_REPO_HEALTH + 100);
    }
}
