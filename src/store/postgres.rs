//! Durable storage backend
//!
//! PostgreSQL-backed variant. The summary fold runs server-side as a
//! single `INSERT .. ON CONFLICT DO UPDATE .. RETURNING` statement, so two
//! concurrent updates for the same repository cannot lose an increment and
//! updates for different repositories only contend on their own row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{HealthEvent, RecentEntry, RepoSummary, INITIAL_REPO_HEALTH, RECENT_LIMIT};

use super::{HistoryRecord, StoreError, SummaryStore};

/// Durable summary store over PostgreSQL.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cheap connectivity probe for the liveness endpoint.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn decode_recent(value: serde_json::Value) -> Result<Vec<RecentEntry>, StoreError> {
        serde_json::from_value(value)
            .map_err(|e| StoreError::InvalidData(format!("recent window: {}", e)))
    }
}

impl SummaryStore for PostgresStore {
    async fn upsert_summary(&self, event: &HealthEvent) -> Result<RepoSummary, StoreError> {
        let entry = serde_json::to_value(RecentEntry::from_event(event))?;

        // One round trip: increment counters, accumulate health, prepend
        // the new recent entry and truncate the window, all on the server.
        // The jsonpath slice bound is RECENT_LIMIT - 1 (inclusive).
        let upsert_sql = format!(
            r#"
            INSERT INTO repo_summaries
                (repo, total_prs, cumulative_score, avg_score, current_health, recent, updated_at)
            VALUES ($1, 1, $2, $2::double precision, {initial} + $3, jsonb_build_array($4::jsonb), NOW())
            ON CONFLICT (repo) DO UPDATE SET
                total_prs = repo_summaries.total_prs + 1,
                cumulative_score = repo_summaries.cumulative_score + $2,
                current_health = repo_summaries.current_health + $3,
                recent = jsonb_path_query_array(
                    jsonb_build_array($4::jsonb) || repo_summaries.recent,
                    '$[0 to {window_end}]'
                ),
                updated_at = NOW()
            RETURNING repo, total_prs, cumulative_score, current_health, recent, updated_at
            "#,
            initial = INITIAL_REPO_HEALTH,
            window_end = RECENT_LIMIT - 1,
        );

        let (repo, total_prs, cumulative_score, current_health, recent, updated_at): (
            String,
            i64,
            i64,
            i64,
            serde_json::Value,
            DateTime<Utc>,
        ) = sqlx::query_as(&upsert_sql)
            .bind(&event.repo)
            .bind(event.pr_score as i64)
            .bind(event.health_delta as i64)
            .bind(&entry)
            .fetch_one(&self.pool)
            .await?;

        // avg_score is derived from the exact counters just returned and
        // persisted as a fast-follow write. A momentarily stale stored
        // value is acceptable; the returned summary is always exact.
        let avg_score = if total_prs > 0 {
            cumulative_score as f64 / total_prs as f64
        } else {
            0.0
        };

        if let Err(e) = sqlx::query("UPDATE repo_summaries SET avg_score = $2 WHERE repo = $1")
            .bind(&repo)
            .bind(avg_score)
            .execute(&self.pool)
            .await
        {
            tracing::warn!(repo = %repo, "avg_score follow-up write failed: {}", e);
        }

        Ok(RepoSummary {
            repo,
            total_prs,
            cumulative_score,
            avg_score,
            current_health,
            recent: Self::decode_recent(recent)?,
            updated_at,
        })
    }

    async fn get_summary(&self, repo: &str) -> Result<Option<RepoSummary>, StoreError> {
        let row: Option<(String, i64, i64, f64, i64, serde_json::Value, DateTime<Utc>)> =
            sqlx::query_as(
                r#"
                SELECT repo, total_prs, cumulative_score, avg_score, current_health, recent, updated_at
                FROM repo_summaries
                WHERE repo = $1
                "#,
            )
            .bind(repo)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((repo, total_prs, cumulative_score, avg_score, current_health, recent, updated_at)) => {
                Ok(Some(RepoSummary {
                    repo,
                    total_prs,
                    cumulative_score,
                    avg_score,
                    current_health,
                    recent: Self::decode_recent(recent)?,
                    updated_at,
                }))
            }
            None => Ok(None),
        }
    }

    async fn insert_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO health_events
                (id, repo, pr_number, author, pr_score, health_delta, overall_health, reason, event_timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(&record.repo)
        .bind(record.pr_number)
        .bind(&record.author)
        .bind(record.pr_score)
        .bind(record.health_delta)
        .bind(record.overall_health)
        .bind(&record.reason)
        .bind(&record.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query_history(
        &self,
        repo: &str,
        limit: i64,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        // recorded_at is server-assigned, so ordering reflects arrival
        // order regardless of caller-supplied timestamps.
        let rows: Vec<(Uuid, String, i64, String, i32, i32, i64, String, String)> = sqlx::query_as(
            r#"
            SELECT id, repo, pr_number, author, pr_score, health_delta, overall_health, reason, event_timestamp
            FROM health_events
            WHERE repo = $1
            ORDER BY recorded_at DESC, id
            LIMIT $2
            "#,
        )
        .bind(repo)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, repo, pr_number, author, pr_score, health_delta, overall_health, reason, timestamp)| {
                    HistoryRecord {
                        id,
                        repo,
                        pr_number,
                        author,
                        pr_score,
                        health_delta,
                        overall_health,
                        reason,
                        timestamp,
                    }
                },
            )
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_window_decodes_stored_shape() {
        // Shape written by upsert_summary must round-trip through the
        // jsonb column representation.
        let stored = serde_json::json!([
            {
                "pr_number": 42,
                "score": 8,
                "timestamp": "2026-08-01T12:00:00Z",
                "author": "alice",
                "health_delta": -2
            }
        ]);

        let recent = PostgresStore::decode_recent(stored).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].pr_number, 42);
        assert_eq!(recent[0].health_delta, -2);
    }

    #[test]
    fn test_malformed_recent_window_rejected() {
        let stored = serde_json::json!([{ "pr_number": "not a number" }]);
        assert!(matches!(
            PostgresStore::decode_recent(stored),
            Err(StoreError::InvalidData(_))
        ));
    }
}
