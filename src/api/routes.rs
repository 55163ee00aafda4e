//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::aggregator::Aggregator;
use crate::domain::{HealthEvent, RepoSummary};
use crate::error::AppError;

// =========================================================================
// Request/Response types
// =========================================================================

/// Ingest payload. Unknown extra fields are ignored rather than rejected,
/// and out-of-range scores are clamped by the aggregator, not refused.
#[derive(Debug, Deserialize)]
pub struct RecordEventRequest {
    pub repo: String,
    #[serde(default)]
    pub pr_number: i64,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub pr_score: i32,
    #[serde(default)]
    pub health_delta: i32,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_author() -> String {
    "unknown".to_string()
}

#[derive(Debug, Serialize)]
pub struct RecordEventResponse {
    #[serde(flatten)]
    pub summary: RepoSummary,
    /// Alias of `current_health`, kept for ingest callers that only want
    /// the headline number.
    pub overall_health: i64,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub repo: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub repo: String,
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub pr_number: i64,
    pub pr_score: i32,
    pub health_delta: i32,
    /// Repository health after that event.
    pub overall_health: i64,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub repo: String,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    /// Whether the durable backend is currently reachable.
    pub durable: bool,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<Aggregator> {
    Router::new()
        .route("/events", post(record_event))
        .route("/summary", get(get_summary))
        .route("/history", get(get_history))
        .route("/health", get(liveness))
}

// =========================================================================
// POST /events
// =========================================================================

/// Record one assessed change request
async fn record_event(
    State(aggregator): State<Aggregator>,
    Json(request): Json<RecordEventRequest>,
) -> Result<Json<RecordEventResponse>, AppError> {
    if request.repo.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "repo must be a non-empty string".to_string(),
        ));
    }

    let event = HealthEvent {
        repo: request.repo,
        pr_number: request.pr_number,
        author: request.author,
        pr_score: request.pr_score,
        health_delta: request.health_delta,
        timestamp: request.timestamp.unwrap_or_default(),
        reason: request.reason.unwrap_or_default(),
    };

    let outcome = aggregator.record(event).await?;

    Ok(Json(RecordEventResponse {
        overall_health: outcome.overall_health,
        summary: outcome.summary,
    }))
}

// =========================================================================
// GET /summary
// =========================================================================

/// Summary for one repository; zero-valued default for unseen repos
async fn get_summary(
    State(aggregator): State<Aggregator>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<RepoSummary>, AppError> {
    if query.repo.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "repo must be a non-empty string".to_string(),
        ));
    }

    Ok(Json(aggregator.get_summary(&query.repo).await))
}

// =========================================================================
// GET /history
// =========================================================================

/// Most recent events for one repository, newest first
async fn get_history(
    State(aggregator): State<Aggregator>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    if query.repo.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "repo must be a non-empty string".to_string(),
        ));
    }

    let limit = query.limit.clamp(1, 1000);
    let records = aggregator.get_history(&query.repo, limit).await;

    let history = records
        .into_iter()
        .map(|r| HistoryEntry {
            timestamp: r.timestamp,
            pr_number: r.pr_number,
            pr_score: r.pr_score,
            health_delta: r.health_delta,
            overall_health: r.overall_health,
            reason: r.reason,
        })
        .collect();

    Ok(Json(HistoryResponse {
        repo: query.repo,
        history,
    }))
}

// =========================================================================
// GET /health
// =========================================================================

/// Liveness probe. Always succeeds; reports durable-store reachability.
async fn liveness(State(aggregator): State<Aggregator>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok",
        durable: aggregator.durable_available().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_event_request_defaults() {
        let request: RecordEventRequest =
            serde_json::from_str(r#"{"repo": "acme/widgets"}"#).unwrap();

        assert_eq!(request.repo, "acme/widgets");
        assert_eq!(request.pr_number, 0);
        assert_eq!(request.author, "unknown");
        assert_eq!(request.pr_score, 0);
        assert_eq!(request.health_delta, 0);
        assert!(request.timestamp.is_none());
        assert!(request.reason.is_none());
    }

    #[test]
    fn test_record_event_request_ignores_unknown_fields() {
        let json = r#"{
            "repo": "acme/widgets",
            "pr_number": 12,
            "pr_score": 8,
            "diff": "not our concern",
            "lint_passed": true
        }"#;

        let request: RecordEventRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.pr_number, 12);
        assert_eq!(request.pr_score, 8);
    }

    #[test]
    fn test_history_query_default_limit() {
        let query: HistoryQuery = serde_json::from_str(r#"{"repo": "acme/widgets"}"#).unwrap();
        assert_eq!(query.limit, 20);
    }
}
