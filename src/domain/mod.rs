//! Domain types
//!
//! The event and summary records the aggregation engine operates on.

mod event;
mod summary;

pub use event::{clamp_health_delta, clamp_pr_score, HealthEvent};
pub use summary::{RecentEntry, RepoSummary, INITIAL_REPO_HEALTH, RECENT_LIMIT};
