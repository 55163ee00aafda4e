//! repo-pulse Library
//!
//! Re-exports modules for integration testing and external use.

pub mod aggregator;
pub mod api;
pub mod domain;
pub mod store;

// Wiring modules (used chiefly by the binary)
pub mod config;
pub mod db;
mod error;

pub use aggregator::{Aggregator, RecordOutcome};
pub use config::Config;
pub use domain::{HealthEvent, RepoSummary, INITIAL_REPO_HEALTH, RECENT_LIMIT};
pub use error::{AppError, AppResult};
