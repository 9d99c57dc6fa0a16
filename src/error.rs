//! Error types shared by the persistence ports and the configuration layer.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the persistence ports.
///
/// The visibility computation itself never fails; these only surface from
/// mutations and reloads that go through a store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("tracker not found: {id}")]
    TrackerNotFound { id: Uuid },

    #[error("category not found: {title}")]
    CategoryNotFound { title: String },

    #[error("invalid tracker: {0}")]
    InvalidTracker(String),

    #[error("invalid category: {0}")]
    InvalidCategory(String),

    #[error("failed to save: {0}")]
    SaveFailed(String),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while loading or saving [`crate::config::TrackerConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
