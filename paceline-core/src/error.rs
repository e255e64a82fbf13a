//! Error types for paceline-core

use thiserror::Error;

/// Main error type for the paceline-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Analysis window is structurally invalid (end before start,
    /// or a non-positive day count). Rejected before computation begins.
    #[error("invalid analysis window: {0}")]
    InvalidWindow(String),

    /// The goal hierarchy contains a cycle. This is data corruption,
    /// never auto-repaired; `cycle` lists the goal ids on the cycle.
    #[error("cyclic goal hierarchy: {cycle:?}")]
    CyclicGoalHierarchy { cycle: Vec<i64> },

    /// Goal not found in the snapshot or the record source
    #[error("goal not found: {0}")]
    GoalNotFound(i64),

    /// Optimistic-concurrency check failed on a progress write-back.
    /// Callers may retry once with a fresh snapshot, then must propagate.
    #[error("concurrent update conflict on goal {goal_id}: expected version {expected_version}, found {actual_version}")]
    ConcurrentUpdateConflict {
        goal_id: i64,
        expected_version: i64,
        actual_version: i64,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for paceline-core
pub type Result<T> = std::result::Result<T, Error>;
