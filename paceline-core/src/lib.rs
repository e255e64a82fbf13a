//! # paceline-core
//!
//! Core library for paceline - an analytics and goal-progress engine for
//! personal productivity data.
//!
//! This library provides:
//! - Domain types for tasks and goals
//! - Pure analytics over immutable snapshots (aggregation, velocity,
//!   trends, schedule risk)
//! - Goal progress rollup over the goal hierarchy, with one version-checked
//!   write path
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Every analytics component is a pure function over the snapshot it is
//! handed; persistence sits behind the [`source::RecordSource`] trait and
//! time behind [`clock::Clock`], so the whole engine is deterministic under
//! test.
//!
//! ## Example
//!
//! ```rust,no_run
//! use paceline_core::{AnalyticsOrchestrator, Scope, SystemClock};
//! use paceline_core::source::InMemorySource;
//!
//! let orchestrator =
//!     AnalyticsOrchestrator::new(InMemorySource::new(vec![], vec![]), SystemClock);
//! let report = orchestrator
//!     .task_analytics(Scope::user(1), None)
//!     .expect("analytics failed");
//! println!("completion rate: {:.1}%", report.analytics.completion_rate);
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{AnalyticsOrchestrator, Window};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use source::RecordSource;
pub use types::*;

// Public modules
pub mod analytics;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod source;
pub mod types;
