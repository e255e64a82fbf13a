//! Analytics & goal-progress engine.
//!
//! Turns raw Task/Goal snapshots into the derived metrics the dashboards
//! and goal-risk alerts consume:
//! - Task aggregation (counts, rates, time tracking)
//! - Goal progress rollup with cycle-safe hierarchy traversal
//! - Velocity (throughput) and trend classification
//! - Weekly/category trends and rule-based insights
//! - Schedule-risk scoring for dated goals
//!
//! Every component is stateless and operates on the immutable snapshot it
//! is handed; the sole write is
//! [`GoalProgressEngine::recalculate`](goals::GoalProgressEngine::recalculate),
//! delegated back through [`crate::source::RecordSource`].
//!
//! See [`orchestrator`] for the entry point that pulls a snapshot once and
//! fans it out to the sub-components.

pub mod goals;
pub mod orchestrator;
pub mod risk;
pub mod tasks;
pub mod trends;
pub mod velocity;

pub use goals::{GoalProgressEngine, GoalSummary, ProgressOutcome};
pub use orchestrator::{AnalyticsOrchestrator, GoalReport, TaskReport};
pub use risk::{AtRiskGoal, NearCompletionGoal, RiskLevel, RiskReport, RiskScorer};
pub use tasks::{GroupStats, TaskAggregator, TaskAnalytics, TimeTracking};
pub use trends::{
    CategoryTrend, PriorityWeek, TrendAnalysis, TrendAnalyzer, TrendDirection, WeeklyBucket,
};
pub use velocity::{DayCount, Trend, VelocityCalculator, VelocityMetrics};

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Analysis window
// ============================================

/// Caller-supplied analysis window: either a day count back from "now" or
/// explicit start/end timestamps.
///
/// Structurally invalid windows (non-positive day count, end before start)
/// are rejected with [`Error::InvalidWindow`] before any computation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    /// The last N days, ending at the injected "now"
    Days(i64),
    /// Explicit inclusive bounds
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl Window {
    /// Validate and resolve against an injected "now".
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<ResolvedWindow> {
        match *self {
            Window::Days(days) => {
                if days <= 0 {
                    return Err(Error::InvalidWindow(format!(
                        "day count must be positive, got {}",
                        days
                    )));
                }
                Ok(ResolvedWindow {
                    start: now - Duration::days(days),
                    end: now,
                })
            }
            Window::Range { start, end } => {
                if end < start {
                    return Err(Error::InvalidWindow(format!(
                        "end {} is before start {}",
                        end, start
                    )));
                }
                Ok(ResolvedWindow { start, end })
            }
        }
    }

    /// Number of days the window spans, for per-day rates. At least 1 to
    /// keep denominators sane for sub-day ranges.
    pub fn span_days(&self, now: DateTime<Utc>) -> Result<i64> {
        let resolved = self.resolve(now)?;
        Ok(resolved.span_days())
    }
}

/// Concrete inclusive bounds after a [`Window`] has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ResolvedWindow {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Whole days spanned, minimum 1.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days().max(1)
    }

    /// Split into two equal contiguous halves by elapsed time:
    /// `(older, recent)`. The older half is `[start, mid)`, the recent
    /// half `[mid, end]`; velocity and trend comparisons share this rule.
    pub fn split_halves(&self) -> (ResolvedWindow, ResolvedWindow) {
        let mid = self.start + (self.end - self.start) / 2;
        (
            ResolvedWindow {
                start: self.start,
                end: mid,
            },
            ResolvedWindow {
                start: mid,
                end: self.end,
            },
        )
    }
}
