//! Entry point for the serving layer.
//!
//! The orchestrator owns the collaborators (record source + clock), pulls
//! each snapshot exactly once per call, and feeds the same immutable
//! slices to the sub-components. It holds no state across invocations;
//! concurrent calls for different scopes are independent.

use crate::analytics::goals::{GoalProgressEngine, GoalSummary};
use crate::analytics::risk::{RiskReport, RiskScorer};
use crate::analytics::tasks::{TaskAggregator, TaskAnalytics};
use crate::analytics::trends::{TrendAnalysis, TrendAnalyzer};
use crate::analytics::velocity::{VelocityCalculator, VelocityMetrics};
use crate::analytics::Window;
use crate::clock::Clock;
use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::source::RecordSource;
use crate::types::{Goal, Scope};
use serde::Serialize;

/// Task analytics bundle: the aggregation plus window context.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub period_days: i64,
    /// Tasks created inside the window
    pub tasks_created: u64,
    #[serde(flatten)]
    pub analytics: TaskAnalytics,
}

/// Goal analytics bundle: summary counts plus the risk report.
#[derive(Debug, Clone, Serialize)]
pub struct GoalReport {
    #[serde(flatten)]
    pub summary: GoalSummary,
    #[serde(flatten)]
    pub risk: RiskReport,
}

/// Assembles the four analytics bundles from a scoped snapshot.
pub struct AnalyticsOrchestrator<S, C> {
    source: S,
    clock: C,
    config: AnalyticsConfig,
}

impl<S: RecordSource, C: Clock> AnalyticsOrchestrator<S, C> {
    pub fn new(source: S, clock: C) -> Self {
        Self::with_config(source, clock, AnalyticsConfig::default())
    }

    /// Build with explicit window defaults (from `[analytics]` in the
    /// config file).
    pub fn with_config(source: S, clock: C, config: AnalyticsConfig) -> Self {
        Self {
            source,
            clock,
            config,
        }
    }

    /// Task analytics over a window (default: last 7 days).
    pub fn task_analytics(&self, scope: Scope, window: Option<Window>) -> Result<TaskReport> {
        let window = window.unwrap_or(Window::Days(self.config.task_window_days));
        let now = self.clock.now();
        let resolved = window.resolve(now)?;

        let tasks = self.source.list_tasks(scope, Some(&resolved))?;
        let analytics = TaskAggregator::compute(&tasks, now);
        let tasks_created = tasks
            .iter()
            .filter(|t| resolved.contains(t.created_at))
            .count() as u64;

        tracing::debug!(
            user_id = scope.user_id,
            tasks = tasks.len(),
            "Task analytics assembled"
        );
        Ok(TaskReport {
            period_days: resolved.span_days(),
            tasks_created,
            analytics,
        })
    }

    /// Goal summary plus risk scoring over all goals in scope.
    pub fn goal_analytics(&self, scope: Scope) -> Result<GoalReport> {
        let now = self.clock.now();
        let goals = self.source.list_goals(scope)?;
        let tasks = self.source.list_tasks(scope, None)?;

        Ok(GoalReport {
            summary: GoalProgressEngine::summarize(&goals),
            risk: RiskScorer::compute(&goals, &tasks, now),
        })
    }

    /// Velocity metrics over a window (default: last 30 days).
    pub fn velocity(&self, scope: Scope, window: Option<Window>) -> Result<VelocityMetrics> {
        let window = window.unwrap_or(Window::Days(self.config.trend_window_days));
        let resolved = window.resolve(self.clock.now())?;

        let tasks = self.source.list_tasks(scope, Some(&resolved))?;
        // Explicit ranges are anchored at their own end, not at "now".
        VelocityCalculator::compute(&tasks, resolved.span_days(), resolved.end)
    }

    /// Trend analysis over a window (default: last 30 days).
    pub fn trends(&self, scope: Scope, window: Option<Window>) -> Result<TrendAnalysis> {
        let window = window.unwrap_or(Window::Days(self.config.trend_window_days));
        let resolved = window.resolve(self.clock.now())?;

        let tasks = self.source.list_tasks(scope, Some(&resolved))?;
        TrendAnalyzer::compute(&tasks, resolved.span_days(), resolved.end)
    }

    /// Recalculate one goal's progress from the current snapshot and write
    /// it back. The write is version-checked; a concurrent recalculation
    /// racing on the same goal surfaces as
    /// [`crate::error::Error::ConcurrentUpdateConflict`].
    pub fn recalculate_goal_progress(&self, scope: Scope, goal_id: i64) -> Result<Goal> {
        let goals = self.source.list_goals(scope)?;
        let tasks = self.source.list_tasks(scope, None)?;
        GoalProgressEngine::recalculate(&self.source, goal_id, &goals, &tasks)
    }
}
