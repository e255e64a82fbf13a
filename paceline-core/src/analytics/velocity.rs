//! Throughput (velocity) metrics and trend classification.

use crate::analytics::Window;
use crate::error::Result;
use crate::types::Task;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

// Productivity score weights: one completed task per day at a 100%
// completion rate scores 1.0 * 70 + 100 * 0.3 = 100. Tunable, not
// load-bearing.
const SCORE_VELOCITY_WEIGHT: f64 = 70.0;
const SCORE_COMPLETION_WEIGHT: f64 = 0.3;

/// Throughput multipliers for trend classification: the recent half must
/// beat the older half by 10% to count as improving, or trail it by 10%
/// to count as declining.
const TREND_IMPROVING_FACTOR: f64 = 1.1;
const TREND_DECLINING_FACTOR: f64 = 0.9;

/// Direction of change between the two halves of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        }
    }

    /// Classify from per-day throughput of the older and recent halves.
    /// Zero completions in both halves is stable.
    pub fn classify(older_per_day: f64, recent_per_day: f64) -> Self {
        if recent_per_day > older_per_day * TREND_IMPROVING_FACTOR {
            Trend::Improving
        } else if recent_per_day < older_per_day * TREND_DECLINING_FACTOR {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Completions on a single calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub tasks_completed: u64,
}

/// Velocity and productivity metrics over a window.
#[derive(Debug, Clone, Serialize)]
pub struct VelocityMetrics {
    pub period_days: i64,
    /// Completed tasks per day over the whole window
    pub tasks_per_day: f64,
    pub completion_trend: Trend,
    /// Bounded composite of velocity and completion rate, in [0, 100]
    pub productivity_score: f64,
    /// Day with the most completions; earliest date wins ties
    pub best_day: Option<DayCount>,
    /// Day with the fewest completions among days that had any; earliest
    /// date wins ties. Absent when fewer than two days saw completions.
    pub worst_day: Option<DayCount>,
    /// Per-day completions, sorted by date
    pub daily_breakdown: Vec<DayCount>,
}

/// Computes throughput over a period and classifies the trend direction.
pub struct VelocityCalculator;

impl VelocityCalculator {
    pub fn compute(tasks: &[Task], period_days: i64, now: DateTime<Utc>) -> Result<VelocityMetrics> {
        let window = Window::Days(period_days).resolve(now)?;
        let (older, recent) = window.split_halves();

        let total = tasks.len() as u64;
        let mut completed_in_window = 0u64;
        let mut completed_total = 0u64;
        let mut older_count = 0u64;
        let mut recent_count = 0u64;
        let mut daily: BTreeMap<NaiveDate, u64> = BTreeMap::new();

        for task in tasks {
            if task.is_completed() {
                completed_total += 1;
            }
            let Some(completed_at) = task.completed_at else {
                continue;
            };
            if !window.contains(completed_at) {
                continue;
            }
            completed_in_window += 1;
            *daily.entry(completed_at.date_naive()).or_insert(0) += 1;
            if completed_at < older.end {
                older_count += 1;
            } else {
                recent_count += 1;
            }
        }

        let tasks_per_day = completed_in_window as f64 / period_days as f64;
        let half_days = period_days as f64 / 2.0;
        let completion_trend =
            Trend::classify(older_count as f64 / half_days, recent_count as f64 / half_days);

        let completion_rate = if total == 0 {
            0.0
        } else {
            completed_total as f64 / total as f64 * 100.0
        };
        let productivity_score = (tasks_per_day * SCORE_VELOCITY_WEIGHT
            + completion_rate * SCORE_COMPLETION_WEIGHT)
            .min(100.0);

        // BTreeMap iteration is date-ascending, so strict comparisons give
        // the earliest date on ties.
        let mut best_day: Option<DayCount> = None;
        let mut worst_day: Option<DayCount> = None;
        for (&date, &count) in &daily {
            let day = DayCount {
                date,
                tasks_completed: count,
            };
            if best_day.map_or(true, |b| count > b.tasks_completed) {
                best_day = Some(day);
            }
            if worst_day.map_or(true, |w| count < w.tasks_completed) {
                worst_day = Some(day);
            }
        }
        if daily.len() < 2 {
            worst_day = None;
        }

        let daily_breakdown = daily
            .into_iter()
            .map(|(date, tasks_completed)| DayCount {
                date,
                tasks_completed,
            })
            .collect();

        tracing::debug!(
            period_days,
            completed = completed_in_window,
            tasks_per_day,
            trend = %completion_trend,
            "Velocity computed"
        );

        Ok(VelocityMetrics {
            period_days,
            tasks_per_day,
            completion_trend,
            productivity_score,
            best_day,
            worst_day,
            daily_breakdown,
        })
    }
}
