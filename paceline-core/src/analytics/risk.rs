//! Schedule-risk scoring for dated goals.
//!
//! A goal's expected progress is linear between `created_at` and
//! `target_date`; the gap between expected and actual progress (the
//! deficit) drives the classification. Goals without a target date, or
//! already completed/cancelled, are excluded entirely.

use crate::types::{Goal, GoalStatus, Task};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Deficit thresholds, in progress points. A deficit of exactly 40 counts
/// as critical. Tunable, not load-bearing.
const CRITICAL_DEFICIT: f64 = 40.0;
const AT_RISK_DEFICIT: f64 = 15.0;
/// Progress floor for the near-completion list.
const NEAR_COMPLETION_FLOOR: u8 = 80;

/// Classification of a dated goal's schedule slippage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Critical,
    AtRisk,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "critical",
            RiskLevel::AtRisk => "at_risk",
        }
    }
}

/// An active, dated goal that is behind schedule.
#[derive(Debug, Clone, Serialize)]
pub struct AtRiskGoal {
    pub goal_id: i64,
    pub title: String,
    pub risk_level: RiskLevel,
    /// Days to the target date; negative means overdue
    pub days_until_target: i64,
    /// Linear expectation from elapsed time, in [0, 100]
    pub expected_progress: f64,
    pub actual_progress: u8,
    /// `expected_progress - actual_progress`
    pub deficit: f64,
}

/// An active goal close to done.
#[derive(Debug, Clone, Serialize)]
pub struct NearCompletionGoal {
    pub goal_id: i64,
    pub title: String,
    pub progress_percentage: u8,
    /// Incomplete tasks directly linked to the goal
    pub remaining_tasks: u64,
}

/// Risk output for the goal analytics bundle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RiskReport {
    /// Behind-schedule goals, most slipped first
    pub at_risk_goals: Vec<AtRiskGoal>,
    /// Active goals with 80 <= progress < 100, descending by progress
    pub goals_near_completion: Vec<NearCompletionGoal>,
}

/// Classifies each active, dated goal's schedule risk and flags
/// near-complete goals.
pub struct RiskScorer;

impl RiskScorer {
    pub fn compute(goals: &[Goal], tasks: &[Task], now: DateTime<Utc>) -> RiskReport {
        let mut report = RiskReport::default();

        for goal in goals {
            if goal.status != GoalStatus::Active {
                continue;
            }

            if let Some(target_date) = goal.target_date {
                let days_until_target = (target_date - now).num_days();
                let total_secs = (target_date - goal.created_at).num_seconds();
                // A target at or before creation counts as fully elapsed.
                let elapsed_fraction = if total_secs <= 0 {
                    1.0
                } else {
                    let elapsed = (now - goal.created_at).num_seconds() as f64;
                    (elapsed / total_secs as f64).clamp(0.0, 1.0)
                };
                let expected_progress = elapsed_fraction * 100.0;
                let deficit = expected_progress - goal.progress_percentage as f64;

                let risk_level = if deficit >= CRITICAL_DEFICIT {
                    Some(RiskLevel::Critical)
                } else if deficit > AT_RISK_DEFICIT {
                    Some(RiskLevel::AtRisk)
                } else {
                    None // on track
                };

                if let Some(risk_level) = risk_level {
                    report.at_risk_goals.push(AtRiskGoal {
                        goal_id: goal.id,
                        title: goal.title.clone(),
                        risk_level,
                        days_until_target,
                        expected_progress,
                        actual_progress: goal.progress_percentage,
                        deficit,
                    });
                }
            }

            if (NEAR_COMPLETION_FLOOR..100).contains(&goal.progress_percentage) {
                let remaining_tasks = tasks
                    .iter()
                    .filter(|t| t.parent_goal_id == Some(goal.id) && !t.is_completed())
                    .count() as u64;
                report.goals_near_completion.push(NearCompletionGoal {
                    goal_id: goal.id,
                    title: goal.title.clone(),
                    progress_percentage: goal.progress_percentage,
                    remaining_tasks,
                });
            }
        }

        report
            .at_risk_goals
            .sort_by(|a, b| b.deficit.total_cmp(&a.deficit));
        report
            .goals_near_completion
            .sort_by(|a, b| b.progress_percentage.cmp(&a.progress_percentage));

        if !report.at_risk_goals.is_empty() {
            tracing::warn!(
                at_risk = report.at_risk_goals.len(),
                "Goals behind schedule"
            );
        }

        report
    }
}
