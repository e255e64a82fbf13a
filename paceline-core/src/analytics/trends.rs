//! Weekly and category trend deltas, plus rule-based insight strings.

use crate::analytics::Window;
use crate::error::Result;
use crate::types::Task;
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

/// Change thresholds for category direction: at least +10% to count as
/// increasing, at most -10% to count as decreasing.
const DIRECTION_THRESHOLD_PCT: f64 = 10.0;
/// A category falling by at least this much is called out in insights.
const SHARP_DECLINE_PCT: f64 = -50.0;
/// Overall completion-rate bands for insights.
const STRONG_COMPLETION_PCT: f64 = 80.0;
const LOW_COMPLETION_PCT: f64 = 30.0;
/// Share of completions at priority 1-2 worth calling out.
const PRIORITY_DISCIPLINE_PCT: f64 = 60.0;

/// Direction of a category's completion-count change between window halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    fn from_change(change_percentage: f64) -> Self {
        if change_percentage >= DIRECTION_THRESHOLD_PCT {
            TrendDirection::Increasing
        } else if change_percentage <= -DIRECTION_THRESHOLD_PCT {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }
}

/// One ISO week of completion activity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeeklyBucket {
    /// Monday of the ISO week
    pub week_start: NaiveDate,
    pub tasks_completed: u64,
    pub tasks_created: u64,
    /// Completions relative to tasks created that week, as a percentage.
    /// Can exceed 100 when tasks created earlier complete this week; 0
    /// when nothing was created.
    pub completion_rate: f64,
    /// Estimated hours over the week's completions
    pub total_estimated_hours: f64,
}

/// Completion-count comparison for one category across window halves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryTrend {
    pub older: u64,
    pub recent: u64,
    /// `(recent - older) / max(older, 1) * 100`
    pub change_percentage: f64,
    pub direction: TrendDirection,
}

/// Per-week priority mix of completions (high = 1-2, medium = 3, low = 4+).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriorityWeek {
    pub week_start: NaiveDate,
    pub high_priority: u64,
    pub medium_priority: u64,
    pub low_priority: u64,
}

/// Trend analysis over a window.
#[derive(Debug, Clone, Serialize)]
pub struct TrendAnalysis {
    pub period_days: i64,
    pub weekly_completion: Vec<WeeklyBucket>,
    pub category_trends: BTreeMap<String, CategoryTrend>,
    pub priority_distribution: Vec<PriorityWeek>,
    /// Short natural-language observations generated from a fixed rule set
    /// over the computed numbers
    pub insights: Vec<String>,
}

/// Monday of the ISO week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date.week(Weekday::Mon).first_day()
}

/// Computes weekly/category trend deltas and insight strings.
pub struct TrendAnalyzer;

impl TrendAnalyzer {
    pub fn compute(tasks: &[Task], period_days: i64, now: DateTime<Utc>) -> Result<TrendAnalysis> {
        let window = Window::Days(period_days).resolve(now)?;
        let (older, _recent) = window.split_halves();

        let mut weeks: BTreeMap<NaiveDate, WeeklyBucket> = BTreeMap::new();
        let mut priority_weeks: BTreeMap<NaiveDate, PriorityWeek> = BTreeMap::new();
        // Per category: (older-half completions, recent-half completions).
        let mut categories: BTreeMap<String, (u64, u64)> = BTreeMap::new();

        let mut total = 0u64;
        let mut completed = 0u64;
        let mut high_priority_completed = 0u64;

        for task in tasks {
            total += 1;

            if window.contains(task.created_at) {
                let week = week_start(task.created_at.date_naive());
                weeks
                    .entry(week)
                    .or_insert_with(|| empty_week(week))
                    .tasks_created += 1;
            }

            let Some(completed_at) = task.completed_at else {
                continue;
            };
            if !window.contains(completed_at) {
                continue;
            }
            completed += 1;
            if task.priority <= 2 {
                high_priority_completed += 1;
            }

            let week = week_start(completed_at.date_naive());
            let bucket = weeks.entry(week).or_insert_with(|| empty_week(week));
            bucket.tasks_completed += 1;
            bucket.total_estimated_hours += task.estimated_hours.unwrap_or(0.0);

            let pweek = priority_weeks.entry(week).or_insert_with(|| PriorityWeek {
                week_start: week,
                high_priority: 0,
                medium_priority: 0,
                low_priority: 0,
            });
            match task.priority {
                0..=2 => pweek.high_priority += 1,
                3 => pweek.medium_priority += 1,
                _ => pweek.low_priority += 1,
            }

            let category = task.category.as_deref().unwrap_or("uncategorized");
            let halves = categories.entry(category.to_string()).or_insert((0, 0));
            if completed_at < older.end {
                halves.0 += 1;
            } else {
                halves.1 += 1;
            }
        }

        let weekly_completion: Vec<WeeklyBucket> = weeks
            .into_values()
            .map(|mut bucket| {
                if bucket.tasks_created > 0 {
                    bucket.completion_rate =
                        bucket.tasks_completed as f64 / bucket.tasks_created as f64 * 100.0;
                }
                bucket
            })
            .collect();

        let category_trends: BTreeMap<String, CategoryTrend> = categories
            .into_iter()
            .map(|(category, (older_count, recent_count))| {
                let change_percentage = (recent_count as f64 - older_count as f64)
                    / older_count.max(1) as f64
                    * 100.0;
                (
                    category,
                    CategoryTrend {
                        older: older_count,
                        recent: recent_count,
                        change_percentage,
                        direction: TrendDirection::from_change(change_percentage),
                    },
                )
            })
            .collect();

        let priority_distribution: Vec<PriorityWeek> = priority_weeks.into_values().collect();

        let insights = Self::insights(
            total,
            completed,
            high_priority_completed,
            &weekly_completion,
            &category_trends,
        );

        tracing::debug!(
            period_days,
            weeks = weekly_completion.len(),
            categories = category_trends.len(),
            insights = insights.len(),
            "Trend analysis computed"
        );

        Ok(TrendAnalysis {
            period_days,
            weekly_completion,
            category_trends,
            priority_distribution,
            insights,
        })
    }

    /// Fixed, deterministic rule set; order of emitted strings is stable.
    fn insights(
        total: u64,
        completed: u64,
        high_priority_completed: u64,
        weekly: &[WeeklyBucket],
        categories: &BTreeMap<String, CategoryTrend>,
    ) -> Vec<String> {
        let mut insights = Vec::new();

        if total > 0 {
            let rate = completed as f64 / total as f64 * 100.0;
            if rate >= STRONG_COMPLETION_PCT {
                insights.push(format!(
                    "Strong completion rate: {:.0}% of tasks in this window were completed",
                    rate
                ));
            } else if rate < LOW_COMPLETION_PCT {
                insights.push(format!(
                    "Low completion rate: only {:.0}% of tasks in this window were completed",
                    rate
                ));
            }
        }

        // Top focus area by total completions; BTreeMap order breaks ties
        // alphabetically.
        if let Some((name, trend)) = categories
            .iter()
            .max_by_key(|(name, t)| (t.older + t.recent, std::cmp::Reverse(name.as_str())))
        {
            let count = trend.older + trend.recent;
            if count > 0 {
                insights.push(format!(
                    "Top focus area: '{}' accounts for {} completed tasks",
                    name, count
                ));
            }
        }

        for (name, trend) in categories {
            if trend.direction == TrendDirection::Decreasing
                && trend.change_percentage <= SHARP_DECLINE_PCT
            {
                insights.push(format!(
                    "Category '{}' is trending sharply down ({:.0}% vs the older half)",
                    name, trend.change_percentage
                ));
            }
        }

        if weekly.len() >= 3 {
            let n = weekly.len();
            let last = weekly[n - 1].tasks_completed;
            let prev = weekly[n - 2].tasks_completed;
            let before = weekly[n - 3].tasks_completed;
            if last < prev && prev < before {
                insights.push(
                    "Completion velocity has declined two weeks in a row".to_string(),
                );
            }
        }

        if completed > 0 {
            let high_share = high_priority_completed as f64 / completed as f64 * 100.0;
            if high_share > PRIORITY_DISCIPLINE_PCT {
                insights.push(format!(
                    "Strong priority discipline: {:.0}% of completed tasks were high priority",
                    high_share
                ));
            }
        }

        insights
    }
}

fn empty_week(week: NaiveDate) -> WeeklyBucket {
    WeeklyBucket {
        week_start: week,
        tasks_completed: 0,
        tasks_created: 0,
        completion_rate: 0.0,
        total_estimated_hours: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskStatus;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        // A Monday, so week bucketing is easy to reason about.
        Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).unwrap()
    }

    fn task(id: i64, category: &str, priority: u8, completed_days_ago: Option<i64>) -> Task {
        let created = now() - Duration::days(27);
        Task {
            id,
            title: format!("task {}", id),
            status: if completed_days_ago.is_some() {
                TaskStatus::Completed
            } else {
                TaskStatus::NotStarted
            },
            priority,
            category: Some(category.to_string()),
            estimated_hours: Some(2.0),
            actual_hours: None,
            due_date: None,
            created_at: created,
            completed_at: completed_days_ago.map(|d| now() - Duration::days(d)),
            parent_goal_id: None,
            user_id: 1,
            project_id: None,
        }
    }

    #[test]
    fn test_invalid_period_rejected() {
        assert!(TrendAnalyzer::compute(&[], 0, now()).is_err());
    }

    #[test]
    fn test_empty_input_has_no_insights() {
        let analysis = TrendAnalyzer::compute(&[], 28, now()).unwrap();
        assert!(analysis.weekly_completion.is_empty());
        assert!(analysis.category_trends.is_empty());
        assert!(analysis.insights.is_empty());
    }

    #[test]
    fn test_weekly_buckets_key_on_iso_week_start() {
        let tasks = vec![task(1, "dev", 3, Some(1)), task(2, "dev", 3, Some(2))];
        let analysis = TrendAnalyzer::compute(&tasks, 28, now()).unwrap();

        // All created the same week; completions fall in the final week.
        for bucket in &analysis.weekly_completion {
            assert_eq!(bucket.week_start.week(Weekday::Mon).first_day(), bucket.week_start);
        }
        let completed: u64 = analysis
            .weekly_completion
            .iter()
            .map(|b| b.tasks_completed)
            .sum();
        assert_eq!(completed, 2);
    }

    #[test]
    fn test_category_direction_thresholds() {
        // "dev": 1 older, 2 recent -> +100% increasing.
        // "ops": 2 older, 0 recent -> -100% decreasing.
        let tasks = vec![
            task(1, "dev", 3, Some(20)),
            task(2, "dev", 3, Some(3)),
            task(3, "dev", 3, Some(2)),
            task(4, "ops", 3, Some(22)),
            task(5, "ops", 3, Some(21)),
        ];
        let analysis = TrendAnalyzer::compute(&tasks, 28, now()).unwrap();

        let dev = &analysis.category_trends["dev"];
        assert_eq!((dev.older, dev.recent), (1, 2));
        assert_eq!(dev.direction, TrendDirection::Increasing);

        let ops = &analysis.category_trends["ops"];
        assert_eq!((ops.older, ops.recent), (2, 0));
        assert_eq!(ops.change_percentage, -100.0);
        assert_eq!(ops.direction, TrendDirection::Decreasing);

        // -100% is a sharp decline, so it must be called out.
        assert!(analysis
            .insights
            .iter()
            .any(|s| s.contains("'ops'") && s.contains("sharply down")));
    }

    #[test]
    fn test_change_percentage_guards_zero_older() {
        let tasks = vec![task(1, "dev", 3, Some(2))];
        let analysis = TrendAnalyzer::compute(&tasks, 28, now()).unwrap();
        // older = 0: denominator is max(older, 1).
        assert_eq!(analysis.category_trends["dev"].change_percentage, 100.0);
    }

    #[test]
    fn test_strong_completion_insight() {
        let tasks: Vec<Task> = (0..10).map(|i| task(i, "dev", 3, Some(3))).collect();
        let analysis = TrendAnalyzer::compute(&tasks, 28, now()).unwrap();
        assert!(analysis
            .insights
            .iter()
            .any(|s| s.starts_with("Strong completion rate")));
    }

    #[test]
    fn test_priority_discipline_insight() {
        let tasks = vec![
            task(1, "dev", 1, Some(2)),
            task(2, "dev", 2, Some(3)),
            task(3, "dev", 4, Some(4)),
        ];
        let analysis = TrendAnalyzer::compute(&tasks, 28, now()).unwrap();
        assert!(analysis
            .insights
            .iter()
            .any(|s| s.contains("priority discipline")));
    }

    #[test]
    fn test_two_week_decline_insight() {
        // Three ISO weeks: 3, 2, then 1 completions.
        let mut tasks = Vec::new();
        for i in 0..3 {
            tasks.push(task(i, "dev", 3, Some(15 + i as i64))); // week of Mar 10-16
        }
        tasks.push(task(3, "dev", 3, Some(9))); // week of Mar 17-23
        tasks.push(task(4, "dev", 3, Some(8)));
        tasks.push(task(5, "dev", 3, Some(2))); // week of Mar 24-30

        let analysis = TrendAnalyzer::compute(&tasks, 28, now()).unwrap();
        assert!(analysis
            .insights
            .iter()
            .any(|s| s.contains("two weeks in a row")));
    }

    #[test]
    fn test_priority_distribution_buckets() {
        let tasks = vec![
            task(1, "dev", 1, Some(2)),
            task(2, "dev", 3, Some(2)),
            task(3, "dev", 5, Some(2)),
        ];
        let analysis = TrendAnalyzer::compute(&tasks, 28, now()).unwrap();
        assert_eq!(analysis.priority_distribution.len(), 1);
        let week = &analysis.priority_distribution[0];
        assert_eq!(week.high_priority, 1);
        assert_eq!(week.medium_priority, 1);
        assert_eq!(week.low_priority, 1);
    }
}
