//! Task aggregation: counts, rates, and time-tracking statistics.

use crate::types::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-group counts for a category or priority bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GroupStats {
    pub total: u64,
    pub completed: u64,
    pub completion_rate: f64,
}

impl GroupStats {
    fn finalize(&mut self) {
        self.completion_rate = rate(self.completed, self.total);
    }
}

/// Estimated-vs-actual effort statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimeTracking {
    /// Sum of `estimated_hours` over tasks that report it
    pub total_estimated_hours: f64,
    /// Sum of `actual_hours` over tasks that report it
    pub total_actual_hours: f64,
    /// `100 - mean(|estimated - actual| / estimated) * 100`, computed only
    /// over tasks with estimated > 0 and an actual figure; clamped to
    /// [0, 100]. Zero when no task qualifies.
    pub accuracy_rate: f64,
}

/// Aggregate statistics over a task snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskAnalytics {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub in_progress: u64,
    /// `completed / total * 100`; 0 when the snapshot is empty
    pub completion_rate: f64,
    /// Mean of `(completed_at - created_at)` in hours over tasks carrying
    /// both timestamps; 0 when none qualify
    pub average_completion_time_hours: f64,
    /// Grouping keyed by the category values observed in the snapshot.
    /// Uncategorized tasks fall into "uncategorized".
    pub by_category: BTreeMap<String, GroupStats>,
    /// Grouping keyed by the priority values observed in the snapshot
    pub by_priority: BTreeMap<u8, GroupStats>,
    /// Counts keyed by status wire name
    pub by_status: BTreeMap<String, u64>,
    pub time_tracking: TimeTracking,
    /// Incomplete tasks whose due date has passed
    pub overdue_count: u64,
}

fn rate(completed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}

/// Computes count/rate/time-tracking statistics over a task set.
///
/// A pure, total function: any input including the empty set yields a
/// well-defined result, never an error. Grouping is a single pass over the
/// snapshot; maps are ordered so output is deterministic.
pub struct TaskAggregator;

impl TaskAggregator {
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> TaskAnalytics {
        let mut analytics = TaskAnalytics::default();
        let mut completion_hours_sum = 0.0f64;
        let mut completion_hours_count = 0u64;
        let mut accuracy_error_sum = 0.0f64;
        let mut accuracy_count = 0u64;

        for task in tasks {
            analytics.total += 1;
            match task.status {
                TaskStatus::Completed => analytics.completed += 1,
                TaskStatus::NotStarted => analytics.pending += 1,
                TaskStatus::InProgress => analytics.in_progress += 1,
            }
            *analytics
                .by_status
                .entry(task.status.as_str().to_string())
                .or_insert(0) += 1;

            let category = task.category.as_deref().unwrap_or("uncategorized");
            let group = analytics
                .by_category
                .entry(category.to_string())
                .or_default();
            group.total += 1;
            if task.is_completed() {
                group.completed += 1;
            }

            let group = analytics.by_priority.entry(task.priority).or_default();
            group.total += 1;
            if task.is_completed() {
                group.completed += 1;
            }

            if let Some(completed_at) = task.completed_at {
                let hours = (completed_at - task.created_at).num_seconds() as f64 / 3600.0;
                completion_hours_sum += hours.max(0.0);
                completion_hours_count += 1;
            }

            if let Some(estimated) = task.estimated_hours {
                analytics.time_tracking.total_estimated_hours += estimated;
            }
            if let Some(actual) = task.actual_hours {
                analytics.time_tracking.total_actual_hours += actual;
            }
            // Zero estimates are excluded rather than dividing by zero.
            if let (Some(estimated), Some(actual)) = (task.estimated_hours, task.actual_hours) {
                if estimated > 0.0 {
                    accuracy_error_sum += (estimated - actual).abs() / estimated;
                    accuracy_count += 1;
                }
            }

            if task.is_overdue(now) {
                analytics.overdue_count += 1;
            }
        }

        analytics.completion_rate = rate(analytics.completed, analytics.total);
        if completion_hours_count > 0 {
            analytics.average_completion_time_hours =
                completion_hours_sum / completion_hours_count as f64;
        }
        if accuracy_count > 0 {
            let mean_error = accuracy_error_sum / accuracy_count as f64;
            analytics.time_tracking.accuracy_rate = (100.0 - mean_error * 100.0).clamp(0.0, 100.0);
        }

        for group in analytics.by_category.values_mut() {
            group.finalize();
        }
        for group in analytics.by_priority.values_mut() {
            group.finalize();
        }

        tracing::debug!(
            total = analytics.total,
            completed = analytics.completed,
            completion_rate = analytics.completion_rate,
            "Task aggregation computed"
        );

        analytics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap()
    }

    fn task(id: i64, category: &str, completed: bool) -> Task {
        let created = now() - Duration::days(3);
        Task {
            id,
            title: format!("task {}", id),
            status: if completed {
                TaskStatus::Completed
            } else {
                TaskStatus::NotStarted
            },
            priority: 3,
            category: Some(category.to_string()),
            estimated_hours: None,
            actual_hours: None,
            due_date: None,
            created_at: created,
            completed_at: completed.then(|| created + Duration::hours(12)),
            parent_goal_id: None,
            user_id: 1,
            project_id: None,
        }
    }

    #[test]
    fn test_empty_snapshot_is_all_zero() {
        let analytics = TaskAggregator::compute(&[], now());
        assert_eq!(analytics.total, 0);
        assert_eq!(analytics.completion_rate, 0.0);
        assert_eq!(analytics.average_completion_time_hours, 0.0);
        assert!(analytics.by_category.is_empty());
        assert!(analytics.by_priority.is_empty());
    }

    // 10 tasks, 6 completed, categories a (4 total / 2 completed) and
    // b (6 total / 4 completed).
    #[test]
    fn test_two_category_scenario() {
        let mut tasks = Vec::new();
        for i in 0..4 {
            tasks.push(task(i, "a", i < 2));
        }
        for i in 4..10 {
            tasks.push(task(i, "b", i < 8));
        }

        let analytics = TaskAggregator::compute(&tasks, now());
        assert_eq!(analytics.total, 10);
        assert_eq!(analytics.completed, 6);
        assert_eq!(analytics.completion_rate, 60.0);
        assert_eq!(analytics.by_category["a"].completion_rate, 50.0);
        assert!((analytics.by_category["b"].completion_rate - 66.666_666).abs() < 0.001);

        // Group totals partition the snapshot.
        let category_sum: u64 = analytics.by_category.values().map(|g| g.total).sum();
        let priority_sum: u64 = analytics.by_priority.values().map(|g| g.total).sum();
        assert_eq!(category_sum, analytics.total);
        assert_eq!(priority_sum, analytics.total);
    }

    #[test]
    fn test_all_completed_rate_is_100() {
        let tasks: Vec<Task> = (0..5).map(|i| task(i, "a", true)).collect();
        let analytics = TaskAggregator::compute(&tasks, now());
        assert_eq!(analytics.completion_rate, 100.0);
        assert_eq!(analytics.average_completion_time_hours, 12.0);
    }

    #[test]
    fn test_accuracy_excludes_zero_estimates() {
        let mut a = task(1, "a", true);
        a.estimated_hours = Some(4.0);
        a.actual_hours = Some(5.0); // 25% off
        let mut b = task(2, "a", true);
        b.estimated_hours = Some(0.0); // excluded
        b.actual_hours = Some(9.0);
        let mut c = task(3, "a", false);
        c.estimated_hours = Some(2.0); // no actual, excluded from accuracy

        let analytics = TaskAggregator::compute(&[a, b, c], now());
        assert_eq!(analytics.time_tracking.total_estimated_hours, 6.0);
        assert_eq!(analytics.time_tracking.total_actual_hours, 14.0);
        assert_eq!(analytics.time_tracking.accuracy_rate, 75.0);
    }

    #[test]
    fn test_accuracy_clamped_at_zero() {
        let mut a = task(1, "a", true);
        a.estimated_hours = Some(1.0);
        a.actual_hours = Some(10.0); // 900% off
        let analytics = TaskAggregator::compute(&[a], now());
        assert_eq!(analytics.time_tracking.accuracy_rate, 0.0);
    }

    #[test]
    fn test_overdue_count() {
        let mut a = task(1, "a", false);
        a.due_date = Some(now() - Duration::days(1));
        let mut b = task(2, "a", true);
        b.due_date = Some(now() - Duration::days(1)); // completed, not overdue
        let analytics = TaskAggregator::compute(&[a, b], now());
        assert_eq!(analytics.overdue_count, 1);
    }

    #[test]
    fn test_uncategorized_bucket() {
        let mut a = task(1, "a", false);
        a.category = None;
        let analytics = TaskAggregator::compute(&[a], now());
        assert_eq!(analytics.by_category["uncategorized"].total, 1);
    }
}
