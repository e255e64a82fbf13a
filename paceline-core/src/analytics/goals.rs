//! Goal progress rollup and goal summary statistics.
//!
//! The goal forest is stored as parent-reference links; before traversal it
//! is rebuilt into explicit id → goal and id → children indexes so that
//! cycle detection and ownership are explicit. Traversal is iterative with
//! a visited set — a revisited in-progress node is data corruption and
//! fails with [`Error::CyclicGoalHierarchy`], never silently resolved.

use crate::error::{Error, Result};
use crate::source::RecordSource;
use crate::types::{Goal, GoalStatus, Task};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Result of a progress computation for one goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    /// Progress derived from linked tasks or child goals
    Computed(u8),
    /// Leaf goal with no linked tasks; the stored value is carried
    /// through unchanged rather than forced to 0
    NoData(u8),
}

impl ProgressOutcome {
    /// The progress percentage, regardless of provenance.
    pub fn value(&self) -> u8 {
        match *self {
            ProgressOutcome::Computed(v) | ProgressOutcome::NoData(v) => v,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, ProgressOutcome::NoData(_))
    }
}

/// Aggregate goal counts for the analytics bundle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GoalSummary {
    pub total_goals: u64,
    pub active_goals: u64,
    pub completed_goals: u64,
    pub on_hold_goals: u64,
    pub cancelled_goals: u64,
    /// Mean progress over active goals; 0 when there are none
    pub average_progress: f64,
    /// Counts keyed by horizon wire name
    pub by_horizon: BTreeMap<String, u64>,
}

/// Computes or recalculates a goal's progress percentage, including
/// hierarchical rollup.
///
/// - A leaf goal's progress is `completed / total * 100` over its directly
///   linked tasks, rounded to the nearest integer.
/// - A parent goal's progress is the average of its children's progress,
///   weighted by each child's total descendant task count; children whose
///   subtree holds no tasks get zero weight so they do not dilute the
///   parent. When every child has zero weight the average is unweighted.
///
/// The computation is pure and idempotent: two runs over the same snapshot
/// yield the same number.
pub struct GoalProgressEngine;

/// Rolled-up state for one node in the forest.
#[derive(Debug, Clone, Copy)]
struct NodeResult {
    /// Progress in [0, 100], before integer rounding
    value: f64,
    /// Task count across the whole subtree, used as the parent's weight
    subtree_tasks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

enum Step {
    Enter(i64),
    Exit(i64),
}

impl GoalProgressEngine {
    /// Pure progress computation; same algorithm as [`Self::recalculate`]
    /// without the write-back.
    pub fn preview(goal_id: i64, goals: &[Goal], tasks: &[Task]) -> Result<ProgressOutcome> {
        let index: HashMap<i64, &Goal> = goals.iter().map(|g| (g.id, g)).collect();
        if !index.contains_key(&goal_id) {
            return Err(Error::GoalNotFound(goal_id));
        }

        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for goal in goals {
            if let Some(parent_id) = goal.parent_goal_id {
                children.entry(parent_id).or_default().push(goal.id);
            }
        }

        // Direct task tallies per goal: (total, completed).
        let mut direct: HashMap<i64, (u64, u64)> = HashMap::new();
        for task in tasks {
            if let Some(gid) = task.parent_goal_id {
                let entry = direct.entry(gid).or_insert((0, 0));
                entry.0 += 1;
                if task.is_completed() {
                    entry.1 += 1;
                }
            }
        }

        let result = Self::rollup(goal_id, &index, &children, &direct)?;
        let value = result.value.round().clamp(0.0, 100.0) as u8;

        // Only a childless goal with no linked tasks has nothing to compute
        // from. A parent always derives a value from its children, even
        // when the whole subtree is task-free (unweighted fallback).
        let is_leaf = children.get(&goal_id).map_or(true, |c| c.is_empty());
        let has_tasks = direct.get(&goal_id).is_some_and(|&(total, _)| total > 0);
        if is_leaf && !has_tasks {
            Ok(ProgressOutcome::NoData(value))
        } else {
            Ok(ProgressOutcome::Computed(value))
        }
    }

    /// Recalculate a goal's progress and write it back through the record
    /// source, using the snapshot's version for the optimistic-concurrency
    /// check. A no-data result performs no write and returns the goal
    /// unchanged.
    pub fn recalculate(
        source: &dyn RecordSource,
        goal_id: i64,
        goals: &[Goal],
        tasks: &[Task],
    ) -> Result<Goal> {
        let outcome = Self::preview(goal_id, goals, tasks)?;
        // preview guarantees the id exists in the snapshot
        let snapshot = goals
            .iter()
            .find(|g| g.id == goal_id)
            .ok_or(Error::GoalNotFound(goal_id))?;

        match outcome {
            ProgressOutcome::NoData(_) => {
                tracing::debug!(goal_id, "No tasks or children, progress unchanged");
                Ok(snapshot.clone())
            }
            ProgressOutcome::Computed(value) => {
                let updated =
                    source.write_goal_progress(goal_id, value, Some(snapshot.version))?;
                tracing::info!(
                    goal_id,
                    progress = value,
                    previous = snapshot.progress_percentage,
                    "Goal progress recalculated"
                );
                Ok(updated)
            }
        }
    }

    /// Iterative post-order rollup with cycle detection.
    fn rollup(
        root: i64,
        index: &HashMap<i64, &Goal>,
        children: &HashMap<i64, Vec<i64>>,
        direct: &HashMap<i64, (u64, u64)>,
    ) -> Result<NodeResult> {
        let mut states: HashMap<i64, VisitState> = HashMap::new();
        let mut results: HashMap<i64, NodeResult> = HashMap::new();
        // Ancestor chain of the node being expanded, for cycle reporting.
        let mut path: Vec<i64> = Vec::new();
        let mut stack = vec![Step::Enter(root)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(id) => {
                    match states.get(&id) {
                        Some(VisitState::InProgress) => {
                            let start = path.iter().position(|&p| p == id).unwrap_or(0);
                            let cycle: Vec<i64> = path[start..].to_vec();
                            tracing::error!(?cycle, "Cycle detected in goal hierarchy");
                            return Err(Error::CyclicGoalHierarchy { cycle });
                        }
                        Some(VisitState::Done) => continue,
                        None => {}
                    }
                    // Links pointing outside the snapshot are data holes,
                    // not cycles; skip them.
                    if !index.contains_key(&id) {
                        continue;
                    }
                    states.insert(id, VisitState::InProgress);
                    path.push(id);
                    stack.push(Step::Exit(id));
                    if let Some(kids) = children.get(&id) {
                        for &child in kids.iter().rev() {
                            stack.push(Step::Enter(child));
                        }
                    }
                }
                Step::Exit(id) => {
                    states.insert(id, VisitState::Done);
                    path.pop();

                    let (task_total, task_completed) =
                        direct.get(&id).copied().unwrap_or((0, 0));
                    let kids: Vec<&NodeResult> = children
                        .get(&id)
                        .map(|ids| ids.iter().filter_map(|c| results.get(c)).collect())
                        .unwrap_or_default();

                    let result = if kids.is_empty() {
                        // Leaf: direct task completion, or carry the stored
                        // value with zero weight when no tasks are linked.
                        if task_total > 0 {
                            NodeResult {
                                value: task_completed as f64 / task_total as f64 * 100.0,
                                subtree_tasks: task_total,
                            }
                        } else {
                            let stored = index[&id].progress_percentage as f64;
                            NodeResult {
                                value: stored,
                                subtree_tasks: 0,
                            }
                        }
                    } else {
                        let weight_sum: u64 = kids.iter().map(|k| k.subtree_tasks).sum();
                        let value = if weight_sum > 0 {
                            kids.iter()
                                .map(|k| k.value * k.subtree_tasks as f64)
                                .sum::<f64>()
                                / weight_sum as f64
                        } else {
                            kids.iter().map(|k| k.value).sum::<f64>() / kids.len() as f64
                        };
                        NodeResult {
                            value,
                            subtree_tasks: task_total + weight_sum,
                        }
                    };
                    results.insert(id, result);
                }
            }
        }

        results
            .get(&root)
            .copied()
            .ok_or(Error::GoalNotFound(root))
    }

    /// Status/horizon counts and average active progress over a snapshot.
    pub fn summarize(goals: &[Goal]) -> GoalSummary {
        let mut summary = GoalSummary::default();
        let mut active_progress_sum = 0u64;

        for goal in goals {
            summary.total_goals += 1;
            match goal.status {
                GoalStatus::Active => {
                    summary.active_goals += 1;
                    active_progress_sum += goal.progress_percentage as u64;
                }
                GoalStatus::Completed => summary.completed_goals += 1,
                GoalStatus::OnHold => summary.on_hold_goals += 1,
                GoalStatus::Cancelled => summary.cancelled_goals += 1,
            }
            *summary
                .by_horizon
                .entry(goal.horizon.as_str().to_string())
                .or_insert(0) += 1;
        }

        if summary.active_goals > 0 {
            summary.average_progress = active_progress_sum as f64 / summary.active_goals as f64;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;
    use crate::types::{Horizon, Task, TaskStatus};
    use chrono::{TimeZone, Utc};

    fn goal(id: i64, parent: Option<i64>, progress: u8) -> Goal {
        Goal {
            id,
            title: format!("goal {}", id),
            horizon: Horizon::Quarterly,
            status: GoalStatus::Active,
            target_date: None,
            progress_percentage: progress,
            parent_goal_id: parent,
            success_criteria: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            completed_at: None,
            version: 1,
            metrics: serde_json::json!({}),
            user_id: 1,
            project_id: None,
        }
    }

    fn task(id: i64, goal_id: i64, completed: bool) -> Task {
        let created = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        Task {
            id,
            title: format!("task {}", id),
            status: if completed {
                TaskStatus::Completed
            } else {
                TaskStatus::NotStarted
            },
            priority: 3,
            category: None,
            estimated_hours: None,
            actual_hours: None,
            due_date: None,
            created_at: created,
            completed_at: completed.then(|| created + chrono::Duration::hours(1)),
            parent_goal_id: Some(goal_id),
            user_id: 1,
            project_id: None,
        }
    }

    #[test]
    fn test_leaf_progress_from_tasks() {
        let goals = vec![goal(1, None, 0)];
        let tasks = vec![task(1, 1, true), task(2, 1, true), task(3, 1, false)];
        let outcome = GoalProgressEngine::preview(1, &goals, &tasks).unwrap();
        assert_eq!(outcome, ProgressOutcome::Computed(67)); // 2/3 rounded
    }

    #[test]
    fn test_leaf_without_tasks_keeps_stored_value() {
        let goals = vec![goal(1, None, 42)];
        let outcome = GoalProgressEngine::preview(1, &goals, &[]).unwrap();
        assert_eq!(outcome, ProgressOutcome::NoData(42));
        assert!(outcome.is_no_data());
    }

    #[test]
    fn test_weighted_rollup() {
        // Child 2: 8 tasks, 8 done (100%). Child 3: 2 tasks, 0 done (0%).
        // Weighted by task count: 8/10 * 100 = 80.
        let goals = vec![goal(1, None, 0), goal(2, Some(1), 0), goal(3, Some(1), 0)];
        let mut tasks: Vec<Task> = (0..8).map(|i| task(i, 2, true)).collect();
        tasks.push(task(8, 3, false));
        tasks.push(task(9, 3, false));

        let outcome = GoalProgressEngine::preview(1, &goals, &tasks).unwrap();
        assert_eq!(outcome, ProgressOutcome::Computed(80));
    }

    #[test]
    fn test_taskless_child_does_not_dilute() {
        // Child 2 is fully done; child 3 has no tasks anywhere and must
        // carry zero weight.
        let goals = vec![goal(1, None, 0), goal(2, Some(1), 0), goal(3, Some(1), 10)];
        let tasks = vec![task(1, 2, true), task(2, 2, true)];
        let outcome = GoalProgressEngine::preview(1, &goals, &tasks).unwrap();
        assert_eq!(outcome, ProgressOutcome::Computed(100));
    }

    #[test]
    fn test_all_zero_weight_falls_back_to_simple_average() {
        // The fallback average is a computed value, not a no-data carry.
        let goals = vec![
            goal(1, None, 0),
            goal(2, Some(1), 30),
            goal(3, Some(1), 70),
        ];
        let outcome = GoalProgressEngine::preview(1, &goals, &[]).unwrap();
        assert_eq!(outcome, ProgressOutcome::Computed(50));
    }

    #[test]
    fn test_recalculate_writes_zero_weight_parent_fallback() {
        // Parent stored at 0 with task-free children at 30 and 70 must be
        // written to the unweighted average, not left stale.
        let goals = vec![
            goal(1, None, 0),
            goal(2, Some(1), 30),
            goal(3, Some(1), 70),
        ];
        let source = InMemorySource::new(vec![], goals.clone());

        let updated = GoalProgressEngine::recalculate(&source, 1, &goals, &[]).unwrap();
        assert_eq!(updated.progress_percentage, 50);
        assert_eq!(updated.version, 2);
        assert_eq!(source.get_goal(1).unwrap().progress_percentage, 50);
    }

    #[test]
    fn test_parent_progress_bounded_by_children() {
        let goals = vec![goal(1, None, 0), goal(2, Some(1), 0), goal(3, Some(1), 0)];
        let tasks = vec![
            task(1, 2, true),
            task(2, 2, false),
            task(3, 3, true),
            task(4, 3, true),
            task(5, 3, false),
        ];
        // Children: 50% and ~67%; parent must land in between.
        let outcome = GoalProgressEngine::preview(1, &goals, &tasks).unwrap();
        let value = outcome.value();
        assert!((50..=67).contains(&value), "got {}", value);
    }

    #[test]
    fn test_deep_chain_rolls_up() {
        let goals = vec![goal(1, None, 0), goal(2, Some(1), 0), goal(3, Some(2), 0)];
        let tasks = vec![task(1, 3, true), task(2, 3, false)];
        let outcome = GoalProgressEngine::preview(1, &goals, &tasks).unwrap();
        assert_eq!(outcome, ProgressOutcome::Computed(50));
    }

    #[test]
    fn test_cycle_is_fatal_and_names_ids() {
        let goals = vec![goal(1, Some(2), 0), goal(2, Some(1), 0)];
        let err = GoalProgressEngine::preview(1, &goals, &[]).unwrap_err();
        match err {
            Error::CyclicGoalHierarchy { mut cycle } => {
                cycle.sort_unstable();
                assert_eq!(cycle, vec![1, 2]);
            }
            other => panic!("expected CyclicGoalHierarchy, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_goal() {
        let goals = vec![goal(1, None, 0)];
        let err = GoalProgressEngine::preview(99, &goals, &[]).unwrap_err();
        assert!(matches!(err, Error::GoalNotFound(99)));
    }

    #[test]
    fn test_dangling_parent_link_is_not_a_cycle() {
        // Child points at a parent outside the snapshot; the child itself
        // still computes.
        let goals = vec![goal(2, Some(99), 0)];
        let tasks = vec![task(1, 2, true)];
        let outcome = GoalProgressEngine::preview(2, &goals, &tasks).unwrap();
        assert_eq!(outcome, ProgressOutcome::Computed(100));
    }

    #[test]
    fn test_recalculate_writes_back_and_is_idempotent() {
        let goals = vec![goal(1, None, 0)];
        let tasks = vec![task(1, 1, true), task(2, 1, false)];
        let source = InMemorySource::new(tasks.clone(), goals.clone());

        let updated = GoalProgressEngine::recalculate(&source, 1, &goals, &tasks).unwrap();
        assert_eq!(updated.progress_percentage, 50);

        // Fresh snapshot, same underlying records: same number.
        let goals2 = vec![updated];
        let again = GoalProgressEngine::recalculate(&source, 1, &goals2, &tasks).unwrap();
        assert_eq!(again.progress_percentage, 50);
    }

    #[test]
    fn test_recalculate_surfaces_write_conflict() {
        let goals = vec![goal(1, None, 0)];
        let tasks = vec![task(1, 1, true)];
        let source = InMemorySource::new(tasks.clone(), goals.clone());

        // Another writer bumps the version between snapshot and write.
        source.write_goal_progress(1, 10, Some(1)).unwrap();

        let err = GoalProgressEngine::recalculate(&source, 1, &goals, &tasks).unwrap_err();
        assert!(matches!(err, Error::ConcurrentUpdateConflict { .. }));
    }

    #[test]
    fn test_recalculate_no_data_skips_write() {
        let goals = vec![goal(1, None, 42)];
        let source = InMemorySource::new(vec![], goals.clone());
        let result = GoalProgressEngine::recalculate(&source, 1, &goals, &[]).unwrap();
        assert_eq!(result.progress_percentage, 42);
        assert_eq!(source.get_goal(1).unwrap().version, 1); // no write
    }

    #[test]
    fn test_summarize() {
        let mut g1 = goal(1, None, 40);
        let mut g2 = goal(2, None, 60);
        let mut g3 = goal(3, None, 100);
        g1.horizon = Horizon::Yearly;
        g2.horizon = Horizon::Weekly;
        g3.status = GoalStatus::Completed;

        let summary = GoalProgressEngine::summarize(&[g1, g2, g3]);
        assert_eq!(summary.total_goals, 3);
        assert_eq!(summary.active_goals, 2);
        assert_eq!(summary.completed_goals, 1);
        assert_eq!(summary.average_progress, 50.0);
        assert_eq!(summary.by_horizon["yearly"], 1);
        assert_eq!(summary.by_horizon["weekly"], 1);
    }
}
