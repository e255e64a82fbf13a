//! Record source seam.
//!
//! The engine never owns persistence. [`RecordSource`] is the boundary it
//! reads snapshots through and performs its single write through; the
//! serving layer provides the production implementation on top of whatever
//! store it uses. [`InMemorySource`] is the reference implementation used
//! by tests.

use crate::analytics::ResolvedWindow;
use crate::error::{Error, Result};
use crate::types::{Goal, Scope, Task};
use std::sync::Mutex;

/// Supplies immutable Task/Goal snapshots and accepts the one write the
/// engine performs.
///
/// ## Single-writer contract
///
/// `write_goal_progress` is the only mutation in this crate and it targets
/// exactly one field, `Goal::progress_percentage`. Implementations must
/// enforce an optimistic-concurrency check: when `expected_version` is
/// `Some`, the write succeeds only if the stored goal still carries that
/// version, otherwise it fails with
/// [`Error::ConcurrentUpdateConflict`]. This serializes concurrent
/// recalculation requests racing on the same goal.
pub trait RecordSource: Send + Sync {
    /// Tasks in scope, optionally restricted to a time window. Window
    /// filtering matches tasks whose `completed_at` (completed tasks) or
    /// `created_at` (others) falls inside the resolved bounds.
    fn list_tasks(&self, scope: Scope, window: Option<&ResolvedWindow>) -> Result<Vec<Task>>;

    /// All goals in scope.
    fn list_goals(&self, scope: Scope) -> Result<Vec<Goal>>;

    /// Write back a recalculated progress percentage, returning the
    /// updated goal. Fails with [`Error::GoalNotFound`] for unknown ids
    /// and [`Error::ConcurrentUpdateConflict`] when the version check
    /// does not hold.
    fn write_goal_progress(
        &self,
        goal_id: i64,
        value: u8,
        expected_version: Option<i64>,
    ) -> Result<Goal>;
}

/// Mutex-guarded in-memory record source.
///
/// Enforces the same version check a production store would, so conflict
/// paths are exercised in tests.
#[derive(Default)]
pub struct InMemorySource {
    inner: Mutex<Records>,
}

#[derive(Default)]
struct Records {
    tasks: Vec<Task>,
    goals: Vec<Goal>,
}

impl InMemorySource {
    pub fn new(tasks: Vec<Task>, goals: Vec<Goal>) -> Self {
        Self {
            inner: Mutex::new(Records { tasks, goals }),
        }
    }

    /// Fetch a goal by id (test helper).
    pub fn get_goal(&self, goal_id: i64) -> Option<Goal> {
        self.inner
            .lock()
            .unwrap()
            .goals
            .iter()
            .find(|g| g.id == goal_id)
            .cloned()
    }
}

impl RecordSource for InMemorySource {
    fn list_tasks(&self, scope: Scope, window: Option<&ResolvedWindow>) -> Result<Vec<Task>> {
        let records = self.inner.lock().unwrap();
        Ok(records
            .tasks
            .iter()
            .filter(|t| scope.matches_task(t))
            .filter(|t| match window {
                None => true,
                Some(w) => w.contains(t.completed_at.unwrap_or(t.created_at)),
            })
            .cloned()
            .collect())
    }

    fn list_goals(&self, scope: Scope) -> Result<Vec<Goal>> {
        let records = self.inner.lock().unwrap();
        Ok(records
            .goals
            .iter()
            .filter(|g| scope.matches_goal(g))
            .cloned()
            .collect())
    }

    fn write_goal_progress(
        &self,
        goal_id: i64,
        value: u8,
        expected_version: Option<i64>,
    ) -> Result<Goal> {
        let mut records = self.inner.lock().unwrap();
        let goal = records
            .goals
            .iter_mut()
            .find(|g| g.id == goal_id)
            .ok_or(Error::GoalNotFound(goal_id))?;

        if let Some(expected) = expected_version {
            if goal.version != expected {
                return Err(Error::ConcurrentUpdateConflict {
                    goal_id,
                    expected_version: expected,
                    actual_version: goal.version,
                });
            }
        }

        goal.progress_percentage = value.min(100);
        goal.version += 1;
        tracing::debug!(goal_id, value, version = goal.version, "Progress written");
        Ok(goal.clone())
    }
}
