//! Core domain types for paceline
//!
//! These types are the canonical data model the analytics engine consumes.
//! Records are created, mutated, and deleted entirely outside this crate;
//! every engine invocation receives a frozen snapshot of them.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Task** | A unit of work, optionally linked to a Goal |
//! | **Goal** | An outcome with a planning horizon; goals form a forest via `parent_goal_id` |
//! | **Horizon** | A Goal's planning timeframe (yearly/quarterly/monthly/weekly) |
//! | **Scope** | The user/project filter the caller has already resolved |
//! | **Snapshot** | The immutable set of Task/Goal records supplied for one computation |
//!
//! The string values produced by `as_str` and the serde representations are
//! the wire contract existing consumers depend on; do not rename them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Task
// ============================================

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(TaskStatus::NotStarted),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(format!("unknown task status: {}", s)),
        }
    }
}

/// A unit of work, optionally linked to a goal.
///
/// Invariant: `completed_at` is set iff `status == Completed`, and
/// `completed_at >= created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (assigned by the serving layer)
    pub id: i64,
    /// Short description of the work
    pub title: String,
    /// Lifecycle status
    pub status: TaskStatus,
    /// Priority, 1 = highest. Small positive integer.
    pub priority: u8,
    /// Free-form label ("development", "marketing", ...). The closed set
    /// is unknown at compile time; groupings key off observed values.
    pub category: Option<String>,
    /// Estimated effort in hours (non-negative)
    pub estimated_hours: Option<f64>,
    /// Actual effort in hours (non-negative)
    pub actual_hours: Option<f64>,
    /// Optional deadline
    pub due_date: Option<DateTime<Utc>>,
    /// When the task was created
    pub created_at: DateTime<Utc>,
    /// When the task was completed (present iff status = completed)
    pub completed_at: Option<DateTime<Utc>>,
    /// Goal this task contributes to, if any
    pub parent_goal_id: Option<i64>,
    /// Owning user
    pub user_id: i64,
    /// Owning project, if the task is project-scoped
    pub project_id: Option<i64>,
}

impl Task {
    /// Whether the task counts as completed.
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Whether the task is overdue at `now`: incomplete with a due date
    /// in the past.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed() && self.due_date.is_some_and(|due| due < now)
    }
}

// ============================================
// Goal
// ============================================

/// Planning timeframe of a goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    Yearly,
    Quarterly,
    Monthly,
    Weekly,
}

impl Horizon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::Yearly => "yearly",
            Horizon::Quarterly => "quarterly",
            Horizon::Monthly => "monthly",
            Horizon::Weekly => "weekly",
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Horizon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yearly" => Ok(Horizon::Yearly),
            "quarterly" => Ok(Horizon::Quarterly),
            "monthly" => Ok(Horizon::Monthly),
            "weekly" => Ok(Horizon::Weekly),
            _ => Err(format!("unknown horizon: {}", s)),
        }
    }
}

/// Lifecycle status of a goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    OnHold,
    Cancelled,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::OnHold => "on_hold",
            GoalStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(GoalStatus::Active),
            "completed" => Ok(GoalStatus::Completed),
            "on_hold" => Ok(GoalStatus::OnHold),
            "cancelled" => Ok(GoalStatus::Cancelled),
            _ => Err(format!("unknown goal status: {}", s)),
        }
    }
}

/// An outcome the user is working toward.
///
/// Goals form a forest via `parent_goal_id`; the relation must be acyclic.
/// `progress_percentage` is the only field this crate ever writes, and that
/// write is delegated back through [`crate::source::RecordSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    /// Unique identifier (assigned by the serving layer)
    pub id: i64,
    /// Short statement of the outcome
    pub title: String,
    /// Planning timeframe
    pub horizon: Horizon,
    /// Lifecycle status
    pub status: GoalStatus,
    /// Optional deadline for the goal
    pub target_date: Option<DateTime<Utc>>,
    /// Derived progress, always in 0..=100
    pub progress_percentage: u8,
    /// Parent goal, if this goal is a sub-goal
    pub parent_goal_id: Option<i64>,
    /// Free-text definition of done
    pub success_criteria: Option<String>,
    /// When the goal was created
    pub created_at: DateTime<Utc>,
    /// When the goal was completed, if it is
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency token; bumped by the record source on
    /// every write to this goal
    pub version: i64,
    /// Key metrics the user chose to track (free-form)
    #[serde(default)]
    pub metrics: serde_json::Value,
    /// Owning user
    pub user_id: i64,
    /// Owning project, if the goal is project-scoped
    pub project_id: Option<i64>,
}

// ============================================
// Scope
// ============================================

/// Caller-resolved ownership filter for a snapshot.
///
/// A task's scope must match its linked goal's scope when linked; the
/// serving layer enforces this before records reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub user_id: i64,
    pub project_id: Option<i64>,
}

impl Scope {
    /// Scope covering everything a user owns.
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id,
            project_id: None,
        }
    }

    /// Scope narrowed to a single project.
    pub fn project(user_id: i64, project_id: i64) -> Self {
        Self {
            user_id,
            project_id: Some(project_id),
        }
    }

    /// Whether a task belongs to this scope.
    pub fn matches_task(&self, task: &Task) -> bool {
        task.user_id == self.user_id
            && self.project_id.map_or(true, |p| task.project_id == Some(p))
    }

    /// Whether a goal belongs to this scope.
    pub fn matches_goal(&self, goal: &Goal) -> bool {
        goal.user_id == self.user_id
            && self.project_id.map_or(true, |p| goal.project_id == Some(p))
    }
}
