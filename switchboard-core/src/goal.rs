//! Goal and task types for hierarchical work tracking.

use crate::{priority, AgentId, GoalId, TaskId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// WORK STATUS
// ============================================================================

/// Status shared by goals and tasks.
///
/// Pending → Planned → InProgress → {Blocked ⇄ InProgress} →
/// Completed | Failed | Cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum WorkStatus {
    /// Created, not yet planned
    Pending,
    /// Broken down, ready to start
    Planned,
    /// Being worked on
    InProgress,
    /// Waiting on a dependency or resource
    Blocked,
    /// Finished successfully
    Completed,
    /// Finished unsuccessfully
    Failed,
    /// Abandoned
    Cancelled,
}

impl WorkStatus {
    /// Canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Pending => "Pending",
            WorkStatus::Planned => "Planned",
            WorkStatus::InProgress => "InProgress",
            WorkStatus::Blocked => "Blocked",
            WorkStatus::Completed => "Completed",
            WorkStatus::Failed => "Failed",
            WorkStatus::Cancelled => "Cancelled",
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkStatus::Completed | WorkStatus::Failed | WorkStatus::Cancelled
        )
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WorkStatus {
    type Err = WorkStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "").as_str() {
            "pending" => Ok(WorkStatus::Pending),
            "planned" => Ok(WorkStatus::Planned),
            "inprogress" => Ok(WorkStatus::InProgress),
            "blocked" => Ok(WorkStatus::Blocked),
            "completed" => Ok(WorkStatus::Completed),
            "failed" => Ok(WorkStatus::Failed),
            "cancelled" | "canceled" => Ok(WorkStatus::Cancelled),
            _ => Err(WorkStatusParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid work status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkStatusParseError(pub String);

impl fmt::Display for WorkStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid work status: {}", self.0)
    }
}

impl std::error::Error for WorkStatusParseError {}

// ============================================================================
// GOAL
// ============================================================================

/// A high-level objective, optionally nested under a parent goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Goal {
    /// Unique identifier
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub goal_id: GoalId,
    /// Short title, non-empty
    pub title: String,
    /// Longer description
    pub description: String,
    /// Current status
    pub status: WorkStatus,
    /// Priority on the 0..=100 scale
    pub priority: u8,
    /// Parent goal, if nested
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub parent_goal_id: Option<GoalId>,
    /// What "done" looks like
    pub success_criteria: Vec<String>,
    /// Agent responsible for the goal
    pub assigned_agent: Option<AgentId>,
    /// When the goal was created
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    /// When work started
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub started_at: Option<Timestamp>,
    /// When the goal completed
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub completed_at: Option<Timestamp>,
    /// Caller-supplied metadata
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub metadata: HashMap<String, Value>,
}

impl Goal {
    /// Create a new pending goal with normal priority.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            goal_id: Uuid::now_v7(),
            title: title.into(),
            description: description.into(),
            status: WorkStatus::Pending,
            priority: priority::NORMAL,
            parent_goal_id: None,
            success_criteria: Vec::new(),
            assigned_agent: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Nest under a parent goal.
    pub fn with_parent(mut self, parent_goal_id: GoalId) -> Self {
        self.parent_goal_id = Some(parent_goal_id);
        self
    }

    /// Set the success criteria.
    pub fn with_success_criteria(mut self, criteria: Vec<String>) -> Self {
        self.success_criteria = criteria;
        self
    }

    /// Assign a responsible agent.
    pub fn with_assigned_agent(mut self, agent_id: impl Into<AgentId>) -> Self {
        self.assigned_agent = Some(agent_id.into());
        self
    }

    /// Set the metadata map.
    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Mark in progress, stamping `started_at` on the first call only.
    pub fn start(&mut self) {
        self.status = WorkStatus::InProgress;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
    }

    /// Mark completed, stamping `completed_at`.
    pub fn complete(&mut self) {
        self.status = WorkStatus::Completed;
        self.completed_at = Some(Utc::now());
    }
}

// ============================================================================
// TASK
// ============================================================================

/// A unit of work belonging to a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Task {
    /// Unique identifier
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub task_id: TaskId,
    /// Owning goal
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub goal_id: GoalId,
    /// Short title, non-empty
    pub title: String,
    /// Longer description
    pub description: String,
    /// Current status
    pub status: WorkStatus,
    /// Agent working the task
    pub assigned_agent: Option<AgentId>,
    /// Tasks that must complete before this one can start
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub dependencies: Vec<TaskId>,
    /// Estimated effort in hours, non-negative
    pub estimated_effort: Option<f64>,
    /// Actual effort in hours, non-negative
    pub actual_effort: Option<f64>,
    /// When the task was created
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    /// When the task completed
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub completed_at: Option<Timestamp>,
    /// Caller-supplied metadata
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub metadata: HashMap<String, Value>,
}

impl Task {
    /// Create a new pending task under the given goal.
    pub fn new(goal_id: GoalId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            task_id: Uuid::now_v7(),
            goal_id,
            title: title.into(),
            description: description.into(),
            status: WorkStatus::Pending,
            assigned_agent: None,
            dependencies: Vec::new(),
            estimated_effort: None,
            actual_effort: None,
            created_at: Utc::now(),
            completed_at: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the dependency list.
    pub fn with_dependencies(mut self, dependencies: Vec<TaskId>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Add a single dependency.
    pub fn with_dependency(mut self, task_id: TaskId) -> Self {
        self.dependencies.push(task_id);
        self
    }

    /// Set the estimated effort in hours.
    pub fn with_estimated_effort(mut self, hours: f64) -> Self {
        self.estimated_effort = Some(hours);
        self
    }

    /// Assign a worker agent.
    pub fn with_assigned_agent(mut self, agent_id: impl Into<AgentId>) -> Self {
        self.assigned_agent = Some(agent_id.into());
        self
    }

    /// Set the metadata map.
    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Mark completed, stamping `completed_at`.
    pub fn complete(&mut self) {
        self.status = WorkStatus::Completed;
        self.completed_at = Some(Utc::now());
    }
}

// ============================================================================
// PROGRESS
// ============================================================================

/// Aggregated progress over a goal's tasks. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProgressInfo {
    /// Goal the counts refer to
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub goal_id: GoalId,
    /// Total tasks under the goal
    pub total_tasks: usize,
    /// Tasks in `Completed` status
    pub completed_tasks: usize,
    /// Tasks in `InProgress` status
    pub in_progress_tasks: usize,
    /// Tasks in `Blocked` status
    pub blocked_tasks: usize,
    /// completed/total in percent, rounded to 2 decimals; 0.0 when no tasks
    pub percent_complete: f64,
    /// Ids of completed tasks
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub completed_task_ids: Vec<TaskId>,
    /// Ids of blocked tasks
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub blocked_task_ids: Vec<TaskId>,
}

// ============================================================================
// TESTS
// ============================================================================
