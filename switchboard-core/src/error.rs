//! Error types for SWITCHBOARD operations

use crate::ConflictStrategy;
use thiserror::Error;
use uuid::Uuid;

/// Message broker errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Message {message_id} has no recipient; use broadcast for unaddressed messages")]
    MissingRecipient { message_id: Uuid },

    #[error("Broker lock poisoned")]
    LockPoisoned,
}

/// Event bus errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventBusError {
    #[error("Invalid topic pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Event bus lock poisoned")]
    LockPoisoned,
}

/// Agent registry errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Agent not registered: {agent_id}")]
    AgentNotFound { agent_id: String },

    #[error("Registry lock poisoned")]
    LockPoisoned,
}

/// Context store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("Agent scope requires an agent id for key {key:?}")]
    MissingAgentId { key: String },

    #[error("Version conflict on {key:?}: expected {expected}, current {current}")]
    VersionConflict {
        key: String,
        expected: u64,
        current: u64,
    },

    #[error("Cannot merge an empty entry list")]
    EmptyMergeSet,

    #[error("Cannot merge entries with differing keys: {expected:?} vs {found:?}")]
    MergeKeyMismatch { expected: String, found: String },

    #[error("Merge strategy {strategy:?} requires caller-supplied precedence")]
    UnsupportedMergeStrategy { strategy: ConflictStrategy },

    #[error("Invalid key pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Context store lock poisoned")]
    LockPoisoned,
}

/// Goal manager errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GoalError {
    #[error("Goal not found: {goal_id}")]
    GoalNotFound { goal_id: Uuid },

    #[error("Parent goal not found: {goal_id}")]
    ParentGoalNotFound { goal_id: Uuid },

    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: Uuid },

    #[error("Dependency task not found: {task_id}")]
    DependencyNotFound { task_id: Uuid },

    #[error("Circular dependency detected: {task_ids:?}")]
    CircularDependency { task_ids: Vec<Uuid> },

    #[error("Title must not be empty for {entity}")]
    EmptyTitle { entity: &'static str },

    #[error("Priority {value} is outside 0..=100")]
    InvalidPriority { value: u8 },

    #[error("Progress {value} is outside [0, 100]")]
    InvalidProgress { value: f64 },

    #[error("Effort must be non-negative, got {value}")]
    NegativeEffort { value: f64 },

    #[error("Goal manager lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all SWITCHBOARD errors.
#[derive(Debug, Clone, Error)]
pub enum SwitchboardError {
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    #[error("Goal error: {0}")]
    Goal(#[from] GoalError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for SWITCHBOARD operations.
pub type SwitchboardResult<T> = Result<T, SwitchboardError>;

// =============================================================================
// TESTS
// =============================================================================
