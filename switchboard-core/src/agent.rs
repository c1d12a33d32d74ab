//! Agent identity, capability, and lifecycle types.

use crate::{AgentId, MessageKind, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// AGENT STATUS
// ============================================================================

/// Lifecycle status of a registered agent.
///
/// Initializing → Active ⇄ Idle ⇄ Busy → Suspended → Terminating →
/// Terminated. Transitions are caller-driven; the registry records them
/// without enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AgentStatus {
    /// Registered but not yet ready for work
    Initializing,
    /// Ready and accepting work
    Active,
    /// Ready but currently unoccupied
    Idle,
    /// At capacity
    Busy,
    /// Deliberately paused
    Suspended,
    /// Shutting down
    Terminating,
    /// Gone; record retained until unregistered
    Terminated,
}

impl AgentStatus {
    /// Canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Initializing => "Initializing",
            AgentStatus::Active => "Active",
            AgentStatus::Idle => "Idle",
            AgentStatus::Busy => "Busy",
            AgentStatus::Suspended => "Suspended",
            AgentStatus::Terminating => "Terminating",
            AgentStatus::Terminated => "Terminated",
        }
    }

    /// Whether the agent has permanently left rotation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Terminated)
    }

    /// Whether the agent can currently accept delegated work.
    pub fn is_available(&self) -> bool {
        matches!(self, AgentStatus::Active | AgentStatus::Idle)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = AgentStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "initializing" => Ok(AgentStatus::Initializing),
            "active" => Ok(AgentStatus::Active),
            "idle" => Ok(AgentStatus::Idle),
            "busy" => Ok(AgentStatus::Busy),
            "suspended" => Ok(AgentStatus::Suspended),
            "terminating" => Ok(AgentStatus::Terminating),
            "terminated" => Ok(AgentStatus::Terminated),
            _ => Err(AgentStatusParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid agent status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStatusParseError(pub String);

impl fmt::Display for AgentStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid agent status: {}", self.0)
    }
}

impl std::error::Error for AgentStatusParseError {}

// ============================================================================
// AGENT CAPABILITY
// ============================================================================

/// What an agent can do, as advertised at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgentCapability {
    /// Capability name, e.g. `"code-review"`
    pub name: String,
    /// Capability version string
    pub version: String,
    /// Actions the agent can perform
    pub supported_actions: Vec<String>,
    /// Message kinds the agent understands
    pub supported_message_kinds: Vec<MessageKind>,
    /// How many tasks the agent can run at once
    pub max_concurrent_tasks: usize,
    /// Named context flags the agent needs to operate
    pub context_requirements: Vec<String>,
}

impl AgentCapability {
    /// Create a capability with no actions and a concurrency of one.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            supported_actions: Vec::new(),
            supported_message_kinds: Vec::new(),
            max_concurrent_tasks: 1,
            context_requirements: Vec::new(),
        }
    }

    /// Set the supported actions.
    pub fn with_actions(mut self, actions: Vec<String>) -> Self {
        self.supported_actions = actions;
        self
    }

    /// Add a single supported action.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.supported_actions.push(action.into());
        self
    }

    /// Set the understood message kinds.
    pub fn with_message_kinds(mut self, kinds: Vec<MessageKind>) -> Self {
        self.supported_message_kinds = kinds;
        self
    }

    /// Set the concurrency limit.
    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    /// Set the required context flags.
    pub fn with_context_requirements(mut self, requirements: Vec<String>) -> Self {
        self.context_requirements = requirements;
        self
    }

    /// Whether this capability covers the given action.
    pub fn supports_action(&self, action: &str) -> bool {
        self.supported_actions.iter().any(|a| a == action)
    }

    /// Whether this capability covers the given message kind.
    pub fn supports_message_kind(&self, kind: MessageKind) -> bool {
        self.supported_message_kinds.contains(&kind)
    }
}

// ============================================================================
// AGENT IDENTITY
// ============================================================================

/// Registry record for a single agent.
///
/// Mutated only through the registry; callers always receive clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgentIdentity {
    /// Caller-chosen stable identifier
    pub agent_id: AgentId,
    /// Human-readable name
    pub display_name: String,
    /// Advertised capability
    pub capability: AgentCapability,
    /// Current lifecycle status
    pub status: AgentStatus,
    /// When the agent registered
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    /// Last heartbeat or status update
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub last_heartbeat: Timestamp,
}

impl AgentIdentity {
    /// Create a new agent record, initially `Initializing`.
    pub fn new(
        agent_id: impl Into<AgentId>,
        display_name: impl Into<String>,
        capability: AgentCapability,
    ) -> Self {
        let now = Utc::now();
        Self {
            agent_id: agent_id.into(),
            display_name: display_name.into(),
            capability,
            status: AgentStatus::Initializing,
            created_at: now,
            last_heartbeat: now,
        }
    }

    /// Set the initial status.
    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    /// Record a heartbeat, refreshing `last_heartbeat`.
    pub fn heartbeat(&mut self) {
        self.last_heartbeat = Utc::now();
    }

    /// Whether the agent has not been heard from within `timeout`.
    pub fn is_stale(&self, timeout: chrono::Duration) -> bool {
        Utc::now() - self.last_heartbeat > timeout
    }
}

// ============================================================================
// TESTS
// ============================================================================
