//! Shared context types: scoped, versioned key/value entries.

use crate::{AgentId, EntryId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// CONTEXT SCOPE
// ============================================================================

/// Visibility scope of a context entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ContextScope {
    /// Visible to all agents
    Global,
    /// Private to one agent
    Agent,
    /// Scoped to a task
    Task,
}

impl ContextScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextScope::Global => "Global",
            ContextScope::Agent => "Agent",
            ContextScope::Task => "Task",
        }
    }
}

impl fmt::Display for ContextScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContextScope {
    type Err = ContextScopeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global" => Ok(ContextScope::Global),
            "agent" => Ok(ContextScope::Agent),
            "task" => Ok(ContextScope::Task),
            _ => Err(ContextScopeParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid context scope string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextScopeParseError(pub String);

impl fmt::Display for ContextScopeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid context scope: {}", self.0)
    }
}

impl std::error::Error for ContextScopeParseError {}

// ============================================================================
// CONFLICT STRATEGY
// ============================================================================

/// How concurrent writes to the same key are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ConflictStrategy {
    /// Most recent write wins
    LastWriteWins,
    /// Writes carry an expected version; mismatch is rejected
    VersionCheck,
    /// Union object values, preferring the newer write on key collision
    Merge,
    /// Writer agent priority decides; precedence supplied by the caller
    AgentPriority,
}

impl ConflictStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStrategy::LastWriteWins => "LastWriteWins",
            ConflictStrategy::VersionCheck => "VersionCheck",
            ConflictStrategy::Merge => "Merge",
            ConflictStrategy::AgentPriority => "AgentPriority",
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConflictStrategy {
    type Err = ConflictStrategyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "").as_str() {
            "lastwritewins" => Ok(ConflictStrategy::LastWriteWins),
            "versioncheck" => Ok(ConflictStrategy::VersionCheck),
            "merge" => Ok(ConflictStrategy::Merge),
            "agentpriority" => Ok(ConflictStrategy::AgentPriority),
            _ => Err(ConflictStrategyParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid conflict strategy string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictStrategyParseError(pub String);

impl fmt::Display for ConflictStrategyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid conflict strategy: {}", self.0)
    }
}

impl std::error::Error for ConflictStrategyParseError {}

// ============================================================================
// CONTEXT ENTRY
// ============================================================================

/// A versioned entry in the shared context store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ContextEntry {
    /// Unique identifier for this entry
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub entry_id: EntryId,
    /// Logical key (unqualified; scoping is applied by the store)
    pub key: String,
    /// Stored value
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub value: Value,
    /// Visibility scope
    pub scope: ContextScope,
    /// Owning agent for agent-scoped entries
    pub owner: Option<AgentId>,
    /// Monotonic version, starts at 1
    pub version: u64,
    /// When the entry was first created
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    /// When the entry was last written
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
    /// When the entry expires, if ever
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub expires_at: Option<Timestamp>,
    /// Caller-supplied metadata
    pub metadata: HashMap<String, String>,
}

impl ContextEntry {
    /// Create a fresh version-1 entry.
    pub fn new(key: impl Into<String>, value: Value, scope: ContextScope) -> Self {
        let now = Utc::now();
        Self {
            entry_id: Uuid::now_v7(),
            key: key.into(),
            value,
            scope,
            owner: None,
            version: 1,
            created_at: now,
            updated_at: now,
            expires_at: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the owning agent.
    pub fn with_owner(mut self, owner: impl Into<AgentId>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Set the expiry timestamp.
    pub fn with_expiry(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set the metadata map.
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Check if the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Utc::now() > exp)
    }
}

// ============================================================================
// TESTS
// ============================================================================
