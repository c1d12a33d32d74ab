//! Message types for agent coordination.
//!
//! Messages are immutable once constructed; the broker only routes them.

use crate::{AgentId, MessageId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// MESSAGE KIND
// ============================================================================

/// Kind of agent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum MessageKind {
    /// Request expecting a correlated response
    Request,
    /// Response to a prior request
    Response,
    /// One-way notification
    Notification,
    /// Fan-out to all interested agents
    Broadcast,
    /// Heartbeat/keepalive
    Heartbeat,
    /// Task delegation to another agent
    TaskDelegation,
    /// Completion report for a delegated task
    TaskCompletion,
    /// Request for shared context
    ContextRequest,
    /// Sharing context with another agent
    ContextShare,
    /// Error report
    Error,
    /// Shutdown signal
    Shutdown,
}

impl MessageKind {
    /// Canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Request => "Request",
            MessageKind::Response => "Response",
            MessageKind::Notification => "Notification",
            MessageKind::Broadcast => "Broadcast",
            MessageKind::Heartbeat => "Heartbeat",
            MessageKind::TaskDelegation => "TaskDelegation",
            MessageKind::TaskCompletion => "TaskCompletion",
            MessageKind::ContextRequest => "ContextRequest",
            MessageKind::ContextShare => "ContextShare",
            MessageKind::Error => "Error",
            MessageKind::Shutdown => "Shutdown",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = MessageKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "").as_str() {
            "request" => Ok(MessageKind::Request),
            "response" => Ok(MessageKind::Response),
            "notification" => Ok(MessageKind::Notification),
            "broadcast" => Ok(MessageKind::Broadcast),
            "heartbeat" => Ok(MessageKind::Heartbeat),
            "taskdelegation" => Ok(MessageKind::TaskDelegation),
            "taskcompletion" => Ok(MessageKind::TaskCompletion),
            "contextrequest" => Ok(MessageKind::ContextRequest),
            "contextshare" => Ok(MessageKind::ContextShare),
            "error" => Ok(MessageKind::Error),
            "shutdown" => Ok(MessageKind::Shutdown),
            _ => Err(MessageKindParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid message kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageKindParseError(pub String);

impl fmt::Display for MessageKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid message kind: {}", self.0)
    }
}

impl std::error::Error for MessageKindParseError {}

// ============================================================================
// PRIORITY
// ============================================================================

/// Named points on the 0..=100 message priority scale.
pub mod priority {
    pub const LOWEST: u8 = 0;
    pub const LOW: u8 = 25;
    pub const NORMAL: u8 = 50;
    pub const HIGH: u8 = 75;
    pub const HIGHEST: u8 = 100;
}

// ============================================================================
// AGENT MESSAGE
// ============================================================================

/// A message between agents.
///
/// Payloads are opaque to the subsystem; it never inspects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgentMessage {
    /// Unique identifier for this message
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub message_id: MessageId,
    /// Agent sending the message
    pub from_agent: AgentId,
    /// Recipient agent; absent means broadcast
    pub to_agent: Option<AgentId>,
    /// Kind of message
    pub kind: MessageKind,
    /// Priority on the 0..=100 scale, higher served first
    pub priority: u8,
    /// Opaque payload
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub payload: serde_json::Map<String, Value>,
    /// When the message was created
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    /// Correlation id for request/response pairing
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub correlation_id: Option<MessageId>,
    /// When the message expires
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub expires_at: Option<Timestamp>,
}

impl AgentMessage {
    /// Create a new message addressed to a specific agent.
    pub fn to_agent(
        from_agent: impl Into<AgentId>,
        to_agent: impl Into<AgentId>,
        kind: MessageKind,
    ) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            from_agent: from_agent.into(),
            to_agent: Some(to_agent.into()),
            kind,
            priority: priority::NORMAL,
            payload: serde_json::Map::new(),
            created_at: Utc::now(),
            correlation_id: None,
            expires_at: None,
        }
    }

    /// Create a new unaddressed broadcast message.
    pub fn broadcast(from_agent: impl Into<AgentId>, kind: MessageKind) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            from_agent: from_agent.into(),
            to_agent: None,
            kind,
            priority: priority::NORMAL,
            payload: serde_json::Map::new(),
            created_at: Utc::now(),
            correlation_id: None,
            expires_at: None,
        }
    }

    /// Set priority, clamped to the 0..=100 scale.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.min(self::priority::HIGHEST);
        self
    }

    /// Set the payload map.
    pub fn with_payload(mut self, payload: serde_json::Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Insert a single payload entry.
    pub fn with_payload_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Set the correlation id (pairs a response with its request).
    pub fn with_correlation(mut self, correlation_id: MessageId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Set the expiry timestamp.
    pub fn with_expiry(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Check if the message has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Utc::now() > exp)
    }

    /// Check if the message is unaddressed.
    pub fn is_broadcast(&self) -> bool {
        self.to_agent.is_none()
    }
}

// ============================================================================
// DEAD LETTERS
// ============================================================================

/// Why a message was diverted to the dead-letter queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum DeadLetterReason {
    /// Message expired before or during delivery
    Expired,
    /// Recipient queue no longer exists
    Undeliverable,
}

impl fmt::Display for DeadLetterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadLetterReason::Expired => write!(f, "expired"),
            DeadLetterReason::Undeliverable => write!(f, "undeliverable"),
        }
    }
}

/// A message that could not or should not be delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeadLetter {
    /// The undelivered message
    pub message: AgentMessage,
    /// Why it was diverted
    pub reason: DeadLetterReason,
    /// When it was recorded
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub recorded_at: Timestamp,
}

impl DeadLetter {
    /// Record a message with the given reason.
    pub fn new(message: AgentMessage, reason: DeadLetterReason) -> Self {
        Self {
            message,
            reason,
            recorded_at: Utc::now(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
