//! Core types for the switchboard agent coordination workspace.
//!
//! This crate carries the shared vocabulary: agent identities and
//! capabilities, messages, context entries, goals and tasks, the error
//! taxonomy, configuration, and the glob pattern matcher. It holds no
//! behavior beyond the types themselves; the broker, event bus, registry,
//! context store, and goal manager crates all build on it.

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod goal;
pub mod message;
pub mod pattern;

pub use agent::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use goal::*;
pub use message::*;
pub use pattern::*;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Opaque caller-supplied agent identifier.
pub type AgentId = String;

/// UTC timestamp used throughout the workspace.
pub type Timestamp = DateTime<Utc>;

/// Message identifier (UUIDv7, generated).
pub type MessageId = Uuid;

/// Context entry identifier (UUIDv7, generated).
pub type EntryId = Uuid;

/// Goal identifier (UUIDv7, generated).
pub type GoalId = Uuid;

/// Task identifier (UUIDv7, generated).
pub type TaskId = Uuid;

/// Subscription handle for event and context subscriptions.
pub type SubscriptionId = Uuid;
