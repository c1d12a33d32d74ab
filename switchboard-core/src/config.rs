//! Coordination configuration.

use crate::error::ConfigError;
use crate::ConflictStrategy;
use serde::{Deserialize, Serialize};

/// Tunables shared by the coordination components.
///
/// Construct with `Default` and override fields, then `validate()` before
/// handing to a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CoordinationConfig {
    /// Seconds without a heartbeat before an agent counts as stale
    pub heartbeat_timeout_secs: u64,
    /// Retained prior versions per context slot
    pub max_history_size: usize,
    /// Conflict strategy used when a write does not specify one
    pub default_conflict_strategy: ConflictStrategy,
    /// Dead letters retained before the oldest are dropped
    pub max_dead_letters: usize,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_secs: 60,
            max_history_size: 10,
            default_conflict_strategy: ConflictStrategy::LastWriteWins,
            max_dead_letters: 1000,
        }
    }
}

impl CoordinationConfig {
    /// Check that every field holds a usable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "heartbeat_timeout_secs".to_string(),
                value: self.heartbeat_timeout_secs.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_history_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_history_size".to_string(),
                value: self.max_history_size.to_string(),
                reason: "must retain at least one version".to_string(),
            });
        }
        if self.max_dead_letters == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_dead_letters".to_string(),
                value: self.max_dead_letters.to_string(),
                reason: "must retain at least one dead letter".to_string(),
            });
        }
        Ok(())
    }

    /// Heartbeat timeout as a `chrono::Duration`.
    pub fn heartbeat_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.heartbeat_timeout_secs as i64)
    }
}

// ============================================================================
// TESTS
// ============================================================================
