//! Agent registry.
//!
//! Tracks which agents exist, what they can do, and when they were last
//! heard from. Status transitions are caller-driven; staleness is derived
//! from heartbeat age at query time, never flipped by a background thread.

use std::collections::HashMap;
use std::sync::RwLock;

use switchboard_core::{
    AgentId, AgentIdentity, AgentStatus, CoordinationConfig, MessageKind, RegistryError,
    SwitchboardResult,
};

/// In-memory agent registry.
#[derive(Debug)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<AgentId, AgentIdentity>>,
    heartbeat_timeout: chrono::Duration,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    /// Create a registry with the default 60 second heartbeat timeout.
    pub fn new() -> Self {
        Self::with_config(&CoordinationConfig::default())
    }

    /// Create a registry from explicit configuration.
    pub fn with_config(config: &CoordinationConfig) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            heartbeat_timeout: config.heartbeat_timeout(),
        }
    }

    /// Register an agent, stamping its heartbeat to now.
    ///
    /// Re-registering an existing id replaces the record.
    pub fn register(&self, mut agent: AgentIdentity) -> SwitchboardResult<()> {
        agent.heartbeat();
        let mut agents = self.write()?;
        let replaced = agents.insert(agent.agent_id.clone(), agent).is_some();
        if replaced {
            tracing::debug!("agent re-registered, prior record replaced");
        }
        Ok(())
    }

    /// Remove an agent. Returns whether it was registered.
    pub fn unregister(&self, agent_id: &str) -> SwitchboardResult<bool> {
        let mut agents = self.write()?;
        Ok(agents.remove(agent_id).is_some())
    }

    /// Cloned record for an agent, if registered.
    pub fn get(&self, agent_id: &str) -> SwitchboardResult<Option<AgentIdentity>> {
        let agents = self.read()?;
        Ok(agents.get(agent_id).cloned())
    }

    /// Agents whose capability supports the given action.
    pub fn find_by_capability(&self, action: &str) -> SwitchboardResult<Vec<AgentIdentity>> {
        let agents = self.read()?;
        Ok(agents
            .values()
            .filter(|a| a.capability.supports_action(action))
            .cloned()
            .collect())
    }

    /// Agents whose capability covers the given message kind.
    pub fn find_by_message_kind(&self, kind: MessageKind) -> SwitchboardResult<Vec<AgentIdentity>> {
        let agents = self.read()?;
        Ok(agents
            .values()
            .filter(|a| a.capability.supports_message_kind(kind))
            .cloned()
            .collect())
    }

    /// Record a heartbeat for an agent.
    ///
    /// An unknown agent is a warn-level no-op, not an error: a heartbeat
    /// can legitimately race its sender's unregistration.
    pub fn heartbeat(&self, agent_id: &str) -> SwitchboardResult<()> {
        let mut agents = self.write()?;
        match agents.get_mut(agent_id) {
            Some(agent) => agent.heartbeat(),
            None => tracing::warn!(agent_id, "heartbeat from unregistered agent"),
        }
        Ok(())
    }

    /// Set an agent's status.
    ///
    /// Does not count as a heartbeat: liveness is proven only by
    /// `heartbeat()`, so an agent that merely flips status still goes
    /// stale.
    pub fn update_status(&self, agent_id: &str, status: AgentStatus) -> SwitchboardResult<()> {
        let mut agents = self.write()?;
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::AgentNotFound {
                agent_id: agent_id.to_string(),
            })?;
        agent.status = status;
        Ok(())
    }

    /// Agents whose last heartbeat is older than the configured timeout.
    pub fn stale_agents(&self) -> SwitchboardResult<Vec<AgentIdentity>> {
        let agents = self.read()?;
        Ok(agents
            .values()
            .filter(|a| a.is_stale(self.heartbeat_timeout))
            .cloned()
            .collect())
    }

    /// All registered agents.
    pub fn list(&self) -> SwitchboardResult<Vec<AgentIdentity>> {
        let agents = self.read()?;
        Ok(agents.values().cloned().collect())
    }

    /// Number of registered agents.
    pub fn len(&self) -> SwitchboardResult<usize> {
        Ok(self.read()?.len())
    }

    /// Whether no agents are registered.
    pub fn is_empty(&self) -> SwitchboardResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<AgentId, AgentIdentity>>, RegistryError>
    {
        self.agents.read().map_err(|_| RegistryError::LockPoisoned)
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<AgentId, AgentIdentity>>, RegistryError>
    {
        self.agents.write().map_err(|_| RegistryError::LockPoisoned)
    }
}

// ============================================================================
// TESTS
// ============================================================================
