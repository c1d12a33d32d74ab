//! Priority message broker.
//!
//! Point-to-point and broadcast delivery between agents. Messages are
//! queued per recipient in priority order (higher first, FIFO within a
//! priority), expired messages divert to a dead-letter queue, and
//! broadcasts fan out to agents whose subscription covers the message
//! kind. Everything lives in memory under a single mutex; nothing
//! survives a restart.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use switchboard_core::{
    AgentId, AgentMessage, BrokerError, CoordinationConfig, DeadLetter, DeadLetterReason,
    MessageKind, SwitchboardResult,
};

// ============================================================================
// QUEUE ORDERING
// ============================================================================

/// Heap entry. Ordered so the max-heap pops the highest priority first,
/// and within equal priority the lowest sequence number (oldest) first.
#[derive(Debug, Clone)]
struct QueuedMessage {
    priority: u8,
    seq: u64,
    message: AgentMessage,
}

impl PartialEq for QueuedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedMessage {}

impl PartialOrd for QueuedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedMessage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ============================================================================
// MESSAGE BROKER
// ============================================================================

#[derive(Debug, Default)]
struct BrokerState {
    /// Per-recipient priority queues, created on first use
    queues: HashMap<AgentId, BinaryHeap<QueuedMessage>>,
    /// Agent interest; an empty set is a wildcard listener
    subscriptions: HashMap<AgentId, HashSet<MessageKind>>,
    /// Messages that expired or lost their recipient, oldest first
    dead_letters: VecDeque<DeadLetter>,
    /// Monotonic sequence assigned at enqueue time, so ties are impossible
    seq: u64,
}

/// In-memory priority message broker.
#[derive(Debug)]
pub struct MessageBroker {
    state: Mutex<BrokerState>,
    max_dead_letters: usize,
}

impl Default for MessageBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBroker {
    /// Create a broker with default configuration.
    pub fn new() -> Self {
        Self::with_config(&CoordinationConfig::default())
    }

    /// Create a broker from explicit configuration.
    pub fn with_config(config: &CoordinationConfig) -> Self {
        Self {
            state: Mutex::new(BrokerState::default()),
            max_dead_letters: config.max_dead_letters,
        }
    }

    /// Register an agent's interest in the given message kinds.
    ///
    /// Idempotent: kinds are unioned into any existing subscription.
    /// An empty `kinds` slice subscribes the agent as a wildcard listener.
    /// Ensures the agent has a queue.
    pub fn subscribe(&self, agent_id: &str, kinds: &[MessageKind]) -> SwitchboardResult<()> {
        let mut state = self.lock()?;
        state
            .subscriptions
            .entry(agent_id.to_string())
            .or_default()
            .extend(kinds.iter().copied());
        state.queues.entry(agent_id.to_string()).or_default();
        tracing::debug!(agent_id, kinds = kinds.len(), "agent subscribed");
        Ok(())
    }

    /// Drop an agent's interest and discard its pending queue.
    ///
    /// Pending messages are recorded as undeliverable dead letters.
    /// Returns whether the agent was subscribed.
    pub fn unsubscribe(&self, agent_id: &str) -> SwitchboardResult<bool> {
        let mut state = self.lock()?;
        let was_subscribed = state.subscriptions.remove(agent_id).is_some();
        if let Some(queue) = state.queues.remove(agent_id) {
            let pending = queue.len();
            for queued in queue.into_sorted_vec() {
                Self::record_dead_letter(
                    &mut state,
                    self.max_dead_letters,
                    queued.message,
                    DeadLetterReason::Undeliverable,
                );
            }
            if pending > 0 {
                tracing::debug!(agent_id, pending, "discarded pending queue on unsubscribe");
            }
        }
        Ok(was_subscribed)
    }

    /// Deliver a message to its named recipient.
    ///
    /// Fails if the message carries no recipient. An already-expired
    /// message diverts to the dead-letter queue and is not an error.
    pub fn send(&self, message: AgentMessage) -> SwitchboardResult<()> {
        let recipient = match message.to_agent.clone() {
            Some(recipient) => recipient,
            None => {
                return Err(BrokerError::MissingRecipient {
                    message_id: message.message_id,
                }
                .into())
            }
        };

        let mut state = self.lock()?;
        if message.is_expired() {
            tracing::debug!(
                message_id = %message.message_id,
                recipient,
                "message expired before delivery"
            );
            Self::record_dead_letter(
                &mut state,
                self.max_dead_letters,
                message,
                DeadLetterReason::Expired,
            );
            return Ok(());
        }

        Self::enqueue(&mut state, &recipient, message);
        Ok(())
    }

    /// Fan a message out to every interested agent.
    ///
    /// Interested means the agent's subscription set contains the message
    /// kind, or is empty (wildcard). Zero interested agents drops the
    /// message with a diagnostic; it is not an error.
    pub fn broadcast(&self, message: AgentMessage) -> SwitchboardResult<usize> {
        let mut state = self.lock()?;
        if message.is_expired() {
            tracing::debug!(
                message_id = %message.message_id,
                "broadcast expired before delivery"
            );
            Self::record_dead_letter(
                &mut state,
                self.max_dead_letters,
                message,
                DeadLetterReason::Expired,
            );
            return Ok(0);
        }

        let interested: Vec<AgentId> = state
            .subscriptions
            .iter()
            .filter(|(_, kinds)| kinds.is_empty() || kinds.contains(&message.kind))
            .map(|(agent_id, _)| agent_id.clone())
            .collect();

        if interested.is_empty() {
            tracing::debug!(
                message_id = %message.message_id,
                kind = %message.kind,
                "broadcast dropped: no interested agents"
            );
            return Ok(0);
        }

        let delivered = interested.len();
        for agent_id in interested {
            Self::enqueue(&mut state, &agent_id, message.clone());
        }
        Ok(delivered)
    }

    /// Dispatch on addressing: `send` when a recipient is set, else
    /// `broadcast`.
    pub fn publish(&self, message: AgentMessage) -> SwitchboardResult<()> {
        if message.to_agent.is_some() {
            self.send(message)
        } else {
            self.broadcast(message).map(|_| ())
        }
    }

    /// Drain up to `max` pending messages for an agent, priority order.
    ///
    /// Messages found expired during the drain divert to dead letters and
    /// do not count against `max`. `None` drains everything.
    pub fn pending(&self, agent_id: &str, max: Option<usize>) -> SwitchboardResult<Vec<AgentMessage>> {
        let mut state = self.lock()?;
        let limit = max.unwrap_or(usize::MAX);
        let mut drained = Vec::new();

        while drained.len() < limit {
            let queued = match state.queues.get_mut(agent_id).and_then(BinaryHeap::pop) {
                Some(queued) => queued,
                None => break,
            };
            if queued.message.is_expired() {
                tracing::debug!(
                    message_id = %queued.message.message_id,
                    agent_id,
                    "message expired in queue"
                );
                Self::record_dead_letter(
                    &mut state,
                    self.max_dead_letters,
                    queued.message,
                    DeadLetterReason::Expired,
                );
                continue;
            }
            drained.push(queued.message);
        }

        Ok(drained)
    }

    /// Snapshot of the dead-letter queue, oldest first.
    pub fn dead_letters(&self) -> SwitchboardResult<Vec<DeadLetter>> {
        let state = self.lock()?;
        Ok(state.dead_letters.iter().cloned().collect())
    }

    /// Clear the dead-letter queue, returning how many were dropped.
    pub fn clear_dead_letters(&self) -> SwitchboardResult<usize> {
        let mut state = self.lock()?;
        let count = state.dead_letters.len();
        state.dead_letters.clear();
        Ok(count)
    }

    /// Number of messages queued for an agent, including any not yet
    /// noticed as expired.
    pub fn queue_depth(&self, agent_id: &str) -> SwitchboardResult<usize> {
        let state = self.lock()?;
        Ok(state.queues.get(agent_id).map_or(0, BinaryHeap::len))
    }

    /// The kinds an agent is subscribed to; `None` if unsubscribed, an
    /// empty set for a wildcard listener.
    pub fn subscriptions(&self, agent_id: &str) -> SwitchboardResult<Option<HashSet<MessageKind>>> {
        let state = self.lock()?;
        Ok(state.subscriptions.get(agent_id).cloned())
    }

    fn enqueue(state: &mut BrokerState, agent_id: &str, message: AgentMessage) {
        state.seq += 1;
        let seq = state.seq;
        state
            .queues
            .entry(agent_id.to_string())
            .or_default()
            .push(QueuedMessage {
                priority: message.priority,
                seq,
                message,
            });
    }

    fn record_dead_letter(
        state: &mut BrokerState,
        max_dead_letters: usize,
        message: AgentMessage,
        reason: DeadLetterReason,
    ) {
        if state.dead_letters.len() >= max_dead_letters {
            state.dead_letters.pop_front();
        }
        state.dead_letters.push_back(DeadLetter::new(message, reason));
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BrokerState>, BrokerError> {
        self.state.lock().map_err(|_| BrokerError::LockPoisoned)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use switchboard_core::priority;

    fn msg(from: &str, to: &str, kind: MessageKind) -> AgentMessage {
        AgentMessage::to_agent(from, to, kind)
    }

    #[test]
    fn test_send_requires_recipient() {
        let broker = MessageBroker::new();
        let unaddressed = AgentMessage::broadcast("a", MessageKind::Notification);
        let err = broker.send(unaddressed).unwrap_err();
        assert!(err.to_string().contains("no recipient"));
    }

    #[test]
    fn test_priority_ordering_with_fifo_ties() {
        let broker = MessageBroker::new();
        let low = msg("a", "b", MessageKind::Notification).with_priority(priority::LOW);
        let first_normal = msg("a", "b", MessageKind::Notification);
        let second_normal = msg("a", "b", MessageKind::Notification);
        let high = msg("a", "b", MessageKind::Notification).with_priority(priority::HIGH);

        broker.send(low.clone()).unwrap();
        broker.send(first_normal.clone()).unwrap();
        broker.send(second_normal.clone()).unwrap();
        broker.send(high.clone()).unwrap();

        let drained = broker.pending("b", None).unwrap();
        let ids: Vec<_> = drained.iter().map(|m| m.message_id).collect();
        assert_eq!(
            ids,
            vec![
                high.message_id,
                first_normal.message_id,
                second_normal.message_id,
                low.message_id
            ]
        );
    }

    #[test]
    fn test_pending_respects_max() {
        let broker = MessageBroker::new();
        for _ in 0..5 {
            broker.send(msg("a", "b", MessageKind::Notification)).unwrap();
        }
        assert_eq!(broker.pending("b", Some(2)).unwrap().len(), 2);
        assert_eq!(broker.queue_depth("b").unwrap(), 3);
    }

    #[test]
    fn test_expired_message_goes_to_dead_letters() {
        let broker = MessageBroker::new();
        let expired = msg("a", "b", MessageKind::Request)
            .with_expiry(Utc::now() - Duration::seconds(1));
        let id = expired.message_id;

        broker.send(expired).unwrap();
        assert_eq!(broker.queue_depth("b").unwrap(), 0);

        let dead = broker.dead_letters().unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].message.message_id, id);
        assert_eq!(dead[0].reason, DeadLetterReason::Expired);
    }

    #[test]
    fn test_message_expiring_in_queue_diverts_on_drain() {
        let broker = MessageBroker::new();
        let short_lived = msg("a", "b", MessageKind::Request)
            .with_expiry(Utc::now() + Duration::milliseconds(1));
        let durable = msg("a", "b", MessageKind::Request);
        broker.send(short_lived).unwrap();
        broker.send(durable.clone()).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));

        let drained = broker.pending("b", None).unwrap();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].message_id, durable.message_id);
        assert_eq!(broker.dead_letters().unwrap().len(), 1);
    }

    #[test]
    fn test_broadcast_reaches_interested_and_wildcard() {
        let broker = MessageBroker::new();
        broker.subscribe("interested", &[MessageKind::Notification]).unwrap();
        broker.subscribe("wildcard", &[]).unwrap();
        broker.subscribe("other", &[MessageKind::Heartbeat]).unwrap();

        let delivered = broker
            .broadcast(AgentMessage::broadcast("sender", MessageKind::Notification))
            .unwrap();
        assert_eq!(delivered, 2);
        assert_eq!(broker.queue_depth("interested").unwrap(), 1);
        assert_eq!(broker.queue_depth("wildcard").unwrap(), 1);
        assert_eq!(broker.queue_depth("other").unwrap(), 0);
    }

    #[test]
    fn test_broadcast_with_no_subscribers_is_dropped() {
        let broker = MessageBroker::new();
        let delivered = broker
            .broadcast(AgentMessage::broadcast("sender", MessageKind::Notification))
            .unwrap();
        assert_eq!(delivered, 0);
        assert!(broker.dead_letters().unwrap().is_empty());
    }

    #[test]
    fn test_publish_dispatches_on_addressing() {
        let broker = MessageBroker::new();
        broker.subscribe("listener", &[]).unwrap();

        broker.publish(msg("a", "direct", MessageKind::Request)).unwrap();
        broker
            .publish(AgentMessage::broadcast("a", MessageKind::Notification))
            .unwrap();

        assert_eq!(broker.queue_depth("direct").unwrap(), 1);
        assert_eq!(broker.queue_depth("listener").unwrap(), 1);
    }

    #[test]
    fn test_subscribe_is_idempotent_union() {
        let broker = MessageBroker::new();
        broker.subscribe("a", &[MessageKind::Request]).unwrap();
        broker.subscribe("a", &[MessageKind::Response]).unwrap();
        let kinds = broker.subscriptions("a").unwrap().unwrap();
        assert!(kinds.contains(&MessageKind::Request));
        assert!(kinds.contains(&MessageKind::Response));
        assert_eq!(kinds.len(), 2);
    }

    #[test]
    fn test_unsubscribe_dead_letters_pending() {
        let broker = MessageBroker::new();
        broker.subscribe("b", &[]).unwrap();
        broker.send(msg("a", "b", MessageKind::Request)).unwrap();

        assert!(broker.unsubscribe("b").unwrap());
        assert!(!broker.unsubscribe("b").unwrap());

        let dead = broker.dead_letters().unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].reason, DeadLetterReason::Undeliverable);
        assert!(broker.subscriptions("b").unwrap().is_none());
    }

    #[test]
    fn test_clear_dead_letters() {
        let broker = MessageBroker::new();
        broker
            .send(msg("a", "b", MessageKind::Request).with_expiry(Utc::now() - Duration::seconds(1)))
            .unwrap();
        assert_eq!(broker.clear_dead_letters().unwrap(), 1);
        assert!(broker.dead_letters().unwrap().is_empty());
    }

    #[test]
    fn test_dead_letter_queue_is_bounded() {
        let config = CoordinationConfig {
            max_dead_letters: 2,
            ..Default::default()
        };
        let broker = MessageBroker::with_config(&config);
        for _ in 0..4 {
            broker
                .send(
                    msg("a", "b", MessageKind::Request)
                        .with_expiry(Utc::now() - Duration::seconds(1)),
                )
                .unwrap();
        }
        assert_eq!(broker.dead_letters().unwrap().len(), 2);
    }
}
