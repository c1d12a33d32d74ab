//! Topic event bus.
//!
//! Publish-subscribe over dot-separated topics with glob patterns:
//! `*` matches one segment, `**` matches any tail. Handlers run
//! synchronously on the publishing thread, in subscription order, after
//! the bus lock is released; a failing handler is logged and never
//! aborts its siblings.

use std::error::Error;
use std::sync::{Arc, Mutex};

use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use switchboard_core::{
    compile_pattern, EventBusError, SubscriptionId, SwitchboardResult,
};

/// Handler invoked with the concrete topic and the event payload.
pub type EventHandler =
    Arc<dyn Fn(&str, &Value) -> Result<(), Box<dyn Error + Send + Sync>> + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    /// Pattern as supplied at subscribe time
    pattern: String,
    /// Pattern compiled once, at subscribe time
    matcher: Regex,
    handler: EventHandler,
}

/// In-memory topic event bus.
#[derive(Default)]
pub struct EventBus {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler to every topic matching `pattern`.
    ///
    /// The pattern is validated and compiled here; publishing never
    /// compiles anything.
    pub fn subscribe(&self, pattern: &str, handler: EventHandler) -> SwitchboardResult<SubscriptionId> {
        let matcher = compile_pattern(pattern).map_err(|e| EventBusError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let id = Uuid::now_v7();
        let mut subscriptions = self.lock()?;
        subscriptions.push(Subscription {
            id,
            pattern: pattern.to_string(),
            matcher,
            handler,
        });
        tracing::debug!(%id, pattern, "handler subscribed");
        Ok(id)
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> SwitchboardResult<bool> {
        let mut subscriptions = self.lock()?;
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        Ok(subscriptions.len() < before)
    }

    /// Publish an event to a concrete topic.
    ///
    /// Returns the number of handlers invoked (zero is not an error).
    pub fn publish(&self, topic: &str, event: &Value) -> SwitchboardResult<usize> {
        let matching: Vec<(SubscriptionId, EventHandler)> = {
            let subscriptions = self.lock()?;
            subscriptions
                .iter()
                .filter(|s| s.matcher.is_match(topic))
                .map(|s| (s.id, Arc::clone(&s.handler)))
                .collect()
        };

        for (id, handler) in &matching {
            if let Err(e) = handler(topic, event) {
                tracing::warn!(subscription = %id, topic, error = %e, "event handler failed");
            }
        }
        Ok(matching.len())
    }

    /// Publish to every subscription whose stored pattern, read as a
    /// literal topic, matches `pattern`.
    ///
    /// The symmetric twin of `publish`: here the argument does the
    /// matching and the subscriptions are matched against.
    pub fn publish_pattern(&self, pattern: &str, event: &Value) -> SwitchboardResult<usize> {
        let matcher = compile_pattern(pattern).map_err(|e| EventBusError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let matching: Vec<(SubscriptionId, String, EventHandler)> = {
            let subscriptions = self.lock()?;
            subscriptions
                .iter()
                .filter(|s| matcher.is_match(&s.pattern))
                .map(|s| (s.id, s.pattern.clone(), Arc::clone(&s.handler)))
                .collect()
        };

        for (id, topic, handler) in &matching {
            if let Err(e) = handler(topic, event) {
                tracing::warn!(subscription = %id, topic, error = %e, "event handler failed");
            }
        }
        Ok(matching.len())
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> SwitchboardResult<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Subscription>>, EventBusError> {
        self.subscriptions
            .lock()
            .map_err(|_| EventBusError::LockPoisoned)
    }
}

// ============================================================================
// TESTS
// ============================================================================
