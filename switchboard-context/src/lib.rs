//! Shared context store.
//!
//! Versioned key/value state shared between agents, partitioned by scope.
//! Every successful write bumps the entry version by exactly one and
//! pushes the prior version into a bounded per-slot history. Writers can
//! demand optimistic concurrency by supplying an expected version.
//! Subscribers are notified of writes after the store lock is released,
//! so callbacks may re-enter the store freely.

use std::collections::{HashMap, VecDeque};
use std::error::Error;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use switchboard_core::{
    compile_pattern, ConflictStrategy, ContextEntry, ContextError, ContextScope,
    CoordinationConfig, SubscriptionId, SwitchboardResult,
};

// ============================================================================
// WRITE OPTIONS
// ============================================================================

/// Optional knobs for a single write.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Time to live; the entry expires this far from now
    pub ttl: Option<chrono::Duration>,
    /// Metadata to attach to the new version
    pub metadata: Option<HashMap<String, String>>,
    /// Reject the write unless the current version matches
    pub expected_version: Option<u64>,
}

impl WriteOptions {
    pub fn ttl(ttl: chrono::Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Default::default()
        }
    }

    pub fn expecting_version(version: u64) -> Self {
        Self {
            expected_version: Some(version),
            ..Default::default()
        }
    }
}

// ============================================================================
// CONTEXT STORE
// ============================================================================

/// Callback invoked with the freshly written entry.
pub type ContextCallback =
    Arc<dyn Fn(&ContextEntry) -> Result<(), Box<dyn Error + Send + Sync>> + Send + Sync>;

struct ContextSubscription {
    id: SubscriptionId,
    matcher: Regex,
    callback: ContextCallback,
}

/// One storage slot: the live entry plus its prior versions, newest first.
#[derive(Debug, Clone, Default)]
struct Slot {
    entry: Option<ContextEntry>,
    history: VecDeque<ContextEntry>,
}

#[derive(Default)]
struct StoreState {
    /// scope → storage key → slot
    slots: HashMap<ContextScope, HashMap<String, Slot>>,
    subscriptions: Vec<ContextSubscription>,
}

/// In-memory versioned context store.
pub struct ContextStore {
    state: Mutex<StoreState>,
    max_history_size: usize,
    default_strategy: ConflictStrategy,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore {
    /// Create a store with default configuration.
    pub fn new() -> Self {
        Self::with_config(&CoordinationConfig::default())
    }

    /// Create a store from explicit configuration.
    pub fn with_config(config: &CoordinationConfig) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            max_history_size: config.max_history_size,
            default_strategy: config.default_conflict_strategy,
        }
    }

    /// Read an entry. Expired entries are evicted on the way and read as
    /// absent.
    pub fn get(
        &self,
        key: &str,
        scope: ContextScope,
        agent_id: Option<&str>,
    ) -> SwitchboardResult<Option<ContextEntry>> {
        let storage_key = Self::storage_key(key, scope, agent_id)?;
        let mut state = self.lock()?;
        let slot = match state.slots.get_mut(&scope).and_then(|m| m.get_mut(&storage_key)) {
            Some(slot) => slot,
            None => return Ok(None),
        };
        if slot.entry.as_ref().is_some_and(ContextEntry::is_expired) {
            tracing::debug!(key, %scope, "expired entry evicted on read");
            slot.entry = None;
        }
        Ok(slot.entry.clone())
    }

    /// Write an entry, bumping its version.
    ///
    /// Agent scope requires `agent_id`. A supplied `expected_version`
    /// that does not match the current version rejects the write and
    /// leaves the slot untouched. Subscribers whose pattern matches the
    /// (unqualified) key are notified after the lock is released.
    pub fn set(
        &self,
        key: &str,
        value: Value,
        scope: ContextScope,
        agent_id: Option<&str>,
        opts: WriteOptions,
    ) -> SwitchboardResult<ContextEntry> {
        let storage_key = Self::storage_key(key, scope, agent_id)?;
        let (written, to_notify) = {
            let mut state = self.lock()?;
            let slot = state
                .slots
                .entry(scope)
                .or_default()
                .entry(storage_key)
                .or_default();

            let current_version = slot.entry.as_ref().map_or(0, |e| e.version);
            // the optimistic check only guards existing entries; first
            // writes always create version 1
            if let (Some(expected), Some(_)) = (opts.expected_version, &slot.entry) {
                if expected != current_version {
                    return Err(ContextError::VersionConflict {
                        key: key.to_string(),
                        expected,
                        current: current_version,
                    }
                    .into());
                }
            }

            let now = Utc::now();
            let mut entry = ContextEntry::new(key, value, scope);
            entry.version = current_version + 1;
            entry.owner = agent_id.map(str::to_string);
            entry.expires_at = opts.ttl.map(|ttl| now + ttl);
            entry.metadata = opts.metadata.unwrap_or_default();

            if let Some(prior) = slot.entry.replace(entry.clone()) {
                // carry the original creation time through rewrites
                if let Some(live) = slot.entry.as_mut() {
                    live.created_at = prior.created_at;
                }
                slot.history.push_front(prior);
                slot.history.truncate(self.max_history_size);
            }
            let written = slot.entry.clone().unwrap_or(entry);

            let to_notify: Vec<(SubscriptionId, ContextCallback)> = state
                .subscriptions
                .iter()
                .filter(|s| s.matcher.is_match(key))
                .map(|s| (s.id, Arc::clone(&s.callback)))
                .collect();
            (written, to_notify)
        };

        for (id, callback) in to_notify {
            if let Err(e) = callback(&written) {
                tracing::warn!(subscription = %id, key, error = %e, "context subscriber failed");
            }
        }
        Ok(written)
    }

    /// Remove an entry and its history. Returns whether it existed.
    pub fn delete(
        &self,
        key: &str,
        scope: ContextScope,
        agent_id: Option<&str>,
    ) -> SwitchboardResult<bool> {
        let storage_key = Self::storage_key(key, scope, agent_id)?;
        let mut state = self.lock()?;
        let removed = state
            .slots
            .get_mut(&scope)
            .and_then(|m| m.remove(&storage_key))
            .is_some_and(|slot| slot.entry.is_some());
        Ok(removed)
    }

    /// Scan entries whose key matches a glob pattern.
    ///
    /// `scope` of `None` scans every scope. For agent scope an `agent_id`
    /// restricts results to that agent's entries. Expired entries are
    /// skipped unless `include_expired` is set.
    pub fn query(
        &self,
        pattern: &str,
        scope: Option<ContextScope>,
        agent_id: Option<&str>,
        include_expired: bool,
    ) -> SwitchboardResult<Vec<ContextEntry>> {
        let matcher = compile_pattern(pattern).map_err(|e| ContextError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let state = self.lock()?;
        let mut found = Vec::new();
        for (entry_scope, slots) in &state.slots {
            if scope.is_some_and(|s| s != *entry_scope) {
                continue;
            }
            for slot in slots.values() {
                let Some(entry) = &slot.entry else { continue };
                if !matcher.is_match(&entry.key) {
                    continue;
                }
                if !include_expired && entry.is_expired() {
                    continue;
                }
                if *entry_scope == ContextScope::Agent {
                    if let Some(agent_id) = agent_id {
                        if entry.owner.as_deref() != Some(agent_id) {
                            continue;
                        }
                    }
                }
                found.push(entry.clone());
            }
        }
        Ok(found)
    }

    /// Prior versions of an entry, newest first, up to `limit`.
    pub fn history(
        &self,
        key: &str,
        scope: ContextScope,
        agent_id: Option<&str>,
        limit: Option<usize>,
    ) -> SwitchboardResult<Vec<ContextEntry>> {
        let storage_key = Self::storage_key(key, scope, agent_id)?;
        let state = self.lock()?;
        let history = state
            .slots
            .get(&scope)
            .and_then(|m| m.get(&storage_key))
            .map(|slot| {
                slot.history
                    .iter()
                    .take(limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(history)
    }

    /// Subscribe to writes whose (unqualified) key matches `pattern`.
    pub fn subscribe(
        &self,
        pattern: &str,
        callback: ContextCallback,
    ) -> SwitchboardResult<SubscriptionId> {
        let matcher = compile_pattern(pattern).map_err(|e| ContextError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        let id = Uuid::now_v7();
        let mut state = self.lock()?;
        state.subscriptions.push(ContextSubscription {
            id,
            matcher,
            callback,
        });
        Ok(id)
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> SwitchboardResult<bool> {
        let mut state = self.lock()?;
        let before = state.subscriptions.len();
        state.subscriptions.retain(|s| s.id != id);
        Ok(state.subscriptions.len() < before)
    }

    /// Reconcile several candidate entries for the same key into one.
    ///
    /// The entries are standalone candidates; the store itself is not
    /// consulted or modified. `strategy` of `None` uses the configured
    /// default. `AgentPriority` cannot be computed here (the store has no
    /// notion of agent precedence) and is rejected as an invalid argument.
    pub fn merge(
        &self,
        entries: &[ContextEntry],
        strategy: Option<ConflictStrategy>,
    ) -> SwitchboardResult<ContextEntry> {
        let first = entries.first().ok_or(ContextError::EmptyMergeSet)?;
        for entry in entries {
            if entry.key != first.key {
                return Err(ContextError::MergeKeyMismatch {
                    expected: first.key.clone(),
                    found: entry.key.clone(),
                }
                .into());
            }
        }

        let strategy = strategy.unwrap_or(self.default_strategy);
        let winner = match strategy {
            ConflictStrategy::LastWriteWins => Self::latest(entries),
            ConflictStrategy::VersionCheck => entries
                .iter()
                .max_by_key(|e| e.version)
                .unwrap_or(first)
                .clone(),
            ConflictStrategy::Merge => {
                if entries.iter().all(|e| e.value.is_object()) {
                    let mut merged = serde_json::Map::new();
                    for entry in entries {
                        if let Some(obj) = entry.value.as_object() {
                            merged.extend(obj.clone());
                        }
                    }
                    let mut winner = Self::latest(entries);
                    winner.value = Value::Object(merged);
                    winner
                } else {
                    tracing::warn!(
                        key = %first.key,
                        "merge strategy on non-object values, falling back to last write wins"
                    );
                    Self::latest(entries)
                }
            }
            ConflictStrategy::AgentPriority => {
                return Err(ContextError::UnsupportedMergeStrategy { strategy }.into())
            }
        };
        Ok(winner)
    }

    // compare updated_at, not created_at: rewrites carry the original
    // creation time forward, so every version of a key shares it
    fn latest(entries: &[ContextEntry]) -> ContextEntry {
        entries
            .iter()
            .max_by_key(|e| e.updated_at)
            .cloned()
            .unwrap_or_else(|| entries[0].clone())
    }

    fn storage_key(
        key: &str,
        scope: ContextScope,
        agent_id: Option<&str>,
    ) -> Result<String, ContextError> {
        match scope {
            ContextScope::Agent => match agent_id {
                Some(agent_id) => Ok(format!("{agent_id}:{key}")),
                None => Err(ContextError::MissingAgentId {
                    key: key.to_string(),
                }),
            },
            _ => Ok(key.to_string()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, ContextError> {
        self.state.lock().map_err(|_| ContextError::LockPoisoned)
    }
}

// ============================================================================
// CONTEXT MANAGER
// ============================================================================

/// Per-agent view over a shared [`ContextStore`].
///
/// Binds an agent id so callers stop threading it through every call.
pub struct ContextManager {
    store: Arc<ContextStore>,
    agent_id: String,
}

impl ContextManager {
    pub fn new(store: Arc<ContextStore>, agent_id: impl Into<String>) -> Self {
        Self {
            store,
            agent_id: agent_id.into(),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn set_global(&self, key: &str, value: Value) -> SwitchboardResult<ContextEntry> {
        self.store.set(
            key,
            value,
            ContextScope::Global,
            Some(&self.agent_id),
            WriteOptions::default(),
        )
    }

    pub fn get_global(&self, key: &str) -> SwitchboardResult<Option<ContextEntry>> {
        self.store.get(key, ContextScope::Global, None)
    }

    pub fn set_agent(&self, key: &str, value: Value) -> SwitchboardResult<ContextEntry> {
        self.store.set(
            key,
            value,
            ContextScope::Agent,
            Some(&self.agent_id),
            WriteOptions::default(),
        )
    }

    pub fn get_agent(&self, key: &str) -> SwitchboardResult<Option<ContextEntry>> {
        self.store.get(key, ContextScope::Agent, Some(&self.agent_id))
    }

    pub fn set_task(&self, key: &str, value: Value) -> SwitchboardResult<ContextEntry> {
        self.store.set(
            key,
            value,
            ContextScope::Task,
            Some(&self.agent_id),
            WriteOptions::default(),
        )
    }

    pub fn get_task(&self, key: &str) -> SwitchboardResult<Option<ContextEntry>> {
        self.store.get(key, ContextScope::Task, None)
    }

    pub fn query(
        &self,
        pattern: &str,
        scope: Option<ContextScope>,
    ) -> SwitchboardResult<Vec<ContextEntry>> {
        self.store.query(pattern, scope, Some(&self.agent_id), false)
    }

    pub fn subscribe(&self, pattern: &str, callback: ContextCallback) -> SwitchboardResult<SubscriptionId> {
        self.store.subscribe(pattern, callback)
    }

    /// Delete every entry owned by the bound agent, in all scopes.
    /// Returns how many entries were removed.
    pub fn clear_agent_context(&self) -> SwitchboardResult<usize> {
        let owned: Vec<(String, ContextScope)> = self
            .store
            .query("**", None, Some(&self.agent_id), true)?
            .into_iter()
            .filter(|e| e.owner.as_deref() == Some(self.agent_id.as_str()))
            .map(|e| (e.key, e.scope))
            .collect();

        let mut removed = 0;
        for (key, scope) in owned {
            if self.store.delete(&key, scope, Some(&self.agent_id))? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_set_then_get() {
        let store = ContextStore::new();
        let written = store
            .set("plan", json!({"step": 1}), ContextScope::Global, None, WriteOptions::default())
            .unwrap();
        assert_eq!(written.version, 1);

        let read = store.get("plan", ContextScope::Global, None).unwrap().unwrap();
        assert_eq!(read.value, json!({"step": 1}));
        assert_eq!(read.version, 1);
    }

    #[test]
    fn test_versions_increase_by_one() {
        let store = ContextStore::new();
        for i in 1..=5u64 {
            let written = store
                .set("counter", json!(i), ContextScope::Global, None, WriteOptions::default())
                .unwrap();
            assert_eq!(written.version, i);
        }
    }

    #[test]
    fn test_history_newest_first_and_bounded() {
        let config = CoordinationConfig {
            max_history_size: 3,
            ..Default::default()
        };
        let store = ContextStore::with_config(&config);
        for i in 1..=6u64 {
            store
                .set("k", json!(i), ContextScope::Global, None, WriteOptions::default())
                .unwrap();
        }

        let history = store.history("k", ContextScope::Global, None, None).unwrap();
        let versions: Vec<u64> = history.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![5, 4, 3]);

        let limited = store.history("k", ContextScope::Global, None, Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].version, 5);
    }

    #[test]
    fn test_stale_expected_version_rejected() {
        let store = ContextStore::new();
        store
            .set("k", json!("v1"), ContextScope::Global, None, WriteOptions::default())
            .unwrap();
        store
            .set("k", json!("v2"), ContextScope::Global, None, WriteOptions::expecting_version(1))
            .unwrap();

        let err = store
            .set("k", json!("v3"), ContextScope::Global, None, WriteOptions::expecting_version(1))
            .unwrap_err();
        assert!(err.to_string().contains("expected 1"));

        // rejected write leaves state untouched
        let current = store.get("k", ContextScope::Global, None).unwrap().unwrap();
        assert_eq!(current.value, json!("v2"));
        assert_eq!(current.version, 2);
    }

    #[test]
    fn test_expected_version_ignored_on_first_write() {
        let store = ContextStore::new();
        let written = store
            .set(
                "fresh",
                json!(1),
                ContextScope::Global,
                None,
                WriteOptions::expecting_version(7),
            )
            .unwrap();
        assert_eq!(written.version, 1);
    }

    #[test]
    fn test_agent_scope_requires_agent_id() {
        let store = ContextStore::new();
        let err = store
            .set("private", json!(1), ContextScope::Agent, None, WriteOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("requires an agent id"));
    }

    #[test]
    fn test_agent_scope_is_isolated_per_agent() {
        let store = ContextStore::new();
        store
            .set("notes", json!("mine"), ContextScope::Agent, Some("a"), WriteOptions::default())
            .unwrap();
        store
            .set("notes", json!("yours"), ContextScope::Agent, Some("b"), WriteOptions::default())
            .unwrap();

        let a = store.get("notes", ContextScope::Agent, Some("a")).unwrap().unwrap();
        let b = store.get("notes", ContextScope::Agent, Some("b")).unwrap().unwrap();
        assert_eq!(a.value, json!("mine"));
        assert_eq!(b.value, json!("yours"));
        assert_eq!(a.version, 1);
        assert_eq!(b.version, 1);
    }

    #[test]
    fn test_expired_entry_reads_as_absent() {
        let store = ContextStore::new();
        store
            .set(
                "ephemeral",
                json!(1),
                ContextScope::Global,
                None,
                WriteOptions::ttl(Duration::milliseconds(-1)),
            )
            .unwrap();
        assert!(store.get("ephemeral", ContextScope::Global, None).unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let store = ContextStore::new();
        store
            .set("k", json!(1), ContextScope::Global, None, WriteOptions::default())
            .unwrap();
        assert!(store.delete("k", ContextScope::Global, None).unwrap());
        assert!(!store.delete("k", ContextScope::Global, None).unwrap());
        assert!(store.get("k", ContextScope::Global, None).unwrap().is_none());
    }

    #[test]
    fn test_query_with_pattern_and_scope() {
        let store = ContextStore::new();
        store
            .set("browser.url", json!("a"), ContextScope::Global, None, WriteOptions::default())
            .unwrap();
        store
            .set("browser.tab.count", json!(3), ContextScope::Global, None, WriteOptions::default())
            .unwrap();
        store
            .set("editor.file", json!("b"), ContextScope::Global, None, WriteOptions::default())
            .unwrap();

        let one_level = store.query("browser.*", Some(ContextScope::Global), None, false).unwrap();
        assert_eq!(one_level.len(), 1);
        assert_eq!(one_level[0].key, "browser.url");

        let subtree = store.query("browser.**", Some(ContextScope::Global), None, false).unwrap();
        assert_eq!(subtree.len(), 2);
    }

    #[test]
    fn test_subscriber_notified_on_matching_write() {
        let store = ContextStore::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        store
            .subscribe(
                "browser.**",
                Arc::new(move |entry| {
                    assert!(entry.key.starts_with("browser."));
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .unwrap();

        store
            .set("browser.url", json!("x"), ContextScope::Global, None, WriteOptions::default())
            .unwrap();
        store
            .set("editor.file", json!("y"), ContextScope::Global, None, WriteOptions::default())
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_subscriber_does_not_fail_write() {
        let store = ContextStore::new();
        store.subscribe("**", Arc::new(|_| Err("boom".into()))).unwrap();
        let written = store
            .set("k", json!(1), ContextScope::Global, None, WriteOptions::default())
            .unwrap();
        assert_eq!(written.version, 1);
    }

    #[test]
    fn test_reentrant_subscriber_does_not_deadlock() {
        let store = Arc::new(ContextStore::new());
        let store_clone = Arc::clone(&store);
        store
            .subscribe(
                "trigger",
                Arc::new(move |entry| {
                    store_clone.set(
                        "echo",
                        entry.value.clone(),
                        ContextScope::Global,
                        None,
                        WriteOptions::default(),
                    )?;
                    Ok(())
                }),
            )
            .unwrap();

        store
            .set("trigger", json!(42), ContextScope::Global, None, WriteOptions::default())
            .unwrap();
        let echoed = store.get("echo", ContextScope::Global, None).unwrap().unwrap();
        assert_eq!(echoed.value, json!(42));
    }

    #[test]
    fn test_merge_rejects_empty_and_mismatched() {
        let store = ContextStore::new();
        assert!(store.merge(&[], None).is_err());

        let a = ContextEntry::new("a", json!(1), ContextScope::Global);
        let b = ContextEntry::new("b", json!(2), ContextScope::Global);
        let err = store.merge(&[a, b], None).unwrap_err();
        assert!(err.to_string().contains("differing keys"));
    }

    #[test]
    fn test_merge_last_write_wins() {
        let store = ContextStore::new();
        let mut old = ContextEntry::new("k", json!("old"), ContextScope::Global);
        old.updated_at -= Duration::minutes(5);
        let new = ContextEntry::new("k", json!("new"), ContextScope::Global);

        let winner = store
            .merge(&[old, new], Some(ConflictStrategy::LastWriteWins))
            .unwrap();
        assert_eq!(winner.value, json!("new"));
    }

    #[test]
    fn test_merge_live_entry_beats_its_history() {
        // store-written versions share created_at, so last write wins
        // must discriminate on update time
        let store = ContextStore::new();
        store
            .set("k", json!("v1"), ContextScope::Global, None, WriteOptions::default())
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        store
            .set("k", json!("v2"), ContextScope::Global, None, WriteOptions::default())
            .unwrap();

        let live = store.get("k", ContextScope::Global, None).unwrap().unwrap();
        let superseded = store
            .history("k", ContextScope::Global, None, Some(1))
            .unwrap()
            .remove(0);
        assert_eq!(live.created_at, superseded.created_at);

        let winner = store
            .merge(&[superseded, live], Some(ConflictStrategy::LastWriteWins))
            .unwrap();
        assert_eq!(winner.value, json!("v2"));
    }

    #[test]
    fn test_merge_version_check_takes_highest() {
        let store = ContextStore::new();
        let mut low = ContextEntry::new("k", json!("low"), ContextScope::Global);
        low.version = 2;
        let mut high = ContextEntry::new("k", json!("high"), ContextScope::Global);
        high.version = 7;

        let winner = store
            .merge(&[high.clone(), low], Some(ConflictStrategy::VersionCheck))
            .unwrap();
        assert_eq!(winner.value, json!("high"));
    }

    #[test]
    fn test_merge_unions_objects() {
        let store = ContextStore::new();
        let mut older = ContextEntry::new("k", json!({"a": 1, "shared": "older"}), ContextScope::Global);
        older.updated_at -= Duration::minutes(1);
        let newer = ContextEntry::new("k", json!({"b": 2, "shared": "newer"}), ContextScope::Global);

        let winner = store
            .merge(&[older, newer], Some(ConflictStrategy::Merge))
            .unwrap();
        assert_eq!(winner.value, json!({"a": 1, "b": 2, "shared": "newer"}));
    }

    #[test]
    fn test_merge_scalars_falls_back_to_last_write() {
        let store = ContextStore::new();
        let mut old = ContextEntry::new("k", json!(1), ContextScope::Global);
        old.updated_at -= Duration::minutes(1);
        let new = ContextEntry::new("k", json!(2), ContextScope::Global);

        let winner = store.merge(&[old, new], Some(ConflictStrategy::Merge)).unwrap();
        assert_eq!(winner.value, json!(2));
    }

    #[test]
    fn test_merge_agent_priority_rejected() {
        let store = ContextStore::new();
        let entry = ContextEntry::new("k", json!(1), ContextScope::Global);
        let err = store
            .merge(&[entry], Some(ConflictStrategy::AgentPriority))
            .unwrap_err();
        assert!(err.to_string().contains("caller-supplied precedence"));
    }

    #[test]
    fn test_manager_scoped_accessors() {
        let store = Arc::new(ContextStore::new());
        let manager = ContextManager::new(Arc::clone(&store), "agent-1");

        manager.set_global("shared", json!(1)).unwrap();
        manager.set_agent("private", json!(2)).unwrap();
        manager.set_task("work", json!(3)).unwrap();

        assert_eq!(manager.get_global("shared").unwrap().unwrap().value, json!(1));
        assert_eq!(manager.get_agent("private").unwrap().unwrap().value, json!(2));
        assert_eq!(manager.get_task("work").unwrap().unwrap().value, json!(3));

        // another agent cannot see agent-scoped state
        let other = ContextManager::new(store, "agent-2");
        assert!(other.get_agent("private").unwrap().is_none());
    }

    #[test]
    fn test_manager_clear_agent_context() {
        let store = Arc::new(ContextStore::new());
        let manager = ContextManager::new(Arc::clone(&store), "agent-1");
        manager.set_agent("a", json!(1)).unwrap();
        manager.set_agent("b", json!(2)).unwrap();
        manager.set_global("shared", json!(3)).unwrap();

        let other = ContextManager::new(Arc::clone(&store), "agent-2");
        other.set_agent("c", json!(4)).unwrap();

        let removed = manager.clear_agent_context().unwrap();
        assert_eq!(removed, 3);

        assert!(manager.get_agent("a").unwrap().is_none());
        assert!(store.get("shared", ContextScope::Global, None).unwrap().is_none());
        assert_eq!(other.get_agent("c").unwrap().unwrap().value, json!(4));
    }
}
