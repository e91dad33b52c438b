// Durable key-value storage for the rotation, and the fail-soft store that
// serializes rotation state into it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::draft::state::{PausedSnapshot, RotationState};

/// Key holding the live rotation state.
pub const LIVE_STATE_KEY: &str = "draft_state";

/// Key holding the paused snapshot.
pub const PAUSED_STATE_KEY: &str = "paused_draft_state";

/// String-keyed, synchronous storage with last-write-wins semantics.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;

    /// Delete several keys. Backends that support transactions override this
    /// so the keys go together.
    fn delete_many(&self, keys: &[&str]) -> Result<()> {
        keys.iter().try_for_each(|key| self.delete(key))
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn delete_many(&self, keys: &[&str]) -> Result<()> {
        (**self).delete_many(keys)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn delete_many(&self, keys: &[&str]) -> Result<()> {
        (**self).delete_many(keys)
    }
}

/// In-memory store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("memory store mutex poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Serializes rotation state into a [`KeyValueStore`].
///
/// Never fails: write errors are logged, and missing, unreadable or
/// inconsistent records all load as `None`.
pub struct RotationStateStore<S> {
    backend: S,
}

impl<S: KeyValueStore> RotationStateStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Write the live state if it is active, otherwise delete it.
    pub fn save(&self, state: &RotationState) {
        if !state.active {
            self.delete(LIVE_STATE_KEY);
            return;
        }
        self.write(LIVE_STATE_KEY, state);
    }

    pub fn save_paused(&self, snapshot: &PausedSnapshot) {
        self.write(PAUSED_STATE_KEY, snapshot);
    }

    pub fn load(&self) -> Option<RotationState> {
        let state: RotationState = self.read(LIVE_STATE_KEY)?;
        if !state.active || !state.is_consistent() {
            warn!("Discarding inconsistent rotation state from storage");
            return None;
        }
        Some(state)
    }

    pub fn load_paused(&self) -> Option<PausedSnapshot> {
        let snapshot: PausedSnapshot = self.read(PAUSED_STATE_KEY)?;
        if !snapshot.state.is_consistent() {
            warn!("Discarding inconsistent paused snapshot from storage");
            return None;
        }
        Some(snapshot)
    }

    pub fn clear_paused(&self) {
        self.delete(PAUSED_STATE_KEY);
    }

    /// Remove both the live state and the paused snapshot.
    pub fn clear(&self) {
        match self.backend.delete_many(&[LIVE_STATE_KEY, PAUSED_STATE_KEY]) {
            Ok(()) => debug!("Cleared rotation state"),
            Err(e) => warn!("Failed to clear rotation state: {e:#}"),
        }
    }

    fn write<T: serde::Serialize>(&self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize {key}: {e}");
                return;
            }
        };
        match self.backend.set(key, &json) {
            Ok(()) => debug!("Saved {key}"),
            Err(e) => warn!("Failed to save {key}: {e:#}"),
        }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read {key}: {e:#}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring malformed {key} in storage: {e}");
                None
            }
        }
    }

    fn delete(&self, key: &str) {
        if let Err(e) = self.backend.delete(key) {
            warn!("Failed to delete {key}: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::order::{Direction, DraftOrderEntry, DraftType};
    use std::collections::BTreeMap;

    fn active_state() -> RotationState {
        let mut flags = BTreeMap::new();
        flags.insert("b".to_string(), true);
        flags.insert("c".to_string(), false);
        RotationState {
            active: true,
            round: 3,
            drafter_index: 1,
            draft_order: vec![
                DraftOrderEntry::new("a", "Alice"),
                DraftOrderEntry::new("b", "Bob"),
                DraftOrderEntry::new("c", "Carol"),
            ],
            draft_type: DraftType::Snake,
            direction: Direction::Backward,
            autodraft_flags: flags,
        }
    }

    /// Backend whose every operation fails.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow!("disk on fire"))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }
        fn delete(&self, _key: &str) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = RotationStateStore::new(MemoryStore::new());
        let state = active_state();
        store.save(&state);
        assert_eq!(store.load(), Some(state));
    }

    #[test]
    fn saving_inactive_state_deletes_live_key() {
        let store = RotationStateStore::new(MemoryStore::new());
        let mut state = active_state();
        store.save(&state);

        state.active = false;
        store.save(&state);
        assert_eq!(store.load(), None);
        assert_eq!(store.backend().get(LIVE_STATE_KEY).unwrap(), None);
    }

    #[test]
    fn malformed_json_loads_as_none() {
        let store = RotationStateStore::new(MemoryStore::new());
        store.backend().set(LIVE_STATE_KEY, "{not json").unwrap();
        store.backend().set(PAUSED_STATE_KEY, "[]").unwrap();
        assert_eq!(store.load(), None);
        assert_eq!(store.load_paused(), None);
    }

    #[test]
    fn inconsistent_state_loads_as_none() {
        let store = RotationStateStore::new(MemoryStore::new());
        let mut state = active_state();
        state.drafter_index = 10;
        let json = serde_json::to_string(&state).unwrap();
        store.backend().set(LIVE_STATE_KEY, &json).unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn paused_snapshot_uses_separate_slot() {
        let store = RotationStateStore::new(MemoryStore::new());
        let snapshot = PausedSnapshot::capture(&active_state());
        store.save_paused(&snapshot);

        assert_eq!(store.load(), None);
        assert_eq!(store.load_paused(), Some(snapshot));
    }

    #[test]
    fn clear_removes_both_keys() {
        let store = RotationStateStore::new(MemoryStore::new());
        store.save(&active_state());
        store.save_paused(&PausedSnapshot::capture(&active_state()));

        store.clear();
        assert_eq!(store.load(), None);
        assert_eq!(store.load_paused(), None);
    }

    #[derive(Default)]
    struct BatchRecorder {
        inner: MemoryStore,
        batches: Mutex<Vec<Vec<String>>>,
    }

    impl KeyValueStore for BatchRecorder {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set(key, value)
        }
        fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key)
        }
        fn delete_many(&self, keys: &[&str]) -> Result<()> {
            self.batches
                .lock()
                .unwrap()
                .push(keys.iter().map(|k| k.to_string()).collect());
            self.inner.delete_many(keys)
        }
    }

    #[test]
    fn clear_deletes_both_keys_in_one_batch() {
        let backend = Arc::new(BatchRecorder::default());
        let store = RotationStateStore::new(Arc::clone(&backend));
        store.save(&active_state());
        store.save_paused(&PausedSnapshot::capture(&active_state()));

        store.clear();
        let batches = backend.batches.lock().unwrap();
        assert_eq!(
            *batches,
            vec![vec![LIVE_STATE_KEY.to_string(), PAUSED_STATE_KEY.to_string()]]
        );
        assert_eq!(store.load(), None);
        assert_eq!(store.load_paused(), None);
    }

    #[test]
    fn backend_failures_never_surface() {
        let store = RotationStateStore::new(BrokenStore);
        store.save(&active_state());
        store.save_paused(&PausedSnapshot::capture(&active_state()));
        store.clear();
        assert_eq!(store.load(), None);
        assert_eq!(store.load_paused(), None);
    }

    #[test]
    fn shared_backend_through_arc() {
        let backend = Arc::new(MemoryStore::new());
        let writer = RotationStateStore::new(Arc::clone(&backend));
        let reader = RotationStateStore::new(Arc::clone(&backend));

        writer.save(&active_state());
        assert_eq!(reader.load(), Some(active_state()));
    }
}
