use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Concurrent string-keyed map shared by the session registry and by each
/// session's attribute bag.
///
/// A single reader-writer lock guards every operation: `load` takes the
/// shared side, everything that mutates takes the exclusive side. Any
/// `load` that starts after a `store`/`delete` returns sees its effect.
pub struct KvStore<V> {
    entries: Arc<RwLock<HashMap<String, V>>>,
}

impl<V> Clone for KvStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<V> Default for KvStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> KvStore<V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or overwrite `key`. Always succeeds.
    pub async fn store(&self, key: impl Into<String>, value: V) -> bool {
        self.entries.write().await.insert(key.into(), value);
        true
    }

    /// Remove `key`, returning whatever was stored under it.
    pub async fn delete(&self, key: &str) -> Option<V> {
        self.entries.write().await.remove(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Sorted snapshot of the current keys.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Drop every entry for which `keep` returns false and hand the removed
    /// pairs back. The write lock is held for the whole pass.
    pub async fn retain<F>(&self, mut keep: F) -> Vec<(String, V)>
    where
        F: FnMut(&str, &V) -> bool,
    {
        let mut entries = self.entries.write().await;
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, value)| !keep(key.as_str(), *value))
            .map(|(key, _)| key.clone())
            .collect();

        doomed
            .into_iter()
            .filter_map(|key| entries.remove(&key).map(|value| (key, value)))
            .collect()
    }
}

impl<V: Clone> KvStore<V> {
    /// Current value under `key`. `None` only when the key is absent; a
    /// stored null-like value is still returned as `Some`.
    pub async fn load(&self, key: &str) -> Option<V> {
        self.entries.read().await.get(key).cloned()
    }

    /// Return the value under `key`, inserting `make()` first if there is
    /// none. Check and insert happen under one write lock, so two racing
    /// callers always get the same value back.
    pub async fn get_or_insert_with<F>(&self, key: &str, make: F) -> V
    where
        F: FnOnce() -> V,
    {
        let mut entries = self.entries.write().await;
        entries.entry(key.to_string()).or_insert_with(make).clone()
    }

    /// Snapshot of every entry, in no particular order.
    pub async fn entries(&self) -> Vec<(String, V)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}
