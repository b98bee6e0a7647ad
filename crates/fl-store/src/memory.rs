use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::KvStore;

/// In-memory, `BTreeMap`-based key-value store.
///
/// Intended for tests and embedding. Values are cloned on read and write.
/// `compare_and_swap` holds the write lock across the comparison, so it is
/// atomic with respect to every other call on the same store.
pub struct InMemoryKvStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_lock()?.len())
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_lock()?.is_empty())
    }

    /// All keys in lexicographic order.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.read_lock()?.keys().cloned().collect())
    }

    /// A point-in-time copy of every entry.
    pub fn snapshot(&self) -> StoreResult<BTreeMap<String, Vec<u8>>> {
        Ok(self.read_lock()?.clone())
    }

    fn read_lock(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn write_lock(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for InMemoryKvStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.read_lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.write_lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: &[u8],
    ) -> StoreResult<bool> {
        let mut entries = self.write_lock()?;
        if entries.get(key).map(Vec::as_slice) != expected {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.read_lock()?.contains_key(key))
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().map(|e| e.len()).unwrap_or(0);
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &count)
            .finish()
    }
}
