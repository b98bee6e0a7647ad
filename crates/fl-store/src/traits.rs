use crate::error::StoreResult;

/// Ordered key-value ledger capability.
///
/// All implementations must satisfy these invariants:
/// - `get` after a successful `put` on the same key returns exactly the bytes
///   written, until the next successful write to that key.
/// - A failed `put` or `compare_and_swap` leaves the stored value untouched.
/// - Values are opaque bytes; the store never interprets them.
/// - All I/O errors are propagated, never silently ignored.
pub trait KvStore: Send + Sync {
    /// Read the value at `key`.
    ///
    /// Returns `Ok(None)` if the key has never been written.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Unconditionally write `value` at `key`.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Write `value` at `key` only if the current value equals `expected`
    /// (`None` meaning "absent"). Returns `Ok(false)` if the precondition
    /// failed and nothing was written.
    ///
    /// The default implementation is a plain get-compare-put and is only
    /// race-free when the caller is the single writer for `key`. Adapters
    /// backed by something with a native conditional write should override it.
    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: &[u8],
    ) -> StoreResult<bool> {
        let current = self.get(key)?;
        if current.as_deref() != expected {
            return Ok(false);
        }
        self.put(key, value)?;
        Ok(true)
    }

    /// Check whether `key` holds a value.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
