/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend refused or failed the operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error from a file-backed adapter.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The on-disk image could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored value does not decode as the record its key promises.
    #[error("corrupt value at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// A compare-and-swap loop gave up after repeated conflicting writes.
    #[error("write contention on {key} after {attempts} attempts")]
    Contention { key: String, attempts: u32 },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
