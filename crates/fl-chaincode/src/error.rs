use fl_store::StoreError;

/// Errors returned by chaincode operations.
///
/// Every failure is reported to the caller as a value. Nothing here is
/// retried internally except the bounded compare-and-swap loops, whose
/// exhaustion surfaces as [`StoreError::Contention`].
#[derive(Debug, thiserror::Error)]
pub enum ChaincodeError {
    /// The operation was called with the wrong number of arguments.
    #[error("incorrect number of arguments for {operation}: expected {expected}, got {got}")]
    Arity {
        operation: &'static str,
        expected: usize,
        got: usize,
    },

    /// An argument was present but its content is unusable.
    #[error("invalid {field}: {reason}")]
    Content { field: &'static str, reason: String },

    /// A create-only operation found its key already populated.
    #[error("already exists: {key}")]
    AlreadyExists { key: String },

    /// A read or update found nothing at its key.
    #[error("not found: {key}")]
    NotFound { key: String },

    /// The underlying store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No operation is registered under this name.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}

impl ChaincodeError {
    pub(crate) fn content(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Content {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Store(StoreError::Corrupt {
            key: key.into(),
            reason: reason.into(),
        })
    }
}

/// Result alias for chaincode operations.
pub type ChaincodeResult<T> = Result<T, ChaincodeError>;
