//! Key-value store capability for FundLedger.
//!
//! The chaincode never talks to a ledger directly. Everything it needs from
//! the underlying ordered key-value ledger is captured by the [`KvStore`]
//! trait: a point read, a blind write, and a compare-and-swap used by the
//! read-modify-write paths.
//!
//! # Adapters
//!
//! - [`InMemoryKvStore`] -- `BTreeMap` behind a `RwLock`, for tests and embedding
//! - [`FileKvStore`] -- JSON document on disk, rewritten atomically on each write
//!
//! # Design Rules
//!
//! 1. Stores never interpret values. Encoding belongs to `fl-types`.
//! 2. A failed write leaves the previous value in place.
//! 3. `compare_and_swap` is atomic in every adapter in this crate. The trait's
//!    default implementation is not, and external adapters relying on it must
//!    serialize writers per key themselves.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileKvStore;
pub use memory::InMemoryKvStore;
pub use traits::KvStore;
