//! Record schemas for FundLedger.
//!
//! Every piece of structured state the chaincode persists is one of the
//! record types defined here, serialized as a JSON object carrying a
//! `docType` discriminant so a reader can branch on the stored shape instead
//! of assuming it.
//!
//! # Key Types
//!
//! - [`Record`] -- Tagged union over every persisted schema
//! - [`User`] -- Registered account, keyed by email
//! - [`Project`] / [`LegacyProject`] -- Funding campaigns, keyed by name or id
//! - [`ProjectLike`] / [`ProjectUpdate`] -- Per-project engagement entries
//! - [`RecordKey`] -- Type-prefixed store key derived from record identity

pub mod error;
pub mod key;
pub mod record;

pub use error::TypeError;
pub use key::{is_reserved_key, RecordKey, KEY_SEPARATOR, RESERVED_PREFIXES};
pub use record::{LegacyProject, Project, ProjectLike, ProjectUpdate, Record, RecordKind, User};
