//! Operation dispatch for FundLedger.
//!
//! A [`Chaincode`] receives an operation name and a list of string arguments,
//! validates them into a typed [`Operation`], and applies it to a
//! [`fl_store::KvStore`].
//!
//! # Operations
//!
//! | Name | Arguments |
//! |------|-----------|
//! | `init` | bootstrap value |
//! | `write` | key, value |
//! | `read` | key |
//! | `init_user` | email, firstname, lastname |
//! | `init_user_extended` | email, firstname, lastname, password, ccn, phone |
//! | `init_project` | project id, name, owner email, money goal |
//! | `init_project_extended` | name, description, postdate, enddate, minfund, maxfund, sponsor email, status |
//! | `init_project_likes` | project name, user email |
//! | `init_project_updates` | project name, date, text |
//! | `init_pledge` | project name, pledge amount |
//!
//! # Guarantees
//!
//! 1. Arguments are fully validated before the store is touched.
//! 2. Creating a user or project never overwrites an existing one.
//! 3. Concurrent pledges to the same project are never lost; each pledge
//!    is a compare-and-swap retried up to `max_cas_retries` times.
//! 4. Likes are stored per user and updates per sequence number, so
//!    neither replaces an earlier entry from someone else.

pub mod config;
pub mod dispatcher;
pub mod error;
mod handlers;
pub mod operation;

pub use config::{ChaincodeConfig, ConfigError};
pub use dispatcher::Chaincode;
pub use error::{ChaincodeError, ChaincodeResult};
pub use operation::{validate, Operation, OperationKind, ProjectDraft, UserForm};
