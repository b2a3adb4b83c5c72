//! Core domain types, errors, and constants for `tokenlease`.
//!
//! This crate holds the building blocks shared by the storage, remote and
//! backend crates: the error taxonomy every operation reports through, the
//! validated newtypes for role names and policy documents, and the records
//! the backend persists.
//!
//! ## Key Components
//!
//! - **`errors`**: the `Error` enum and `Result` alias, with a `category()`
//!   mapping onto configuration/validation/remote/storage/ttl failures.
//! - **`types`**: `RootCredential`, `LeasePolicy`, `Role`, `LeasedSecret` and
//!   the `SecretString` wrapper that redacts itself in logs.
//! - **`context`**: per-request deadline applied to remote calls.
//! - **`constants`**: storage keys, secret type names and environment
//!   variable names.

pub mod constants;
pub mod context;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    context::RequestContext,
    errors::{Error, ErrorCategory, Result},
    types::*,
};
