//! Operator CLI for tokenlease
//!
//! The binary acts as the host platform for a single mount: it keeps mount
//! data and the lease book in a directory, bounds every request with a
//! deadline, and records issued tokens so they can be renewed and revoked.

pub mod commands;
pub mod host;
pub mod lease_book;
pub mod output;
pub mod settings;

pub use host::Host;
pub use lease_book::{LeaseBook, LeaseRecord};
pub use settings::BrokerSettings;
