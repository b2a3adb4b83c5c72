//! Domain types for the credential broker

pub mod credential;
pub mod duration;
pub mod lease;
pub mod newtypes;
pub mod role;
pub mod secret;
pub mod security;

pub use credential::RootCredential;
pub use duration::parse_duration;
pub use lease::{LeasePolicy, LeaseState};
pub use newtypes::{PolicyDocument, RoleName};
pub use role::{Role, RoleEntry};
pub use secret::{InternalData, LeasedSecret, TokenData};
pub use security::SecretString;
