//! Remote API-token service client
//!
//! The backend only needs five calls from the token service: verify the
//! calling token, create a token, move a token's expiry, delete a token and
//! regenerate a token's secret value. [`TokenApi`] is that boundary;
//! [`HttpTokenApi`] speaks the Cloudflare v4 user-token API.
//!
//! Clients are bound to one authenticating token. A [`ClientFactory`] builds
//! a fresh client per request so a rotated root token is never used by a
//! stale client.

mod api;
mod error;
mod http;
#[cfg(feature = "testing")]
pub mod memory;
mod types;

pub use api::{ClientFactory, TokenApi};
pub use error::RemoteError;
pub use http::{HttpClientConfig, HttpClientFactory, HttpTokenApi};
pub use types::{
    CreatedToken, NewToken, PermissionGroup, RequestIpCondition, TokenCondition, TokenPolicy,
    TokenVerification,
};
