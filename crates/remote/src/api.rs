//! Token service boundary

use crate::error::RemoteError;
use crate::types::{CreatedToken, NewToken, TokenVerification};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokenlease_core::SecretString;

/// Calls the backend makes against the token service, authenticated as one token
#[async_trait]
pub trait TokenApi: Send + Sync {
    /// Report the identifier and status of the authenticating token
    async fn verify_token(&self) -> Result<TokenVerification, RemoteError>;

    /// Mint a new token
    async fn create_token(&self, token: &NewToken) -> Result<CreatedToken, RemoteError>;

    /// Move the expiry of token `id`
    async fn update_token_expiry(
        &self,
        id: &str,
        expires_on: DateTime<Utc>,
    ) -> Result<(), RemoteError>;

    /// Delete token `id`; an absent token yields [`RemoteError::NotFound`]
    async fn delete_token(&self, id: &str) -> Result<(), RemoteError>;

    /// Replace the secret value of token `id`, returning the new value
    async fn regenerate_token(&self, id: &str) -> Result<SecretString, RemoteError>;
}

/// Builds a client authenticated with the given token
pub trait ClientFactory: Send + Sync {
    fn client(&self, token: &SecretString) -> Result<Box<dyn TokenApi>, RemoteError>;
}
