//! In-memory token service for tests
//!
//! Behaves like the remote API closely enough to exercise the backend end to
//! end: clients authenticate with a token value, every call is recorded, and
//! failures or latency can be injected per operation.

use crate::api::{ClientFactory, TokenApi};
use crate::error::RemoteError;
use crate::types::{CreatedToken, NewToken, TokenCondition, TokenPolicy, TokenVerification};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokenlease_core::{SecretString, ACTIVE_TOKEN_STATUS};

/// Operations of the token service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Verify,
    Create,
    UpdateExpiry,
    Delete,
    Regenerate,
}

/// A recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Verify,
    Create { name: String },
    UpdateExpiry { id: String, expires_on: DateTime<Utc> },
    Delete { id: String },
    Regenerate { id: String },
}

impl RemoteCall {
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::Verify => Operation::Verify,
            Self::Create { .. } => Operation::Create,
            Self::UpdateExpiry { .. } => Operation::UpdateExpiry,
            Self::Delete { .. } => Operation::Delete,
            Self::Regenerate { .. } => Operation::Regenerate,
        }
    }
}

/// Failure to inject into the next call of an operation
#[derive(Debug, Clone)]
pub enum Failure {
    NotFound,
    Api { status: u16, message: String },
    Transport(String),
    /// Answer that cannot be decoded
    Decode(String),
}

impl Failure {
    fn into_error(self, resource: &str) -> RemoteError {
        match self {
            Self::NotFound => RemoteError::NotFound {
                resource: resource.to_string(),
            },
            Self::Api { status, message } => RemoteError::Api {
                status,
                messages: vec![message],
            },
            Self::Transport(message) => RemoteError::Transport {
                message,
                source: None,
            },
            Self::Decode(message) => RemoteError::Decode { message },
        }
    }
}

/// A token held by the fake service
#[derive(Debug, Clone)]
pub struct FakeToken {
    pub id: String,
    pub name: String,
    pub value: SecretString,
    pub status: String,
    pub policies: Vec<TokenPolicy>,
    pub condition: TokenCondition,
    pub expires_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct State {
    tokens: BTreeMap<String, FakeToken>,
    calls: Vec<RemoteCall>,
    failures: HashMap<Operation, Failure>,
    latency: Option<Duration>,
    next_id: u64,
}

impl State {
    fn authenticate(&self, value: &SecretString) -> Result<&FakeToken, RemoteError> {
        self.tokens
            .values()
            .find(|t| &t.value == value)
            .ok_or_else(|| RemoteError::Api {
                status: 401,
                messages: vec!["Invalid API Token (code 1000)".to_string()],
            })
    }

    fn authorize(&self, value: &SecretString) -> Result<(), RemoteError> {
        let caller = self.authenticate(value)?;
        if caller.status != ACTIVE_TOKEN_STATUS {
            return Err(RemoteError::Api {
                status: 403,
                messages: vec![format!("token is {}", caller.status)],
            });
        }
        Ok(())
    }

    fn take_failure(&mut self, operation: Operation) -> Option<Failure> {
        self.failures.remove(&operation)
    }
}

/// Shared in-memory token service
#[derive(Debug, Default)]
pub struct FakeTokenService {
    state: Mutex<State>,
}

impl FakeTokenService {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a token the backend can authenticate with
    pub fn add_token(&self, value: &str, id: &str, status: &str) {
        self.state.lock().tokens.insert(
            id.to_string(),
            FakeToken {
                id: id.to_string(),
                name: format!("seeded-{id}"),
                value: SecretString::new(value),
                status: status.to_string(),
                policies: Vec::new(),
                condition: TokenCondition::default(),
                expires_on: None,
            },
        );
    }

    /// Make the next call of `operation` fail
    pub fn fail_next(&self, operation: Operation, failure: Failure) {
        self.state.lock().failures.insert(operation, failure);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = Some(latency);
    }

    /// Every call made so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls of `operation` made so far
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    #[must_use]
    pub fn token(&self, id: &str) -> Option<FakeToken> {
        self.state.lock().tokens.get(id).cloned()
    }

    /// Tokens minted through `create_token`
    #[must_use]
    pub fn issued_tokens(&self) -> Vec<FakeToken> {
        self.state
            .lock()
            .tokens
            .values()
            .filter(|t| !t.name.starts_with("seeded-"))
            .cloned()
            .collect()
    }

    /// Factory whose clients talk to this service
    #[must_use]
    pub fn factory(self: &Arc<Self>) -> FakeClientFactory {
        FakeClientFactory {
            service: Arc::clone(self),
        }
    }

    async fn pause(&self) {
        let latency = self.state.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

/// Client factory backed by a [`FakeTokenService`]
#[derive(Debug, Clone)]
pub struct FakeClientFactory {
    service: Arc<FakeTokenService>,
}

impl ClientFactory for FakeClientFactory {
    fn client(&self, token: &SecretString) -> Result<Box<dyn TokenApi>, RemoteError> {
        Ok(Box::new(FakeClient {
            service: Arc::clone(&self.service),
            token: token.clone(),
        }))
    }
}

struct FakeClient {
    service: Arc<FakeTokenService>,
    token: SecretString,
}

#[async_trait]
impl TokenApi for FakeClient {
    async fn verify_token(&self) -> Result<TokenVerification, RemoteError> {
        self.service.pause().await;
        let mut state = self.service.state.lock();
        state.calls.push(RemoteCall::Verify);
        if let Some(failure) = state.take_failure(Operation::Verify) {
            return Err(failure.into_error("token verification"));
        }
        let caller = state.authenticate(&self.token)?;
        Ok(TokenVerification {
            id: caller.id.clone(),
            status: caller.status.clone(),
            expires_on: caller.expires_on,
        })
    }

    async fn create_token(&self, token: &NewToken) -> Result<CreatedToken, RemoteError> {
        self.service.pause().await;
        let mut state = self.service.state.lock();
        state.calls.push(RemoteCall::Create {
            name: token.name.clone(),
        });
        if let Some(failure) = state.take_failure(Operation::Create) {
            return Err(failure.into_error("tokens"));
        }
        state.authorize(&self.token)?;

        state.next_id += 1;
        let id = format!("tok-{:06}", state.next_id);
        let value = SecretString::new(format!("value-{id}"));
        state.tokens.insert(
            id.clone(),
            FakeToken {
                id: id.clone(),
                name: token.name.clone(),
                value: value.clone(),
                status: ACTIVE_TOKEN_STATUS.to_string(),
                policies: token.policies.clone(),
                condition: token.condition.clone(),
                expires_on: Some(token.expires_on),
            },
        );
        Ok(CreatedToken {
            id,
            name: token.name.clone(),
            status: ACTIVE_TOKEN_STATUS.to_string(),
            value,
        })
    }

    async fn update_token_expiry(
        &self,
        id: &str,
        expires_on: DateTime<Utc>,
    ) -> Result<(), RemoteError> {
        self.service.pause().await;
        let mut state = self.service.state.lock();
        state.calls.push(RemoteCall::UpdateExpiry {
            id: id.to_string(),
            expires_on,
        });
        let resource = format!("token '{id}'");
        if let Some(failure) = state.take_failure(Operation::UpdateExpiry) {
            return Err(failure.into_error(&resource));
        }
        state.authorize(&self.token)?;
        match state.tokens.get_mut(id) {
            Some(token) => {
                token.expires_on = Some(expires_on);
                Ok(())
            }
            None => Err(RemoteError::NotFound { resource }),
        }
    }

    async fn delete_token(&self, id: &str) -> Result<(), RemoteError> {
        self.service.pause().await;
        let mut state = self.service.state.lock();
        state.calls.push(RemoteCall::Delete { id: id.to_string() });
        let resource = format!("token '{id}'");
        if let Some(failure) = state.take_failure(Operation::Delete) {
            return Err(failure.into_error(&resource));
        }
        state.authorize(&self.token)?;
        match state.tokens.remove(id) {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound { resource }),
        }
    }

    async fn regenerate_token(&self, id: &str) -> Result<SecretString, RemoteError> {
        self.service.pause().await;
        let mut state = self.service.state.lock();
        state.calls.push(RemoteCall::Regenerate { id: id.to_string() });
        let resource = format!("token '{id}'");
        if let Some(failure) = state.take_failure(Operation::Regenerate) {
            return Err(failure.into_error(&resource));
        }
        state.authorize(&self.token)?;
        state.next_id += 1;
        let value = SecretString::new(format!("rolled-{:06}", state.next_id));
        match state.tokens.get_mut(id) {
            Some(token) => {
                token.value = value.clone();
                Ok(value)
            }
            None => Err(RemoteError::NotFound { resource }),
        }
    }
}
