//! Path routing for the mount
//!
//! Requests arrive as an operation on a path with a loosely typed field map.
//! Fields are decoded once into typed structs here; the stores and the issuer
//! only ever see validated values.

use crate::roles::RoleUpdate;
use crate::Backend;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokenlease_core::{
    parse_duration, Error, LeasePolicy, LeasedSecret, RequestContext, Result, RoleName,
    SecretString, CONFIG_TOKEN_KEY, SECRET_TOKEN_TYPE,
};
use tracing::debug;

/// What a request asks of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
    List,
    /// Lease renewal callback for a secret issued by this mount
    Renew,
    /// Lease revocation callback for a secret issued by this mount
    Revoke,
}

impl Operation {
    const fn name(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Renew => "renew",
            Self::Revoke => "revoke",
        }
    }
}

/// A request routed to the mount
#[derive(Debug, Clone)]
pub struct Request {
    pub operation: Operation,
    /// Path relative to the mount, e.g. `roles/deploy`
    pub path: String,
    pub data: Map<String, Value>,
    /// Secret under renewal or revocation
    pub secret: Option<LeasedSecret>,
}

impl Request {
    pub fn new(operation: Operation, path: impl Into<String>) -> Self {
        Self {
            operation,
            path: path.into(),
            data: Map::new(),
            secret: None,
        }
    }

    /// Attach request fields; non-object values are ignored
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        if let Value::Object(map) = data {
            self.data = map;
        }
        self
    }

    #[must_use]
    pub fn with_secret(mut self, secret: LeasedSecret) -> Self {
        self.secret = Some(secret);
        self
    }

    fn fields<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|e| {
            Error::InvalidRequest {
                message: e.to_string(),
            }
        })
    }
}

/// Result of a handled request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub data: Map<String, Value>,
    /// Lease-bound secret, present for issuance and renewal
    pub secret: Option<LeasedSecret>,
    pub warnings: Vec<String>,
}

impl Response {
    /// An error reported to the caller rather than raised as a fault
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("error".to_string(), Value::String(message.into()));
        Self {
            data,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error_message().is_some()
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.data.get("error").and_then(Value::as_str)
    }

    /// A successful response carrying the fields of a JSON object
    #[must_use]
    pub fn from_data(data: Value) -> Self {
        match data {
            Value::Object(data) => Self {
                data,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenFields {
    token: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
struct LeaseFields {
    #[serde(default, deserialize_with = "duration_field")]
    ttl: Duration,
    #[serde(default, deserialize_with = "duration_field")]
    max_ttl: Duration,
}

#[derive(Debug, Deserialize)]
struct RoleFields {
    policy_document: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CredsFields {
    condition: Option<String>,
}

/// Accept a duration as whole seconds or as a string like `1h30m`
fn duration_field<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Input {
        Seconds(u64),
        Text(String),
    }

    match Input::deserialize(deserializer)? {
        Input::Seconds(seconds) => Ok(Duration::from_secs(seconds)),
        Input::Text(text) => parse_duration(&text).map_err(de::Error::custom),
    }
}

impl Backend {
    /// Handle one request.
    ///
    /// Errors the caller can act on come back as [`Response::error`]; storage
    /// failures, transport failures and elapsed deadlines are returned as
    /// `Err` for the host to report as internal errors.
    pub async fn handle(&self, ctx: &RequestContext, request: Request) -> Result<Response> {
        debug!(
            operation = request.operation.name(),
            path = %request.path,
            "Handling request"
        );
        match self.route(ctx, &request).await {
            Ok(response) => Ok(response),
            Err(e) if e.is_user_facing() => {
                debug!(path = %request.path, error = %e, "Request rejected");
                Ok(Response::error(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn route(&self, ctx: &RequestContext, request: &Request) -> Result<Response> {
        use Operation::*;

        if matches!(request.operation, Renew | Revoke) {
            return self.secret_callback(ctx, request).await;
        }

        let path = request.path.trim_matches('/');
        let (head, tail) = path.split_once('/').unwrap_or((path, ""));
        match (head, tail, request.operation) {
            ("config", "token", Read) => self.read_root().await,
            ("config", "token", Create | Update) => {
                let fields: TokenFields = request.fields()?;
                let token = fields.token.ok_or(Error::MissingField {
                    field: "token",
                    operation: "configuration",
                })?;
                self.root_credentials().write(ctx, token).await?;
                Ok(Response::default())
            }
            ("config", "token", Delete) => {
                self.root_credentials().delete().await?;
                Ok(Response::default())
            }
            ("config", "rotate-root", Create | Update) => {
                let token_id = self.root_credentials().rotate(ctx).await?;
                Ok(Response::from_data(json!({ "id": token_id })))
            }
            ("config", "lease", Read) => Ok(match self.lease_policy().read().await? {
                Some(policy) => Response::from_data(json!({
                    "ttl": policy.ttl.as_secs(),
                    "max_ttl": policy.max_ttl.as_secs(),
                })),
                None => Response::default(),
            }),
            ("config", "lease", Create | Update) => {
                let fields: LeaseFields = request.fields()?;
                let policy = LeasePolicy::new(fields.ttl, fields.max_ttl)?;
                self.lease_policy().write(policy).await?;
                Ok(Response::default())
            }
            ("roles", "", List) => {
                let keys = self.roles().list().await?;
                Ok(Response::from_data(json!({ "keys": keys })))
            }
            ("roles", name, Read) => {
                let name = RoleName::new(name)?;
                Ok(match self.roles().read(&name).await? {
                    Some(role) => role_response(role.policy_document.as_str()),
                    None => Response::default(),
                })
            }
            ("roles", name, Create | Update) => {
                let name = RoleName::new(name)?;
                let fields: RoleFields = request.fields()?;
                let role = self
                    .roles()
                    .write(
                        &name,
                        RoleUpdate {
                            policy_document: fields.policy_document,
                        },
                    )
                    .await?;
                Ok(role_response(role.policy_document.as_str()))
            }
            ("roles", name, Delete) => {
                let name = RoleName::new(name)?;
                self.roles().delete(&name).await?;
                Ok(Response::default())
            }
            ("creds", role, Read) => {
                let fields: CredsFields = request.fields()?;
                let issued = self
                    .issuer()
                    .issue(ctx, role, fields.condition.as_deref())
                    .await?;
                let data = &issued.secret.data;
                let mut response = Response::from_data(json!({
                    "id": data.id,
                    "token": data.token.expose(),
                }));
                response.secret = Some(issued.secret);
                response.warnings = issued.warnings;
                Ok(response)
            }
            _ => Err(unsupported(request)),
        }
    }

    async fn read_root(&self) -> Result<Response> {
        let credential = self
            .root_credentials()
            .read()
            .await?
            .ok_or(Error::NotConfigured {
                path: CONFIG_TOKEN_KEY,
            })?;
        Ok(Response::from_data(json!({
            "id": credential.token_id,
            "token": credential.token.expose(),
        })))
    }

    async fn secret_callback(&self, ctx: &RequestContext, request: &Request) -> Result<Response> {
        let secret = request.secret.as_ref().ok_or(Error::MissingField {
            field: "secret",
            operation: request.operation.name(),
        })?;
        if secret.secret_type != SECRET_TOKEN_TYPE {
            return Err(unsupported(request));
        }

        if request.operation == Operation::Renew {
            let renewed = self.leases().renew(ctx, secret).await?;
            Ok(Response {
                secret: Some(renewed.secret),
                warnings: renewed.warnings,
                ..Response::default()
            })
        } else {
            self.leases().revoke(ctx, secret).await?;
            Ok(Response::default())
        }
    }
}

fn role_response(policy_document: &str) -> Response {
    Response::from_data(json!({ "policy_document": policy_document }))
}

fn unsupported(request: &Request) -> Error {
    Error::Unsupported {
        operation: request.operation.name().to_string(),
        path: request.path.clone(),
    }
}
