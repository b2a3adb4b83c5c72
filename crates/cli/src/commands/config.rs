use crate::host::Host;
use clap::Subcommand;
use serde_json::{json, Map, Value};
use std::io::BufRead;
use std::time::Duration;
use tokenlease_backend::{Operation, Request, Response};
use tokenlease_core::{parse_duration, Error, Result};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Manage the root token used for every remote call
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
    /// Regenerate the root token's value, keeping its identifier
    RotateRoot,
    /// Manage the lease policy applied to issued tokens
    Lease {
        #[command(subcommand)]
        command: LeasePolicyCommands,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Verify and store a root token
    Write {
        /// The token, or `-` to read it from stdin
        token: String,
    },
    /// Show the stored root token and its identifier
    Read,
    /// Remove the stored root token
    Delete,
}

#[derive(Subcommand)]
pub enum LeasePolicyCommands {
    /// Show the configured TTLs in seconds
    Read,
    /// Set the TTLs; zero defers to the host defaults
    Write {
        /// Default lease TTL, e.g. `1h` or `3600`
        #[arg(long, value_parser = duration_arg)]
        ttl: Option<Duration>,
        /// Maximum lease TTL across renewals
        #[arg(long, value_parser = duration_arg)]
        max_ttl: Option<Duration>,
    },
}

impl ConfigCommands {
    pub async fn execute(self, host: &Host) -> Result<Response> {
        match self {
            ConfigCommands::Token { command } => command.execute(host).await,
            ConfigCommands::RotateRoot => {
                host.request(Request::new(Operation::Update, "config/rotate-root"))
                    .await
            }
            ConfigCommands::Lease { command } => command.execute(host).await,
        }
    }
}

impl TokenCommands {
    pub async fn execute(self, host: &Host) -> Result<Response> {
        match self {
            TokenCommands::Write { token } => {
                let token = if token == "-" { read_stdin_line()? } else { token };
                let operation = if host.backend().root_credentials().exists().await? {
                    Operation::Update
                } else {
                    Operation::Create
                };
                let request =
                    Request::new(operation, "config/token").with_data(json!({ "token": token }));
                host.request(request).await
            }
            TokenCommands::Read => host.request(Request::new(Operation::Read, "config/token")).await,
            TokenCommands::Delete => {
                host.request(Request::new(Operation::Delete, "config/token"))
                    .await
            }
        }
    }
}

impl LeasePolicyCommands {
    pub async fn execute(self, host: &Host) -> Result<Response> {
        match self {
            LeasePolicyCommands::Read => {
                host.request(Request::new(Operation::Read, "config/lease"))
                    .await
            }
            LeasePolicyCommands::Write { ttl, max_ttl } => {
                let mut data = Map::new();
                if let Some(ttl) = ttl {
                    data.insert("ttl".to_string(), json!(ttl.as_secs()));
                }
                if let Some(max_ttl) = max_ttl {
                    data.insert("max_ttl".to_string(), json!(max_ttl.as_secs()));
                }
                let request =
                    Request::new(Operation::Update, "config/lease").with_data(Value::Object(data));
                host.request(request).await
            }
        }
    }
}

fn duration_arg(value: &str) -> std::result::Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}

fn read_stdin_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| Error::configuration(format!("failed to read token from stdin: {e}")))?;
    Ok(line.trim().to_string())
}
