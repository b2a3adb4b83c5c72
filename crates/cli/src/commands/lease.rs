use crate::host::Host;
use chrono::Utc;
use clap::Subcommand;
use serde_json::json;
use std::time::Duration;
use tokenlease_backend::Response;
use tokenlease_core::{parse_duration, Result};

#[derive(Subcommand)]
pub enum LeaseCommands {
    /// List leases issued by this mount
    List,
    /// Extend a lease and the expiry of its token
    Renew {
        lease_id: String,
        /// Requested extension; defaults to the mount's lease TTL
        #[arg(long, value_parser = duration_arg)]
        increment: Option<Duration>,
    },
    /// Revoke a lease and delete its token
    Revoke { lease_id: String },
}

impl LeaseCommands {
    pub async fn execute(self, host: &Host) -> Result<Response> {
        match self {
            LeaseCommands::List => {
                let now = Utc::now();
                let leases: Vec<_> = host
                    .leases()
                    .await?
                    .into_iter()
                    .map(|lease| {
                        json!({
                            "lease_id": lease.lease_id,
                            "role": lease.role,
                            "state": lease.state,
                            "token_id": lease.secret.internal_id(),
                            "issue_time": lease.issue_time,
                            "expire_time": lease.expire_time,
                            "ttl": lease.remaining(now).as_secs(),
                        })
                    })
                    .collect();
                Ok(Response::from_data(json!({ "leases": leases })))
            }
            LeaseCommands::Renew {
                lease_id,
                increment,
            } => host.renew(&lease_id, increment.unwrap_or_default()).await,
            LeaseCommands::Revoke { lease_id } => host.revoke(&lease_id).await,
        }
    }
}

fn duration_arg(value: &str) -> std::result::Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}
