use crate::host::Host;
use clap::Subcommand;
use tokenlease_backend::Response;
use tokenlease_core::Result;

pub mod config;
pub mod lease;
pub mod roles;

use self::config::ConfigCommands;
use self::lease::LeaseCommands;
use self::roles::RoleCommands;

#[derive(Subcommand)]
pub enum Commands {
    /// Configure the mount's root token and lease policy
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Manage roles and their policy documents
    #[command(visible_alias = "role")]
    Roles {
        #[command(subcommand)]
        command: RoleCommands,
    },

    /// Issue a new token under a role
    Creds {
        /// Role to issue the token under
        role: String,

        /// JSON-encoded request condition, e.g. an IP allow list
        #[arg(long, value_name = "JSON")]
        condition: Option<String>,
    },

    /// Inspect, renew or revoke issued leases
    #[command(visible_alias = "leases")]
    Lease {
        #[command(subcommand)]
        command: LeaseCommands,
    },
}

impl Commands {
    pub async fn execute(self, host: &Host) -> Result<Response> {
        match self {
            Commands::Config { command } => command.execute(host).await,
            Commands::Roles { command } => command.execute(host).await,
            Commands::Creds { role, condition } => host.issue(&role, condition.as_deref()).await,
            Commands::Lease { command } => command.execute(host).await,
        }
    }
}
