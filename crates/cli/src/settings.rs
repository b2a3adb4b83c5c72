//! Process-wide settings, from flags or the environment

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tokenlease_backend::StaticSystemView;
use tokenlease_core::{
    parse_duration, Error, Result, DEFAULT_API_BASE_URL, DEFAULT_MOUNT, TOKENLEASE_API_URL_VAR,
    TOKENLEASE_DATA_DIR_VAR, TOKENLEASE_DEFAULT_TTL_VAR, TOKENLEASE_MAX_TTL_VAR,
    TOKENLEASE_MOUNT_VAR, TOKENLEASE_TIMEOUT_VAR,
};
use tokenlease_remote::HttpClientConfig;
use tokenlease_utils::XdgPaths;

#[derive(Debug, Clone, Args)]
pub struct BrokerSettings {
    /// Directory holding mount configuration and the lease book
    #[arg(long, global = true, env = TOKENLEASE_DATA_DIR_VAR, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Mount whose root token, roles and lease policy are used
    #[arg(long, global = true, env = TOKENLEASE_MOUNT_VAR, default_value = DEFAULT_MOUNT)]
    pub mount: String,

    /// Base URL of the token API
    #[arg(long, global = true, env = TOKENLEASE_API_URL_VAR, default_value = DEFAULT_API_BASE_URL)]
    pub api_url: String,

    /// Deadline for each request, including its remote call
    #[arg(long, global = true, env = TOKENLEASE_TIMEOUT_VAR, default_value = "30s", value_parser = duration_arg)]
    pub timeout: Duration,

    /// Lease TTL used when the mount configures none
    #[arg(long, global = true, env = TOKENLEASE_DEFAULT_TTL_VAR, default_value = "768h", value_parser = duration_arg)]
    pub default_lease_ttl: Duration,

    /// Upper bound for any lease
    #[arg(long, global = true, env = TOKENLEASE_MAX_TTL_VAR, default_value = "768h", value_parser = duration_arg)]
    pub max_lease_ttl: Duration,
}

impl BrokerSettings {
    /// Reject settings no request could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.mount.is_empty() || self.mount.contains('/') || self.mount.starts_with('.') {
            return Err(Error::configuration(format!(
                "invalid mount name '{}'",
                self.mount
            )));
        }
        if self.max_lease_ttl.is_zero() {
            return Err(Error::configuration("max TTL must be greater than zero"));
        }
        if self.timeout.is_zero() {
            return Err(Error::configuration("timeout must be greater than zero"));
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(XdgPaths::data_dir)
    }

    pub fn system_view(&self) -> StaticSystemView {
        StaticSystemView {
            default_lease_ttl: self.default_lease_ttl,
            max_lease_ttl: self.max_lease_ttl,
        }
    }

    pub fn client_config(&self) -> Result<HttpClientConfig> {
        HttpClientConfig::new(&self.api_url, self.timeout)
            .map_err(|e| Error::configuration(e.to_string()))
    }
}

fn duration_arg(value: &str) -> std::result::Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: BrokerSettings,
    }

    fn parse(args: &[&str]) -> BrokerSettings {
        let argv = std::iter::once("tokenlease").chain(args.iter().copied());
        TestCli::parse_from(argv).settings
    }

    #[test]
    fn test_flags_override_defaults() {
        let settings = parse(&[
            "--mount",
            "cf-prod",
            "--timeout",
            "5s",
            "--default-lease-ttl",
            "1h",
            "--max-lease-ttl",
            "86400",
        ]);
        assert_eq!(settings.mount, "cf-prod");
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.system_view().default_lease_ttl, Duration::from_secs(3600));
        assert_eq!(settings.system_view().max_lease_ttl, Duration::from_secs(86400));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        assert!(TestCli::try_parse_from(["tokenlease", "--timeout", "soon"]).is_err());

        let settings = parse(&["--mount", "a/b"]);
        assert!(settings.validate().is_err());

        let settings = parse(&["--api-url", "not a url"]);
        assert!(settings.client_config().is_err());
    }

    #[test]
    fn test_explicit_data_dir() {
        let settings = parse(&["--data-dir", "/srv/tokenlease"]);
        assert_eq!(settings.data_dir(), PathBuf::from("/srv/tokenlease"));
    }
}
