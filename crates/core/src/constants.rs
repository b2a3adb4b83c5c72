/// Constants used throughout the tokenlease codebase
// Storage keys, relative to the mount
pub const CONFIG_TOKEN_KEY: &str = "config/token";
pub const CONFIG_LEASE_KEY: &str = "config/lease";
pub const ROLE_PREFIX: &str = "role/";

// Secret type registered with the host lease subsystem
pub const SECRET_TOKEN_TYPE: &str = "token";

// Issued token names: `<prefix>-<role>-<unix nanos>`, cut to the remote limit
pub const TOKEN_NAME_PREFIX: &str = "vault";
pub const MAX_TOKEN_NAME_LENGTH: usize = 120;

// Status the remote service reports for a usable token
pub const ACTIVE_TOKEN_STATUS: &str = "active";

// Remote token expiry is pushed this far past the renewed lease
pub const RENEWAL_EXPIRY_MARGIN_SECS: i64 = 60;

// Host-wide lease defaults (32 days)
pub const DEFAULT_SYSTEM_LEASE_TTL_SECS: u64 = 768 * 60 * 60;
pub const DEFAULT_SYSTEM_MAX_LEASE_TTL_SECS: u64 = 768 * 60 * 60;

// Remote service defaults
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MOUNT: &str = "cloudflare";

// Environment variable names
pub const TOKENLEASE_DATA_DIR_VAR: &str = "TOKENLEASE_DATA_DIR";
pub const TOKENLEASE_MOUNT_VAR: &str = "TOKENLEASE_MOUNT";
pub const TOKENLEASE_API_URL_VAR: &str = "TOKENLEASE_API_URL";
pub const TOKENLEASE_TIMEOUT_VAR: &str = "TOKENLEASE_TIMEOUT";
pub const TOKENLEASE_DEFAULT_TTL_VAR: &str = "TOKENLEASE_DEFAULT_TTL";
pub const TOKENLEASE_MAX_TTL_VAR: &str = "TOKENLEASE_MAX_TTL";
