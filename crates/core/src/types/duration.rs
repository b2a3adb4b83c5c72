//! Duration parsing and serde helpers

use crate::errors::{Error, Result};
use std::time::Duration;

/// Parse a duration given as bare seconds (`3600`) or in human form (`1h`, `90m`, `1h30m`)
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Duration::ZERO);
    }
    if let Ok(seconds) = input.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }
    humantime::parse_duration(input)
        .map_err(|e| Error::configuration(format!("invalid duration '{input}': {e}")))
}

/// Serialize a `Duration` as whole seconds
pub mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_seconds() {
        assert_eq!(parse_duration("3600").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_human_durations() {
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("768h").unwrap(), Duration::from_secs(768 * 3600));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_duration("soon"),
            Err(Error::Configuration { .. })
        ));
    }
}
