use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

const APP_DIR: &str = "tokenlease";

/// XDG Base Directory paths for tokenlease
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_DATA_HOME/tokenlease or fallback
    pub fn data_dir() -> PathBuf {
        resolve(
            env::var_os("XDG_DATA_HOME"),
            dirs::home_dir(),
            ".local/share",
        )
    }
}

// Empty values count as unset
fn resolve(var: Option<OsString>, home: Option<PathBuf>, home_relative: &str) -> PathBuf {
    var.filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            home.map(|home| home.join(home_relative))
                .unwrap_or_else(|| PathBuf::from(home_relative))
        })
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_value_wins() {
        let path = resolve(
            Some("/tmp/data".into()),
            Some(PathBuf::from("/home/op")),
            ".local/share",
        );
        assert_eq!(path, PathBuf::from("/tmp/data/tokenlease"));
    }

    #[test]
    fn test_home_fallback() {
        let path = resolve(None, Some(PathBuf::from("/home/op")), ".local/share");
        assert_eq!(path, PathBuf::from("/home/op/.local/share/tokenlease"));

        let path = resolve(Some("".into()), Some(PathBuf::from("/home/op")), ".config");
        assert_eq!(path, PathBuf::from("/home/op/.config/tokenlease"));
    }

    #[test]
    fn test_relative_fallback_without_home() {
        assert_eq!(
            resolve(None, None, ".local/share"),
            PathBuf::from(".local/share/tokenlease")
        );
    }
}
