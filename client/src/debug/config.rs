//! Logging configuration from environment variables

use std::path::PathBuf;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_LEVEL: &str = "client=info,warn";

/// Name of the rotated log file inside the log directory
pub const LOG_FILE_NAME: &str = "client-debug.log";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugConfig {
    /// Log directory (for rotation)
    pub log_dir: PathBuf,
    /// Log level filter (e.g., "client=debug,info")
    pub log_level: String,
    /// Mirror log output to stderr
    pub log_to_stderr: bool,
    /// Write the file log as JSON lines
    pub json: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_to_stderr: cfg!(feature = "debug-mode"),
            json: false,
        }
    }
}

impl DebugConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |name: &str, default: bool| {
            lookup(name)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(default)
        };

        Self {
            log_dir: lookup("CLIENT_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            log_level: lookup("RUST_LOG")
                .filter(|level| !level.trim().is_empty())
                .unwrap_or(defaults.log_level),
            log_to_stderr: flag("CLIENT_LOG_STDERR", defaults.log_to_stderr),
            json: flag("CLIENT_LOG_JSON", defaults.json),
        }
    }

    /// Full path of the current log file
    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }

    /// Check if debug logging is enabled
    pub fn is_debug_enabled(&self) -> bool {
        self.log_level.contains("debug") || self.log_level.contains("trace")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = DebugConfig::from_lookup(lookup(&[]));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.log_file(), PathBuf::from("logs").join("client-debug.log"));
        assert!(!config.json);
        assert!(!config.is_debug_enabled());
    }

    #[test]
    fn test_overrides() {
        let config = DebugConfig::from_lookup(lookup(&[
            ("CLIENT_LOG_DIR", "/tmp/client-logs"),
            ("RUST_LOG", "client=debug"),
            ("CLIENT_LOG_STDERR", "1"),
            ("CLIENT_LOG_JSON", "true"),
        ]));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/client-logs"));
        assert!(config.is_debug_enabled());
        assert!(config.log_to_stderr);
        assert!(config.json);
    }

    #[test]
    fn test_blank_filter_falls_back() {
        let config = DebugConfig::from_lookup(lookup(&[("RUST_LOG", "  ")]));
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }
}
