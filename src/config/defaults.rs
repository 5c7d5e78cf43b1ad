//! Default configuration values

use super::schema::Config;

/// Namespace used when neither the command line nor the config names one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Seconds before a still-running traversal is reported
pub const DEFAULT_WARN_AFTER_SECONDS: u64 = 5;

/// Get the default configuration
pub fn default_config() -> Config {
    Config::default()
}

pub(super) fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

pub(super) fn default_warn_after_seconds() -> u64 {
    DEFAULT_WARN_AFTER_SECONDS
}

pub(super) fn default_true() -> bool {
    true
}
