//! Configuration loading
//!
//! Precedence order (highest to lowest):
//! 1. Environment variable overrides
//! 2. Root config file
//! 3. Built-in defaults

use super::{defaults, paths, schema::Config};
use anyhow::{Context, Result};
use std::path::Path;

pub const NAMESPACE_ENV: &str = "KUBEGRAPH_NAMESPACE";
pub const CONTEXT_ENV: &str = "KUBEGRAPH_CONTEXT";
pub const OUTPUT_ENV: &str = "KUBEGRAPH_OUTPUT";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// A root file that fails to parse is reported and ignored so a broken
    /// config never blocks graph builds; `validate` surfaces the error.
    pub fn load() -> Config {
        let path = paths::root_config_path();
        let config = if path.exists() {
            Self::load_file(&path).unwrap_or_else(|err| {
                tracing::warn!("Ignoring invalid configuration: {:#}", err);
                defaults::default_config()
            })
        } else {
            defaults::default_config()
        };

        Self::apply_overrides(config, |name| std::env::var(name).ok())
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Strict validation of the root config file, if one exists
    pub fn validate() -> Result<()> {
        let path = paths::root_config_path();
        if path.exists() {
            let config = Self::load_file(&path)?;
            Self::check(&config)?;
        }
        Ok(())
    }

    fn check(config: &Config) -> Result<()> {
        if config.default_namespace.is_empty() {
            anyhow::bail!("defaultNamespace must not be empty");
        }
        if config.traversal.warn_after_seconds == 0 {
            anyhow::bail!("traversal.warnAfterSeconds must be at least 1");
        }
        Ok(())
    }

    /// Apply overrides from `lookup`, normally the process environment
    ///
    /// Unparseable values are reported and skipped.
    pub fn apply_overrides(
        mut config: Config,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Config {
        if let Some(namespace) = lookup(NAMESPACE_ENV).filter(|v| !v.is_empty()) {
            config.default_namespace = namespace;
        }

        if let Some(context) = lookup(CONTEXT_ENV).filter(|v| !v.is_empty()) {
            config.context = Some(context);
        }

        if let Some(format) = lookup(OUTPUT_ENV) {
            match format.parse() {
                Ok(format) => config.output.format = format,
                Err(err) => tracing::warn!("Ignoring {}: {}", OUTPUT_ENV, err),
            }
        }

        config
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Save root configuration
    pub fn save_root(config: &Config) -> Result<()> {
        Self::save(config, &paths::root_config_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::OutputFormat;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_save_and_load_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.default_namespace = "shop".to_string();
        config.output.format = OutputFormat::Text;
        ConfigLoader::save(&config, &path).unwrap();

        let loaded = ConfigLoader::load_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_file_reports_parse_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "traversal: [not, a, map]\n").unwrap();

        let err = ConfigLoader::load_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_overrides() {
        let config = ConfigLoader::apply_overrides(
            Config::default(),
            env(&[
                (NAMESPACE_ENV, "payments"),
                (CONTEXT_ENV, "prod"),
                (OUTPUT_ENV, "json"),
            ]),
        );
        assert_eq!(config.default_namespace, "payments");
        assert_eq!(config.context.as_deref(), Some("prod"));
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_invalid_override_is_skipped() {
        let config = ConfigLoader::apply_overrides(
            Config::default(),
            env(&[(OUTPUT_ENV, "xml"), (NAMESPACE_ENV, "")]),
        );
        assert_eq!(config.output.format, OutputFormat::Yaml);
        assert_eq!(config.default_namespace, "default");
    }

    #[test]
    fn test_check() {
        assert!(ConfigLoader::check(&Config::default()).is_ok());

        let mut config = Config::default();
        config.traversal.warn_after_seconds = 0;
        assert!(ConfigLoader::check(&config).is_err());
    }
}
