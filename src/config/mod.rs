//! Configuration for kubegraph
//!
//! A single optional `config.yaml` under the config directory, layered
//! over built-in defaults and `KUBEGRAPH_*` environment overrides.

mod defaults;
pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{Config, OutputFormat};

use anyhow::Context;

/// Keys accepted by [`get_config_value`] and [`set_config_value`]
pub const CONFIG_KEYS: &[&str] = &[
    "defaultNamespace",
    "context",
    "traversal.warnAfterSeconds",
    "traversal.visitDescendants",
    "output.format",
    "output.linkPrefix",
];

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &Config, key: &str) -> anyhow::Result<String> {
    match key {
        "defaultNamespace" => Ok(config.default_namespace.clone()),
        "context" => Ok(config.context.clone().unwrap_or_default()),
        "traversal.warnAfterSeconds" => Ok(config.traversal.warn_after_seconds.to_string()),
        "traversal.visitDescendants" => Ok(config.traversal.visit_descendants.to_string()),
        "output.format" => Ok(config.output.format.to_string()),
        "output.linkPrefix" => Ok(config.output.link_prefix.clone()),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> anyhow::Result<()> {
    match key {
        "defaultNamespace" => {
            if value.is_empty() {
                anyhow::bail!("defaultNamespace must not be empty");
            }
            config.default_namespace = value.to_string();
        }
        "context" => {
            config.context = (!value.is_empty()).then(|| value.to_string());
        }
        "traversal.warnAfterSeconds" => {
            config.traversal.warn_after_seconds = value
                .parse()
                .context("traversal.warnAfterSeconds must be a number")?;
        }
        "traversal.visitDescendants" => {
            config.traversal.visit_descendants = value
                .parse()
                .context("traversal.visitDescendants must be 'true' or 'false'")?;
        }
        "output.format" => {
            config.output.format = value.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }
        "output.linkPrefix" => {
            config.output.link_prefix = value.trim_end_matches('/').to_string();
        }
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
    Ok(())
}
