//! Configuration schema definitions
//!
//! Defines the structure of `config.yaml`. Unknown keys are rejected so
//! typos surface in `kubegraph config validate`.

use super::defaults::{default_namespace, default_true, default_warn_after_seconds};
use crate::graph::viewer::ViewerOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Namespace of the root object when `-n` is not given
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Kubeconfig context to use instead of the current one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(default)]
    pub traversal: TraversalConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Traversal tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TraversalConfig {
    /// Report traversals running longer than this many seconds
    #[serde(default = "default_warn_after_seconds")]
    pub warn_after_seconds: u64,

    /// Expand owned descendants of the root object
    #[serde(default = "default_true")]
    pub visit_descendants: bool,
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Prefix prepended to dashboard paths of graph nodes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link_prefix: String,
}

/// How a built graph is printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
    /// One line per node and edge
    Text,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yaml",
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "json" => Ok(OutputFormat::Json),
            "text" | "txt" => Ok(OutputFormat::Text),
            _ => Err(format!(
                "Unknown output format: {} (expected yaml, json or text)",
                s
            )),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_namespace: default_namespace(),
            context: None,
            traversal: TraversalConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            warn_after_seconds: default_warn_after_seconds(),
            visit_descendants: default_true(),
        }
    }
}

impl TraversalConfig {
    pub fn viewer_options(&self) -> ViewerOptions {
        ViewerOptions {
            warn_after: Duration::from_secs(self.warn_after_seconds),
            visit_descendants: self.visit_descendants,
        }
    }
}
