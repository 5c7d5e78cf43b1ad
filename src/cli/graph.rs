//! `kubegraph graph`

use anyhow::{Context, Result};
use clap::Args;
use kubegraph::config::{Config, ConfigLoader, OutputFormat};
use kubegraph::{
    BasicStatusEvaluator, CancelSignal, DashboardLinks, KubeStore, MemoryStore, ObjectKind,
    ObjectStore, ResourceGraph, ResourceViewer, StoreKey, client,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Kind of the root object (e.g. deployment, Service, hpa)
    pub kind: String,

    /// Name of the root object
    pub name: String,

    /// Namespace of the root object
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// apiVersion of the root object; required for kinds kubegraph does not know
    #[arg(long)]
    pub api_version: Option<String>,

    /// Read objects from a manifest file instead of the cluster
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Output format: yaml, json or text
    #[arg(long, short = 'o')]
    pub output: Option<OutputFormat>,
}

impl GraphArgs {
    /// Lookup key for the root object
    fn root_key(&self, config: &Config) -> Result<StoreKey> {
        let known = ObjectKind::from_str_case_insensitive(&self.kind);
        let kind = known.map(|k| k.as_str()).unwrap_or(self.kind.as_str());
        let api_version = match (&self.api_version, known) {
            (Some(api_version), _) => api_version.as_str(),
            (None, Some(known)) => known.api_version(),
            (None, None) => anyhow::bail!(
                "Unknown kind '{}'; pass --api-version to look it up",
                self.kind
            ),
        };

        let namespace = match known {
            Some(known) if known.is_cluster_scoped() => None,
            _ => Some(
                self.namespace
                    .as_deref()
                    .unwrap_or(config.default_namespace.as_str()),
            ),
        };
        Ok(StoreKey::named(namespace, api_version, kind, &self.name))
    }
}

async fn open_store(args: &GraphArgs, context: Option<&str>) -> Result<Arc<dyn ObjectStore>> {
    if let Some(path) = &args.file {
        let store = MemoryStore::from_file(path)
            .with_context(|| format!("Failed to load manifests from {}", path.display()))?;
        tracing::debug!("Using {:?}", store);
        return Ok(Arc::new(store));
    }
    let client = client::create_client(context).await?;
    Ok(Arc::new(KubeStore::new(client)))
}

/// Build and print the graph around one object
pub async fn run_graph(args: GraphArgs, context: Option<String>) -> Result<()> {
    let config = ConfigLoader::load();
    let context = context.or_else(|| config.context.clone());
    let key = args.root_key(&config)?;

    let store = open_store(&args, context.as_deref()).await?;
    let root = store
        .get(&key)
        .await
        .with_context(|| format!("Failed to fetch {}", key))?
        .with_context(|| format!("{} not found", key))?;

    let cancel = CancelSignal::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, returning the partial graph");
            on_interrupt.cancel();
        }
    });

    let viewer = ResourceViewer::new(
        store,
        Arc::new(BasicStatusEvaluator),
        Arc::new(DashboardLinks::new(config.output.link_prefix.clone())),
        config.traversal.viewer_options(),
    );
    let graph = viewer
        .build(vec![root], cancel)
        .await
        .with_context(|| format!("Failed to build graph for {}", key))?;

    print!("{}", render(&graph, args.output.unwrap_or(config.output.format))?);
    Ok(())
}

fn render(graph: &ResourceGraph, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(graph).context("Failed to serialize graph"),
        OutputFormat::Json => serde_json::to_string_pretty(graph)
            .map(|json| json + "\n")
            .context("Failed to serialize graph"),
        OutputFormat::Text => Ok(graph.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(kind: &str, api_version: Option<&str>, namespace: Option<&str>) -> GraphArgs {
        GraphArgs {
            kind: kind.to_string(),
            name: "web".to_string(),
            namespace: namespace.map(String::from),
            api_version: api_version.map(String::from),
            file: None,
            output: None,
        }
    }

    #[test]
    fn test_root_key_for_known_kind() {
        let key = args("deploy", None, None).root_key(&Config::default()).unwrap();
        assert_eq!(key.kind, "Deployment");
        assert_eq!(key.api_version, "apps/v1");
        assert_eq!(key.namespace.as_deref(), Some("default"));
        assert_eq!(key.name.as_deref(), Some("web"));
    }

    #[test]
    fn test_root_key_for_cluster_scoped_kind() {
        let key = args("ValidatingWebhookConfiguration", None, Some("shop"))
            .root_key(&Config::default())
            .unwrap();
        assert!(key.namespace.is_none());
    }

    #[test]
    fn test_root_key_for_unknown_kind() {
        assert!(args("Widget", None, None).root_key(&Config::default()).is_err());

        let key = args("Widget", Some("example.com/v1"), Some("shop"))
            .root_key(&Config::default())
            .unwrap();
        assert_eq!(key.kind, "Widget");
        assert_eq!(key.api_version, "example.com/v1");
        assert_eq!(key.namespace.as_deref(), Some("shop"));
    }
}
