//! Kubernetes client construction
//!
//! Loads the kubeconfig (or in-cluster config), optionally for a named
//! context, and warns when a proxy is configured that would intercept
//! traffic to a private API server.

use anyhow::{Context, Result};
use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use url::Url;

/// Build a client for the given kubeconfig context, or the current one
pub async fn create_client(context: Option<&str>) -> Result<Client> {
    let config = match context {
        Some(name) => {
            let options = KubeConfigOptions {
                context: Some(name.to_string()),
                ..Default::default()
            };
            Config::from_kubeconfig(&options)
                .await
                .with_context(|| format!("Failed to load kubeconfig context '{}'", name))?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    if let Ok(url) = Url::parse(&config.cluster_url.to_string())
        && let Some(host) = url.host_str()
    {
        tracing::debug!("Connecting to API server at {}", host);
        warn_if_proxied(host);
    }

    Client::try_from(config).context("Failed to create Kubernetes client")
}

fn env_any(names: &[&str]) -> String {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn warn_if_proxied(host: &str) {
    let proxy = env_any(&["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"]);
    if proxy.is_empty() || !is_private_host(host) {
        return;
    }
    let no_proxy = env_any(&["NO_PROXY", "no_proxy"]);
    if !no_proxy_covers(&no_proxy, host) {
        tracing::warn!(
            "API server {} looks private but is not listed in NO_PROXY; requests will go through {}",
            host,
            proxy
        );
    }
}

/// Private addresses and internal-looking domain names
fn is_private_host(host: &str) -> bool {
    if matches!(host, "localhost" | "127.0.0.1" | "::1")
        || host.starts_with("10.")
        || host.starts_with("192.168.")
    {
        return true;
    }
    if let Some(rest) = host.strip_prefix("172.")
        && let Some(second) = rest.split('.').next().and_then(|s| s.parse::<u8>().ok())
    {
        return (16..=31).contains(&second);
    }

    let labels: Vec<&str> = host.split('.').collect();
    let Some((tld, domain)) = labels.split_last() else {
        return false;
    };
    matches!(*tld, "local" | "internal" | "lan" | "svc")
        || domain
            .iter()
            .any(|label| matches!(*label, "corp" | "internal" | "int" | "svc"))
}

/// Whether a NO_PROXY list covers `host`, exactly or as a parent domain
fn no_proxy_covers(no_proxy: &str, host: &str) -> bool {
    no_proxy
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .any(|entry| {
            if entry == "*" {
                return true;
            }
            let domain = entry.trim_start_matches("*.").trim_start_matches('.');
            host == domain || host.ends_with(&format!(".{}", domain))
        })
}
