//! Kubernetes API Strategy (spec.md §4.10).

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Notify;

use crate::config::{IpLookupMode, KubernetesConfig, PeerNameMode};
use crate::constants::{CLUSTER_DOMAIN_ENV_VAR, HTTP_REQUEST_TIMEOUT};
use crate::error::Error;
use crate::peer::Peer;
use crate::reconcile::{reconcile, Prune};
use crate::strategy::{ExitReason, WorkerContext};

/// A discovered `(ip, namespace, hostname)` triple (spec.md §4.10 step 5).
#[derive(Clone, Debug, PartialEq, Eq)]
struct Endpoint {
    ip: String,
    namespace: String,
    hostname: Option<String>,
}

async fn read_token(sa_path: &std::path::Path) -> String {
    tokio::fs::read_to_string(sa_path.join("token"))
        .await
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

async fn read_namespace(sa_path: &std::path::Path) -> Option<String> {
    tokio::fs::read_to_string(sa_path.join("namespace"))
        .await
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

async fn ca_cert(sa_path: &std::path::Path) -> Option<reqwest::Certificate> {
    let bytes = tokio::fs::read(sa_path.join("ca.crt")).await.ok()?;
    reqwest::Certificate::from_pem(&bytes).ok()
}

fn cluster_domain(cluster_name: &str) -> String {
    std::env::var(CLUSTER_DOMAIN_ENV_VAR).unwrap_or_else(|_| format!("{cluster_name}.local"))
}

/// Composes the API apex (spec.md §4.10 step 2): `master` is used verbatim
/// if it already ends with the cluster domain or with a literal `.`.
/// Otherwise the cluster domain is appended and the whole thing is reached
/// over `https`, as every real cluster master is.
fn api_apex(master: &str, cluster_name: &str) -> String {
    #[cfg(test)]
    if master.starts_with("http://") || master.starts_with("https://") {
        // Test-only seam: lets a `wiremock::MockServer`'s plain-HTTP URI
        // stand in for `kubernetes_master` without a TLS-terminating mock.
        // A real master value never carries a scheme, so this never
        // triggers outside `#[cfg(test)]`.
        return format!("{}/", master.trim_end_matches('/'));
    }
    let domain = cluster_domain(cluster_name);
    if master.ends_with(&domain) || master.ends_with('.') {
        format!("https://{master}/")
    } else {
        format!("https://{master}.{domain}/")
    }
}

fn api_path(config: &KubernetesConfig, namespace: &str) -> Result<String, String> {
    let selector = config
        .kubernetes_selector
        .as_deref()
        .ok_or_else(|| "missing kubernetes_selector".to_string())?;
    let resource = match config.kubernetes_ip_lookup_mode {
        IpLookupMode::Endpoints => "endpoints",
        IpLookupMode::Pods => "pods",
    };
    let encoded_selector = url::form_urlencoded::byte_serialize(selector.as_bytes()).collect::<String>();
    let mut path = format!(
        "api/v1/namespaces/{namespace}/{resource}?labelSelector={encoded_selector}"
    );
    if config.kubernetes_use_cached_resources {
        path.push_str("&resourceVersion=0");
    }
    Ok(path)
}

fn flatten_endpoints(body: &Value) -> Vec<Endpoint> {
    let mut out = Vec::new();
    for item in body["items"].as_array().into_iter().flatten() {
        let namespace = item["metadata"]["namespace"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        for subset in item["subsets"].as_array().into_iter().flatten() {
            for addr in subset["addresses"].as_array().into_iter().flatten() {
                if let Some(ip) = addr["ip"].as_str() {
                    out.push(Endpoint {
                        ip: ip.to_string(),
                        namespace: namespace.clone(),
                        hostname: addr["hostname"].as_str().map(str::to_string),
                    });
                }
            }
        }
    }
    out
}

fn flatten_pods(body: &Value) -> Vec<Endpoint> {
    let mut out = Vec::new();
    for item in body["items"].as_array().into_iter().flatten() {
        let ip = match item["status"]["podIP"].as_str() {
            Some(ip) => ip,
            None => continue,
        };
        let namespace = item["metadata"]["namespace"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let hostname = item["spec"]["hostname"].as_str().map(str::to_string);
        out.push(Endpoint {
            ip: ip.to_string(),
            namespace,
            hostname,
        });
    }
    out
}

fn peer_name(
    endpoint: &Endpoint,
    basename: &str,
    mode: PeerNameMode,
    service_name: Option<&str>,
    cluster_name: &str,
) -> Peer {
    match mode {
        PeerNameMode::Ip => Peer::new(basename, &endpoint.ip),
        PeerNameMode::Hostname => {
            let hostname = endpoint.hostname.as_deref().unwrap_or_default();
            let service = service_name.unwrap_or_default();
            Peer::new(
                basename,
                format!(
                    "{hostname}.{service}.{namespace}.svc.{cluster_name}.local",
                    namespace = endpoint.namespace
                ),
            )
        }
        PeerNameMode::Dns => {
            let dashed = endpoint.ip.replace('.', "-");
            Peer::new(
                basename,
                format!(
                    "{dashed}.{namespace}.pod.{cluster_name}.local",
                    namespace = endpoint.namespace
                ),
            )
        }
    }
}

async fn tick(
    config: &KubernetesConfig,
    ctx: &WorkerContext,
    client: &reqwest::Client,
    previous: &HashSet<Peer>,
) -> HashSet<Peer> {
    let basename = match config.kubernetes_node_basename.as_deref() {
        Some(basename) if !basename.is_empty() => basename,
        _ => {
            tracing::warn!(topology = %ctx.topology, "kubernetes strategy is missing kubernetes_node_basename, leaving membership unchanged");
            return previous.clone();
        }
    };

    let namespace = match &config.kubernetes_namespace {
        Some(ns) => ns.clone(),
        None => match read_namespace(&config.kubernetes_service_account_path).await {
            Some(ns) => ns,
            None => {
                tracing::warn!(topology = %ctx.topology, "kubernetes strategy could not determine a namespace, leaving membership unchanged");
                return previous.clone();
            }
        },
    };

    let path = match api_path(config, &namespace) {
        Ok(path) => path,
        Err(reason) => {
            tracing::warn!(topology = %ctx.topology, reason, "kubernetes strategy is missing required config, leaving membership unchanged");
            return previous.clone();
        }
    };

    let token = read_token(&config.kubernetes_service_account_path).await;
    let url = format!(
        "{}{}",
        api_apex(&config.kubernetes_master, &config.kubernetes_cluster_name),
        path
    );

    let response = client
        .get(&url)
        .bearer_auth(token)
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(topology = %ctx.topology, %err, "kubernetes API request failed, preserving membership");
            return previous.clone();
        }
    };

    let status = response.status();
    if status.as_u16() == 403 {
        let body: Value = response.json().await.unwrap_or_default();
        let message = body["message"].as_str().unwrap_or("forbidden").to_string();
        tracing::warn!(topology = %ctx.topology, message, "kubernetes API returned 403, preserving membership");
        return previous.clone();
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(topology = %ctx.topology, %status, body, "kubernetes API returned a non-200 response, preserving membership");
        return previous.clone();
    }

    let body: Value = match response.json().await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(topology = %ctx.topology, %err, "kubernetes API returned unparseable JSON, preserving membership");
            return previous.clone();
        }
    };

    let endpoints = match config.kubernetes_ip_lookup_mode {
        IpLookupMode::Endpoints => flatten_endpoints(&body),
        IpLookupMode::Pods => flatten_pods(&body),
    };

    let desired: HashSet<Peer> = endpoints
        .iter()
        .map(|endpoint| {
            peer_name(
                endpoint,
                basename,
                config.mode,
                config.kubernetes_service_name.as_deref(),
                &config.kubernetes_cluster_name,
            )
        })
        .filter(|peer| *peer != ctx.local_node)
        .collect();

    reconcile(&ctx.topology, &desired, previous, &ctx.local_node, &ctx.callbacks, Prune::Enabled).await
}

fn build_client(ca: Option<reqwest::Certificate>) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().timeout(HTTP_REQUEST_TIMEOUT);
    builder = match ca {
        Some(cert) => builder.add_root_certificate(cert),
        // spec.md §4.10 step 4: no ca.crt present means `verify_none`.
        None => builder.danger_accept_invalid_certs(true),
    };
    builder.build()
}

pub async fn run(config: &KubernetesConfig, ctx: &WorkerContext, shutdown: Arc<Notify>) -> ExitReason {
    let ca = ca_cert(&config.kubernetes_service_account_path).await;
    let client = match build_client(ca) {
        Ok(client) => client,
        Err(source) => {
            return ExitReason::Crashed(Error::HttpClientBuild {
                topology: ctx.topology.clone(),
                source,
            })
        }
    };

    let mut previous = HashSet::new();
    loop {
        tokio::select! {
            _ = shutdown.notified() => return ExitReason::Shutdown,
            _ = tokio::time::sleep(config.polling_interval()) => {
                previous = tick(config, ctx, &client, &previous).await;
            }
        }
    }
}
