//! Nomad Service API Strategy (spec.md §4.11).

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Notify;

use crate::config::NomadConfig;
use crate::constants::HTTP_REQUEST_TIMEOUT;
use crate::error::Error;
use crate::peer::Peer;
use crate::reconcile::{reconcile, Prune};
use crate::strategy::{ExitReason, WorkerContext};

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    #[serde(rename = "Address")]
    address: String,
}

fn service_url(server_url: &str, service_name: &str, namespace: Option<&str>) -> String {
    let base = server_url.trim_end_matches('/');
    match namespace {
        Some(ns) => format!("{base}/v1/service/{service_name}?namespace={ns}"),
        None => format!("{base}/v1/service/{service_name}"),
    }
}

async fn fetch(
    client: &reqwest::Client,
    config: &NomadConfig,
) -> Result<Vec<ServiceEntry>, reqwest::Error> {
    let url = service_url(&config.nomad_server_url, &config.service_name, config.namespace.as_deref());
    let mut request = client.get(&url);
    if let Some(token) = &config.token {
        request = request.header("X-Nomad-Token", token);
    }
    request.send().await?.error_for_status()?.json().await
}

async fn tick(
    config: &NomadConfig,
    ctx: &WorkerContext,
    client: &reqwest::Client,
    previous: &HashSet<Peer>,
) -> HashSet<Peer> {
    let entries = match fetch(client, config).await {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(topology = %ctx.topology, %err, "nomad service lookup failed, preserving membership");
            return previous.clone();
        }
    };

    let desired: HashSet<Peer> = entries
        .into_iter()
        .map(|entry| Peer::new(&config.node_basename, entry.address))
        .filter(|peer| *peer != ctx.local_node)
        .collect();

    reconcile(&ctx.topology, &desired, previous, &ctx.local_node, &ctx.callbacks, Prune::Enabled).await
}

pub async fn run(config: &NomadConfig, ctx: &WorkerContext, shutdown: Arc<Notify>) -> ExitReason {
    let client = match reqwest::Client::builder().timeout(HTTP_REQUEST_TIMEOUT).build() {
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
