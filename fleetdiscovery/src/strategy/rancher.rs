//! Rancher Metadata Strategy (spec.md §4.11).
//!
//! Polls the Rancher metadata service for the containers backing one or
//! more services and reconciles against them. Shares its HTTP/JSON skeleton
//! with [`kubernetes`](super::kubernetes), minus the service-account
//! plumbing: the metadata endpoint is reachable unauthenticated from inside
//! a Rancher-managed container.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Notify;

use crate::config::RancherConfig;
use crate::constants::HTTP_REQUEST_TIMEOUT;
use crate::error::Error;
use crate::peer::Peer;
use crate::reconcile::{reconcile, Prune};
use crate::strategy::{ExitReason, WorkerContext};

const RANCHER_METADATA_BASE: &str = "http://rancher-metadata.rancher.internal/2015-12-19";

#[derive(Debug, Deserialize)]
struct Container {
    state: String,
    #[serde(default)]
    ips: Vec<String>,
}

fn service_path(service: &str, stack: Option<&str>) -> String {
    match stack {
        Some(stack) => format!("/stacks/{stack}/services/{service}/containers"),
        None => format!("/services/{service}/containers"),
    }
}

fn running_ips(containers: &[Container]) -> Vec<String> {
    containers
        .iter()
        .filter(|container| container.state == "running")
        .flat_map(|container| container.ips.iter())
        .map(|ip| ip.split('/').next().unwrap_or(ip).to_string())
        .collect()
}

async fn fetch_service(
    client: &reqwest::Client,
    service: &str,
    stack: Option<&str>,
) -> Result<Vec<Container>, reqwest::Error> {
    let url = format!("{RANCHER_METADATA_BASE}{}", service_path(service, stack));
    client
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

async fn tick(
    config: &RancherConfig,
    ctx: &WorkerContext,
    client: &reqwest::Client,
    previous: &HashSet<Peer>,
) -> HashSet<Peer> {
    let service = match config.service.as_deref() {
        Some(service) if !service.is_empty() => service,
        _ => {
            tracing::warn!(topology = %ctx.topology, "rancher strategy is missing `service`, leaving membership unchanged");
            return previous.clone();
        }
    };

    let stacks: Vec<Option<&str>> = if !config.stacks.is_empty() {
        config.stacks.iter().map(|s| Some(s.as_str())).collect()
    } else {
        vec![config.stack.as_deref()]
    };

    let mut ips = Vec::new();
    for stack in stacks {
        match fetch_service(client, service, stack).await {
            Ok(containers) => ips.extend(running_ips(&containers)),
            Err(err) => {
                tracing::warn!(topology = %ctx.topology, %err, service, stack, "rancher metadata request failed, preserving membership");
                return previous.clone();
            }
        }
    }

    let desired: HashSet<Peer> = ips
        .into_iter()
        .map(|ip| Peer::new(&config.node_basename, ip))
        .filter(|peer| *peer != ctx.local_node)
        .collect();

    reconcile(&ctx.topology, &desired, previous, &ctx.local_node, &ctx.callbacks, Prune::Enabled).await
}

pub async fn run(config: &RancherConfig, ctx: &WorkerContext, shutdown: Arc<Notify>) -> ExitReason {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_path_without_stack() {
        assert_eq!(service_path("web", None), "/services/web/containers");
    }

    #[test]
    fn service_path_with_stack() {
        assert_eq!(
            service_path("web", Some("prod")),
            "/stacks/prod/services/web/containers"
        );
    }

    #[test]
    fn running_ips_filters_stopped_containers_and_strips_cidr() {
        let containers = vec![
            Container {
                state: "running".to_string(),
                ips: vec!["10.0.0.1/16".to_string()],
            },
            Container {
                state: "stopped".to_string(),
                ips: vec!["10.0.0.2/16".to_string()],
            },
        ];
        assert_eq!(running_ips(&containers), vec!["10.0.0.1".to_string()]);
    }
}
