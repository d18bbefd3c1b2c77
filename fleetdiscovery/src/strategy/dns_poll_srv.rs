//! DNS-Poll-SRV Strategy, headless-service style (spec.md §4.9).

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::config::DnsPollSrvConfig;
use crate::constants::{CLUSTER_DOMAIN_ENV_VAR, DEFAULT_SRV_CLUSTER_DOMAIN};
use crate::dns::{SrvResolver, SystemResolver};
use crate::error::Error;
use crate::peer::Peer;
use crate::reconcile::{reconcile, Prune};
use crate::strategy::{ExitReason, WorkerContext};

fn cluster_domain() -> String {
    std::env::var(CLUSTER_DOMAIN_ENV_VAR).unwrap_or_else(|_| DEFAULT_SRV_CLUSTER_DOMAIN.to_string())
}

fn srv_query(config: &DnsPollSrvConfig) -> String {
    format!(
        "{}.{}.svc.{}",
        config.service,
        config.namespace,
        cluster_domain()
    )
}

async fn tick(
    config: &DnsPollSrvConfig,
    ctx: &WorkerContext,
    resolver: &dyn SrvResolver,
    previous: &HashSet<Peer>,
) -> HashSet<Peer> {
    let query = srv_query(config);
    let targets = match resolver.lookup_srv(&query).await {
        Ok(targets) => targets,
        Err(err) => {
            tracing::warn!(topology = %ctx.topology, %err, query, "dns-srv lookup failed, preserving membership");
            return previous.clone();
        }
    };

    let desired: HashSet<Peer> = targets
        .into_iter()
        .map(|target| Peer::new(&config.application_name, target))
        .filter(|peer| *peer != ctx.local_node)
        .collect();

    reconcile(&ctx.topology, &desired, previous, &ctx.local_node, &ctx.callbacks, Prune::Enabled).await
}

pub async fn run(config: &DnsPollSrvConfig, ctx: &WorkerContext, shutdown: Arc<Notify>) -> ExitReason {
    let owned_resolver;
    let resolver: &dyn SrvResolver = match &ctx.srv_resolver {
        Some(resolver) => resolver.as_ref(),
        None => match SystemResolver::from_system_conf() {
            Ok(resolver) => {
                owned_resolver = resolver;
                &owned_resolver
            }
            Err(reason) => {
                return ExitReason::Crashed(Error::DnsResolverBuild {
                    topology: ctx.topology.clone(),
                    reason,
                });
            }
        },
    };

    let mut previous = HashSet::new();
    loop {
        tokio::select! {
            _ = shutdown.notified() => return ExitReason::Shutdown,
            _ = tokio::time::sleep(config.polling_interval()) => {
                previous = tick(config, ctx, resolver, &previous).await;
            }
        }
    }
}
