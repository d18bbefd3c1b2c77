//! DNS-Poll-A Strategy (spec.md §4.8).

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::config::DnsPollAConfig;
use crate::dns::{AddressResolver, SystemResolver};
use crate::error::Error;
use crate::peer::Peer;
use crate::reconcile::{reconcile, Prune};
use crate::strategy::{ExitReason, WorkerContext};

/// Resolves `config.query` to A/AAAA addresses, formats each as
/// `basename@address`, and reconciles. Missing `query`/`node_basename` is a
/// configuration error: logged and left unchanged rather than treated as
/// "disconnect everyone" (spec.md §4.8).
async fn tick(
    config: &DnsPollAConfig,
    ctx: &WorkerContext,
    resolver: &dyn AddressResolver,
    previous: &HashSet<Peer>,
) -> HashSet<Peer> {
    let (query, basename) = match (config.query.as_deref(), config.node_basename.as_deref()) {
        (Some(query), Some(basename)) if !query.is_empty() && !basename.is_empty() => {
            (query, basename)
        }
        _ => {
            tracing::warn!(
                topology = %ctx.topology,
                "dns-a strategy is missing `query` or `node_basename`, leaving membership unchanged"
            );
            return previous.clone();
        }
    };

    let addrs = match resolver.lookup_ip(query).await {
        Ok(addrs) => addrs,
        Err(err) => {
            tracing::warn!(topology = %ctx.topology, %err, "dns-a lookup failed, preserving membership");
            return previous.clone();
        }
    };

    let prune = if config.prune { Prune::Enabled } else { Prune::Disabled };
    let desired: HashSet<Peer> = addrs
        .into_iter()
        .map(|addr| Peer::new(basename, addr.to_string()))
        .filter(|peer| *peer != ctx.local_node)
        .collect();

    reconcile(&ctx.topology, &desired, previous, &ctx.local_node, &ctx.callbacks, prune).await
}

pub async fn run(config: &DnsPollAConfig, ctx: &WorkerContext, shutdown: Arc<Notify>) -> ExitReason {
    let owned_resolver;
    let resolver: &dyn AddressResolver = match &ctx.dns_resolver {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{CallbackOutcome, Callbacks};
    use crate::dns::mock::ScriptedAddressResolver;
    use crate::peer::TopologyName;
    use std::net::IpAddr;
    use std::sync::Mutex;

    fn ctx_with_callbacks() -> (WorkerContext, Arc<Mutex<Vec<Peer>>>, Arc<Mutex<Vec<Peer>>>) {
        let connects: Arc<Mutex<Vec<Peer>>> = Arc::new(Mutex::new(Vec::new()));
        let disconnects: Arc<Mutex<Vec<Peer>>> = Arc::new(Mutex::new(Vec::new()));
        let c = connects.clone();
        let d = disconnects.clone();
        let ctx = WorkerContext {
            topology: TopologyName::new("dns"),
            local_node: Peer::new("self", "0.0.0.0"),
            names_on: None,
            dns_resolver: None,
            srv_resolver: None,
            callbacks: Callbacks::new(
                move |peer| {
                    let c = c.clone();
                    async move {
                        c.lock().unwrap().push(peer);
                        CallbackOutcome::True
                    }
                },
                move |peer| {
                    let d = d.clone();
                    async move {
                        d.lock().unwrap().push(peer);
                        CallbackOutcome::True
                    }
                },
                || async { HashSet::new() },
            ),
        };
        (ctx, connects, disconnects)
    }

    #[tokio::test]
    async fn scenario_b_dns_a_churn() {
        let (ctx, connects, disconnects) = ctx_with_callbacks();
        let resolver = ScriptedAddressResolver::new(vec![
            Ok(vec![
                "10.0.0.1".parse::<IpAddr>().unwrap(),
                "10.0.0.2".parse::<IpAddr>().unwrap(),
            ]),
            Ok(vec!["10.0.0.1".parse::<IpAddr>().unwrap()]),
        ]);
        let config = DnsPollAConfig {
            query: Some("svc.local".to_string()),
            node_basename: Some("node".to_string()),
            polling_interval_ms: 5000,
            prune: true,
        };

        let tick1 = tick(&config, &ctx, &resolver, &HashSet::new()).await;
        assert_eq!(
            tick1,
            [Peer::new("node", "10.0.0.1"), Peer::new("node", "10.0.0.2")]
                .into_iter()
                .collect()
        );

        let _tick2 = tick(&config, &ctx, &resolver, &tick1).await;
        assert_eq!(connects.lock().unwrap().len(), 2);
        assert_eq!(disconnects.lock().unwrap(), &vec![Peer::new("node", "10.0.0.2")]);
    }

    #[tokio::test]
    async fn scenario_c_prune_false_skips_disconnect() {
        let (ctx, _connects, disconnects) = ctx_with_callbacks();
        let resolver = ScriptedAddressResolver::new(vec![
            Ok(vec![
                "10.0.0.1".parse::<IpAddr>().unwrap(),
                "10.0.0.2".parse::<IpAddr>().unwrap(),
            ]),
            Ok(vec!["10.0.0.1".parse::<IpAddr>().unwrap()]),
        ]);
        let config = DnsPollAConfig {
            query: Some("svc.local".to_string()),
            node_basename: Some("node".to_string()),
            polling_interval_ms: 5000,
            prune: false,
        };

        let tick1 = tick(&config, &ctx, &resolver, &HashSet::new()).await;
        let tick2 = tick(&config, &ctx, &resolver, &tick1).await;
        assert!(disconnects.lock().unwrap().is_empty());
        assert_eq!(tick2.len(), 2);
    }

    #[tokio::test]
    async fn missing_config_preserves_previous_membership() {
        let (ctx, connects, disconnects) = ctx_with_callbacks();
        let resolver = ScriptedAddressResolver::new(vec![]);
        let config = DnsPollAConfig {
            query: None,
            node_basename: Some("node".to_string()),
            polling_interval_ms: 5000,
            prune: true,
        };
        let previous: HashSet<Peer> = [Peer::new("node", "10.0.0.1")].into_iter().collect();
        let result = tick(&config, &ctx, &resolver, &previous).await;
        assert_eq!(result, previous);
        assert!(connects.lock().unwrap().is_empty());
        assert!(disconnects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolver_error_preserves_previous_membership() {
        let (ctx, _connects, disconnects) = ctx_with_callbacks();
        let resolver = ScriptedAddressResolver::new(vec![Err("timeout".to_string())]);
        let config = DnsPollAConfig {
            query: Some("svc.local".to_string()),
            node_basename: Some("node".to_string()),
            polling_interval_ms: 5000,
            prune: true,
        };
        let previous: HashSet<Peer> = [Peer::new("node", "10.0.0.1")].into_iter().collect();
        let result = tick(&config, &ctx, &resolver, &previous).await;
        assert_eq!(result, previous);
        assert!(disconnects.lock().unwrap().is_empty());
    }
}
