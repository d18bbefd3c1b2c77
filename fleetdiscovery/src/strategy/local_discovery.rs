//! Local Discovery Strategy (spec.md §4.5): a one-shot, EPMD-style lookup
//! of names registered on the local host.

use std::collections::HashSet;

use crate::config::LocalDiscoveryConfig;
use crate::peer::Peer;
use crate::reconcile::{reconcile, Prune};
use crate::strategy::{ExitReason, WorkerContext};

/// Asks the local name registry for the names it knows about on the same
/// host as the local node, composes `name@host` peers using the host
/// suffix derived from the local node's own name, and reconciles against
/// that list (spec.md §4.5).
pub async fn run(_config: &LocalDiscoveryConfig, ctx: &WorkerContext) -> ExitReason {
    let names_on = match &ctx.names_on {
        Some(names_on) => names_on,
        None => {
            tracing::warn!(
                topology = %ctx.topology,
                "local discovery strategy has no name registry configured, nothing to do"
            );
            return ExitReason::Finished;
        }
    };

    let host = match ctx.local_node.parts() {
        Some((_, host)) => host.to_string(),
        None => {
            tracing::warn!(
                topology = %ctx.topology,
                local_node = %ctx.local_node,
                "local node name has no host suffix, cannot derive local host"
            );
            return ExitReason::Finished;
        }
    };

    let names = names_on(host.clone()).await;
    let desired: HashSet<Peer> = names
        .into_iter()
        .map(|basename| Peer::new(basename, &host))
        .collect();

    let _ = reconcile(
        &ctx.topology,
        &desired,
        &HashSet::new(),
        &ctx.local_node,
        &ctx.callbacks,
        Prune::Enabled,
    )
    .await;

    ExitReason::Finished
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{CallbackOutcome, Callbacks};
    use crate::peer::TopologyName;
    use crate::registry::names_on;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn connects_names_found_on_local_host() {
        let connects: Arc<Mutex<Vec<Peer>>> = Arc::new(Mutex::new(Vec::new()));
        let c = connects.clone();
        let ctx = WorkerContext {
            topology: TopologyName::new("local"),
            local_node: Peer::new("self", "box1"),
            dns_resolver: None,
            srv_resolver: None,
            names_on: Some(names_on(|_host| async { vec!["app".to_string()] })),
            callbacks: Callbacks::new(
                move |peer| {
                    let c = c.clone();
                    async move {
                        c.lock().unwrap().push(peer);
                        CallbackOutcome::True
                    }
                },
                |_| async { CallbackOutcome::True },
                || async { HashSet::new() },
            ),
        };
        let outcome = run(&LocalDiscoveryConfig::default(), &ctx).await;
        assert!(matches!(outcome, ExitReason::Finished));
        assert_eq!(connects.lock().unwrap().as_slice(), &[Peer::new("app", "box1")]);
    }

    #[tokio::test]
    async fn no_registry_configured_does_nothing() {
        let ctx = WorkerContext {
            topology: TopologyName::new("local"),
            local_node: Peer::new("self", "box1"),
            names_on: None,
            dns_resolver: None,
            srv_resolver: None,
            callbacks: Callbacks::new(
                |_| async { CallbackOutcome::True },
                |_| async { CallbackOutcome::True },
                || async { HashSet::new() },
            ),
        };
        let outcome = run(&LocalDiscoveryConfig::default(), &ctx).await;
        assert!(matches!(outcome, ExitReason::Finished));
    }
}
