//! Static Host Strategy (spec.md §4.4).

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::config::StaticConfig;
use crate::reconcile::{reconcile, Prune};
use crate::strategy::{ExitReason, WorkerContext};

/// A one-shot: reconcile once against `config.hosts`, unless `timeout` turns
/// it into a periodic worker that re-runs the reconcile to recover from
/// transient connection failures (spec.md §4.4).
pub async fn run(config: &StaticConfig, ctx: &WorkerContext, shutdown: Arc<Notify>) -> ExitReason {
    if config.hosts.is_empty() {
        tracing::debug!(topology = %ctx.topology, "static strategy has no hosts configured, nothing to do");
        return ExitReason::Finished;
    }

    let desired: HashSet<_> = config.hosts.iter().cloned().collect();

    match config.timeout() {
        None => {
            let _previous = reconcile(
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
        Some(interval) => {
            let mut previous = HashSet::new();
            loop {
                tokio::select! {
                    _ = shutdown.notified() => return ExitReason::Shutdown,
                    _ = tokio::time::sleep(interval) => {
                        previous = reconcile(
                            &ctx.topology,
                            &desired,
                            &previous,
                            &ctx.local_node,
                            &ctx.callbacks,
                            Prune::Enabled,
                        )
                        .await;
                    }
                }
            }
        }
    }
}
