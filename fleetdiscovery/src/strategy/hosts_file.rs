//! Hosts-File Strategy (spec.md §4.6).

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::config::HostsFileConfig;
use crate::peer::Peer;
use crate::reconcile::{reconcile, Prune};
use crate::strategy::{ExitReason, WorkerContext};

async fn read_hosts(path: &std::path::Path) -> Option<Vec<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Some(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Err(_) => None,
    }
}

async fn discover(config: &HostsFileConfig, ctx: &WorkerContext) -> Option<HashSet<Peer>> {
    let hosts = match read_hosts(&config.path).await {
        Some(hosts) => hosts,
        None => {
            tracing::warn!(
                topology = %ctx.topology,
                path = %config.path.display(),
                "hosts file does not exist"
            );
            return None;
        }
    };

    let names_on = match &ctx.names_on {
        Some(f) => f,
        None => {
            tracing::warn!(
                topology = %ctx.topology,
                "hosts file strategy has no name registry configured, nothing to do"
            );
            return Some(HashSet::new());
        }
    };

    let mut desired = HashSet::new();
    for host in hosts {
        for basename in names_on(host.clone()).await {
            let peer = Peer::new(basename, &host);
            if peer != ctx.local_node {
                desired.insert(peer);
            }
        }
    }
    Some(desired)
}

/// On start, reads the hosts file, resolves registered names on each host
/// via the local name registry, and reconciles. A missing file logs a
/// warning and exits "done" rather than crashing (spec.md §4.6). An
/// optional `timeout` re-runs the whole lookup periodically.
pub async fn run(config: &HostsFileConfig, ctx: &WorkerContext, shutdown: Arc<Notify>) -> ExitReason {
    match config.timeout() {
        None => {
            if let Some(desired) = discover(config, ctx).await {
                let _ = reconcile(
                    &ctx.topology,
                    &desired,
                    &HashSet::new(),
                    &ctx.local_node,
                    &ctx.callbacks,
                    Prune::Enabled,
                )
                .await;
            }
            ExitReason::Finished
        }
        Some(interval) => {
            let mut previous = HashSet::new();
            loop {
                tokio::select! {
                    _ = shutdown.notified() => return ExitReason::Shutdown,
                    _ = tokio::time::sleep(interval) => {
                        if let Some(desired) = discover(config, ctx).await {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{CallbackOutcome, Callbacks};
    use crate::peer::TopologyName;
    use crate::registry::names_on;
    use std::sync::Mutex;

    #[tokio::test]
    async fn missing_file_logs_and_finishes() {
        let ctx = WorkerContext {
            topology: TopologyName::new("hosts"),
            local_node: Peer::new("self", "box1"),
            dns_resolver: None,
            srv_resolver: None,
            names_on: Some(names_on(|_host| async { vec!["app".to_string()] })),
            callbacks: Callbacks::new(
                |_| async { CallbackOutcome::True },
                |_| async { CallbackOutcome::True },
                || async { HashSet::new() },
            ),
        };
        let config = HostsFileConfig {
            path: "/nonexistent/path/to/hosts".into(),
            timeout_ms: None,
        };
        let outcome = run(&config, &ctx, Arc::new(Notify::new())).await;
        assert!(matches!(outcome, ExitReason::Finished));
    }

    #[tokio::test]
    async fn reads_file_and_connects_resolved_peers() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("fleetdiscovery-hosts-test-{:?}", std::thread::current().id()));
        tokio::fs::write(&path, "box2\nbox3\n").await.unwrap();

        let connects: Arc<Mutex<Vec<Peer>>> = Arc::new(Mutex::new(Vec::new()));
        let c = connects.clone();
        let ctx = WorkerContext {
            topology: TopologyName::new("hosts"),
            local_node: Peer::new("self", "box1"),
            dns_resolver: None,
            srv_resolver: None,
            names_on: Some(names_on(|host| async move { vec![format!("app-{}", host)] })),
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
        let config = HostsFileConfig {
            path: path.clone(),
            timeout_ms: None,
        };
        let outcome = run(&config, &ctx, Arc::new(Notify::new())).await;
        assert!(matches!(outcome, ExitReason::Finished));

        let mut seen = connects.lock().unwrap().clone();
        seen.sort();
        let mut expected = vec![Peer::new("app-box2", "box2"), Peer::new("app-box3", "box3")];
        expected.sort();
        assert_eq!(seen, expected);

        tokio::fs::remove_file(&path).await.ok();
    }
}
