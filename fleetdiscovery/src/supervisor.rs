//! The Topology Supervisor (spec.md §4.1).
//!
//! Owns one Worker task per configured topology and restarts it one-for-one
//! on crash, mirroring `zebra-network`'s separation between a long-running
//! task and the thing that (re)spawns it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::callbacks::{Callbacks, PartialCallbacks, TransportDefaults};
use crate::config::ClusterConfig;
use crate::dns::{SharedAddressResolver, SharedSrvResolver};
use crate::error::{Error, MissingCallbackKind, Result};
use crate::peer::{Peer, TopologyName};
use crate::registry::NamesOnFn;
use crate::strategy::{ExitReason, RestartPolicy, StrategyKind, WorkerContext};

/// A crash is retried after this delay rather than immediately, so a
/// permanently-broken worker (bad DNS config, unreachable API) does not spin
/// the executor.
const CRASH_RESTART_DELAY: Duration = Duration::from_secs(1);

/// Per-topology callback bindings supplied by the embedder, before defaults
/// are applied (spec.md §4.1, §6).
#[derive(Clone, Default)]
pub struct TopologyCallbacks {
    pub callbacks: PartialCallbacks,
}

/// Everything `Supervisor::start` needs beyond the configuration map: the
/// local node's own identity, the transport's default callback bindings, and
/// the optional ambient-lookup overrides shared by every topology (spec.md
/// §4.1, §4.5, §4.6, §4.8, §4.9).
pub struct StartOptions {
    pub local_node: Peer,
    pub defaults: Arc<dyn TransportDefaults>,
    pub callbacks: HashMap<String, TopologyCallbacks>,
    pub names_on: Option<NamesOnFn>,
    pub dns_resolver: Option<SharedAddressResolver>,
    pub srv_resolver: Option<SharedSrvResolver>,
}

impl StartOptions {
    pub fn new(local_node: Peer, defaults: Arc<dyn TransportDefaults>) -> Self {
        StartOptions {
            local_node,
            defaults,
            callbacks: HashMap::new(),
            names_on: None,
            dns_resolver: None,
            srv_resolver: None,
        }
    }
}

/// A running topology: its kind (for diagnostics) and the task supervising
/// its worker's restart loop (spec.md §4.1).
pub struct TopologyState {
    pub name: TopologyName,
    pub restart_policy: RestartPolicy,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

/// Owns the set of running topologies and their one-for-one supervision
/// (spec.md §4.1). Dropping a `Supervisor` does not stop its workers; call
/// [`Supervisor::stop`] for a graceful shutdown.
pub struct Supervisor {
    topologies: HashMap<TopologyName, TopologyState>,
}

impl Supervisor {
    /// Builds a `TopologyState` per configured topology and launches its
    /// supervised worker loop. Rejects the whole configuration up front if
    /// any topology resolves to no `list_connected` callback (spec.md §9
    /// open question) or if two topologies share a name.
    pub fn start(configurations: &ClusterConfig, options: StartOptions) -> Result<Supervisor> {
        let mut topologies = HashMap::new();

        for (name, spec) in &configurations.topologies {
            let topology = TopologyName::new(name.clone());
            if topologies.contains_key(&topology) {
                return Err(Error::DuplicateTopology(topology));
            }

            let partial = options
                .callbacks
                .get(name)
                .cloned()
                .unwrap_or_default()
                .callbacks
                .resolve(options.defaults.as_ref());

            let connect = partial.connect.ok_or_else(|| Error::MissingCallback {
                topology: topology.clone(),
                callback: MissingCallbackKind::Connect,
            })?;
            let disconnect = partial.disconnect.ok_or_else(|| Error::MissingCallback {
                topology: topology.clone(),
                callback: MissingCallbackKind::Disconnect,
            })?;
            let list_connected = partial.list_connected.ok_or_else(|| Error::MissingCallback {
                topology: topology.clone(),
                callback: MissingCallbackKind::ListConnected,
            })?;

            let callbacks = Callbacks {
                connect,
                disconnect,
                list_connected,
            };

            let kind: StrategyKind = spec.strategy.clone().into();
            let child_spec = kind.child_spec(&topology);

            let ctx = WorkerContext {
                topology: topology.clone(),
                callbacks,
                local_node: options.local_node.clone(),
                names_on: options.names_on.clone(),
                dns_resolver: options.dns_resolver.clone(),
                srv_resolver: options.srv_resolver.clone(),
            };

            let shutdown = Arc::new(Notify::new());
            let task = spawn_supervised(kind, ctx, child_spec.restart, shutdown.clone());

            topologies.insert(
                topology.clone(),
                TopologyState {
                    name: topology,
                    restart_policy: child_spec.restart,
                    shutdown,
                    task,
                },
            );
        }

        Ok(Supervisor { topologies })
    }

    /// Terminates every topology's worker and waits for each to release its
    /// owned resources before returning (spec.md §4.1, §5 "Cancellation").
    pub async fn stop(&mut self) {
        for state in self.topologies.values() {
            state.shutdown.notify_one();
        }
        for (_, state) in self.topologies.drain() {
            let _ = state.task.await;
        }
    }

    pub fn topology_names(&self) -> impl Iterator<Item = &TopologyName> {
        self.topologies.keys()
    }
}

/// The one-for-one restart loop for a single topology's worker (spec.md
/// §4.1, §7 "Propagation policy"). A crash always restarts after a short
/// delay; a clean finish restarts only if `restart` is `Permanent`; a
/// supervisor-requested shutdown always stops.
fn spawn_supervised(
    kind: StrategyKind,
    ctx: WorkerContext,
    restart: RestartPolicy,
    shutdown: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match kind.run(&ctx, shutdown.clone()).await {
                ExitReason::Shutdown => {
                    tracing::info!(topology = %ctx.topology, "worker stopped");
                    return;
                }
                ExitReason::Finished => {
                    tracing::debug!(topology = %ctx.topology, "worker finished");
                    if restart != RestartPolicy::Permanent {
                        return;
                    }
                }
                ExitReason::Crashed(err) => {
                    tracing::error!(topology = %ctx.topology, %err, "worker crashed, restarting");
                    tokio::time::sleep(CRASH_RESTART_DELAY).await;
                }
            }
        }
    })
}
