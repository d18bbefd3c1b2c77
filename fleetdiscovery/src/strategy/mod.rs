//! The Strategy interface (spec.md §4.2) and its nine variants.
//!
//! Modeled as a closed set of variants rather than an open trait hierarchy
//! (spec.md §9 "Polymorphic Strategy" design note): [`StrategyKind`] is a
//! tagged union, and each variant's worker logic lives in its own submodule
//! behind a single `run` entry point.

pub mod dns_poll_a;
pub mod dns_poll_srv;
pub mod gossip;
pub mod hosts_file;
pub mod kubernetes;
pub mod local_discovery;
pub mod nomad;
pub mod rancher;
pub mod static_hosts;

use std::sync::Arc;

use tokio::sync::Notify;

use crate::callbacks::Callbacks;
use crate::config::StrategyConfig;
use crate::dns::{SharedAddressResolver, SharedSrvResolver};
use crate::peer::{Peer, TopologyName};
use crate::registry::NamesOnFn;

/// Supervisor restart policy for a topology's worker (spec.md §4.2, §4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Restart the worker whether it exits cleanly or crashes.
    Permanent,
    /// Restart the worker only if it crashes; a clean exit (a one-shot
    /// strategy finishing its single reconcile) is left stopped.
    Transient,
}

/// Identity and restart policy handed to the supervisor (spec.md §4.2).
#[derive(Clone, Debug)]
pub struct ChildSpec {
    pub id: TopologyName,
    pub restart: RestartPolicy,
}

/// Immutable context a strategy needs to run: its name (for logging), the
/// caller's callbacks, and the local node's own identity so it is always
/// filtered out of the desired set (spec.md §3).
#[derive(Clone)]
pub struct WorkerContext {
    pub topology: TopologyName,
    pub callbacks: Callbacks,
    pub local_node: Peer,
    /// Looks up the names the ambient node registry knows about on a given
    /// host, used by `LocalDiscovery` (spec.md §4.5) and `HostsFile`
    /// (spec.md §4.6). `None` means the embedder did not wire one up; those
    /// two strategies then log and treat it as "no names found".
    pub names_on: Option<NamesOnFn>,
    /// `resolver` override for `DnsPollA` (spec.md §4.8). `None` builds a
    /// `SystemResolver` from the host's resolver configuration.
    pub dns_resolver: Option<SharedAddressResolver>,
    /// `resolver` override for `DnsPollSrv` (spec.md §4.9).
    pub srv_resolver: Option<SharedSrvResolver>,
}

/// Why a worker's `run` returned, used by the supervisor to decide whether
/// to relaunch it (spec.md §4.1, §7 "Propagation policy").
pub enum ExitReason {
    /// The supervisor asked the worker to stop and it did.
    Shutdown,
    /// A one-shot strategy finished its single reconcile (spec.md §4.4-§4.6).
    Finished,
    /// An unrecoverable resource-acquisition failure (spec.md §7): cannot
    /// bind a socket, cannot build an HTTP client. Everything else (DNS
    /// errors, non-200 responses, decrypt failures, "false"/"ignored"
    /// callback returns) is handled inside the strategy and never reaches
    /// here.
    Crashed(crate::error::Error),
}

/// The nine discovery mechanisms of spec.md §4.4-§4.11, as a closed tagged
/// union rather than trait objects.
#[derive(Clone, Debug)]
pub enum StrategyKind {
    Static(crate::config::StaticConfig),
    LocalDiscovery(crate::config::LocalDiscoveryConfig),
    HostsFile(crate::config::HostsFileConfig),
    Gossip(crate::config::GossipConfig),
    DnsPollA(crate::config::DnsPollAConfig),
    DnsPollSrv(crate::config::DnsPollSrvConfig),
    KubernetesApi(crate::config::KubernetesConfig),
    Rancher(crate::config::RancherConfig),
    Nomad(crate::config::NomadConfig),
}

impl From<StrategyConfig> for StrategyKind {
    fn from(config: StrategyConfig) -> Self {
        match config {
            StrategyConfig::Static(c) => StrategyKind::Static(c),
            StrategyConfig::LocalDiscovery(c) => StrategyKind::LocalDiscovery(c),
            StrategyConfig::HostsFile(c) => StrategyKind::HostsFile(c),
            StrategyConfig::Gossip(c) => StrategyKind::Gossip(c),
            StrategyConfig::DnsPollA(c) => StrategyKind::DnsPollA(c),
            StrategyConfig::DnsPollSrv(c) => StrategyKind::DnsPollSrv(c),
            StrategyConfig::KubernetesApi(c) => StrategyKind::KubernetesApi(c),
            StrategyConfig::Rancher(c) => StrategyKind::Rancher(c),
            StrategyConfig::Nomad(c) => StrategyKind::Nomad(c),
        }
    }
}

impl StrategyKind {
    /// spec.md §4.2: "Default restart policy is 'permanent' ... unless the
    /// strategy overrides". The pure one-shots override to `Transient`
    /// (SPEC_FULL.md §11.1) so a clean finish is not busy-looped forever;
    /// giving them a `timeout` turns them back into periodic workers, which
    /// keep the default.
    pub fn restart_policy(&self) -> RestartPolicy {
        match self {
            StrategyKind::Static(cfg) if cfg.timeout().is_none() => RestartPolicy::Transient,
            StrategyKind::LocalDiscovery(_) => RestartPolicy::Transient,
            StrategyKind::HostsFile(cfg) if cfg.timeout().is_none() => RestartPolicy::Transient,
            _ => RestartPolicy::Permanent,
        }
    }

    pub fn child_spec(&self, topology: &TopologyName) -> ChildSpec {
        ChildSpec {
            id: topology.clone(),
            restart: self.restart_policy(),
        }
    }

    /// Runs this strategy's worker loop until it finishes, crashes, or is
    /// asked to shut down. Each call starts from fresh internal state
    /// (empty `MembershipSet`, new socket/client), matching spec.md §3's
    /// "`meta` ... created by the Worker's initializer".
    pub async fn run(&self, ctx: &WorkerContext, shutdown: Arc<Notify>) -> ExitReason {
        match self {
            StrategyKind::Static(cfg) => static_hosts::run(cfg, ctx, shutdown).await,
            StrategyKind::LocalDiscovery(cfg) => local_discovery::run(cfg, ctx).await,
            StrategyKind::HostsFile(cfg) => hosts_file::run(cfg, ctx, shutdown).await,
            StrategyKind::Gossip(cfg) => gossip::run(cfg, ctx, shutdown).await,
            StrategyKind::DnsPollA(cfg) => dns_poll_a::run(cfg, ctx, shutdown).await,
            StrategyKind::DnsPollSrv(cfg) => dns_poll_srv::run(cfg, ctx, shutdown).await,
            StrategyKind::KubernetesApi(cfg) => kubernetes::run(cfg, ctx, shutdown).await,
            StrategyKind::Rancher(cfg) => rancher::run(cfg, ctx, shutdown).await,
            StrategyKind::Nomad(cfg) => nomad::run(cfg, ctx, shutdown).await,
        }
    }
}
