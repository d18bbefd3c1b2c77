//! Typed configuration (spec.md §6).
//!
//! File loading itself stays out of scope (spec.md §1): these types are
//! plain `serde` structures the embedding application deserializes from
//! whatever format (TOML, JSON, YAML) it already uses for its own config.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::peer::{Peer, TopologyName};

/// The flat mapping `{topology name -> topology spec}` (spec.md §2, §6).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(flatten)]
    pub topologies: HashMap<String, TopologySpec>,
}

impl ClusterConfig {
    pub fn topology_names(&self) -> impl Iterator<Item = &str> {
        self.topologies.keys().map(String::as_str)
    }
}

/// One topology's configuration: which strategy it runs and that
/// strategy's options (spec.md §6). The three callback fields are
/// deliberately absent here — callbacks are closures, not serializable data
/// (spec.md §9 "Callbacks as values"); an embedder pairs a `TopologySpec`
/// with a [`crate::callbacks::PartialCallbacks`] built in code.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopologySpec {
    #[serde(flatten)]
    pub strategy: StrategyConfig,
}

fn default_polling_interval_ms() -> u64 {
    crate::constants::DEFAULT_POLLING_INTERVAL.as_millis() as u64
}

fn duration_from_ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Per-strategy configuration (spec.md §4.4-§4.11, §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "config", rename_all = "snake_case")]
pub enum StrategyConfig {
    Static(StaticConfig),
    LocalDiscovery(LocalDiscoveryConfig),
    HostsFile(HostsFileConfig),
    Gossip(GossipConfig),
    DnsPollA(DnsPollAConfig),
    DnsPollSrv(DnsPollSrvConfig),
    KubernetesApi(KubernetesConfig),
    Rancher(RancherConfig),
    Nomad(NomadConfig),
}

/// spec.md §4.4, §6.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StaticConfig {
    #[serde(default)]
    pub hosts: Vec<Peer>,
    /// `None` means the one-shot behavior of spec.md §4.4; `Some(ms)` turns
    /// it into a periodic worker that re-reconciles every `ms` milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl StaticConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(duration_from_ms)
    }
}

/// spec.md §4.5. Has no options of its own: it derives the local host
/// suffix from the local node name handed to the strategy at start.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LocalDiscoveryConfig {}

/// spec.md §4.6.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostsFileConfig {
    pub path: std::path::PathBuf,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl HostsFileConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(duration_from_ms)
    }
}

fn default_gossip_port() -> u16 {
    crate::constants::GOSSIP_DEFAULT_PORT
}

fn default_if_addr() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

fn default_multicast_addr() -> Ipv4Addr {
    crate::constants::GOSSIP_DEFAULT_MULTICAST_ADDR
}

fn default_multicast_ttl() -> u32 {
    crate::constants::GOSSIP_DEFAULT_MULTICAST_TTL
}

/// spec.md §4.7, §6.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GossipConfig {
    #[serde(default = "default_gossip_port")]
    pub port: u16,
    #[serde(default = "default_if_addr")]
    pub if_addr: Ipv4Addr,
    #[serde(default = "default_multicast_addr")]
    pub multicast_addr: Ipv4Addr,
    #[serde(default = "default_multicast_ttl")]
    pub multicast_ttl: u32,
    #[serde(default)]
    pub multicast_if: Option<String>,
    #[serde(default)]
    pub broadcast_only: bool,
    #[serde(default)]
    pub secret: Option<String>,
}

impl Default for GossipConfig {
    fn default() -> Self {
        GossipConfig {
            port: default_gossip_port(),
            if_addr: default_if_addr(),
            multicast_addr: default_multicast_addr(),
            multicast_ttl: default_multicast_ttl(),
            multicast_if: None,
            broadcast_only: false,
            secret: None,
        }
    }
}

/// spec.md §4.8, §6.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DnsPollAConfig {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub node_basename: Option<String>,
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    #[serde(default = "default_true")]
    pub prune: bool,
}

fn default_true() -> bool {
    true
}

impl DnsPollAConfig {
    pub fn polling_interval(&self) -> Duration {
        duration_from_ms(self.polling_interval_ms)
    }
}

/// spec.md §4.9, §6.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DnsPollSrvConfig {
    pub service: String,
    pub namespace: String,
    pub application_name: String,
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
}

impl DnsPollSrvConfig {
    pub fn polling_interval(&self) -> Duration {
        duration_from_ms(self.polling_interval_ms)
    }
}

fn default_k8s_master() -> String {
    crate::constants::K8S_DEFAULT_MASTER.to_string()
}

fn default_k8s_sa_path() -> std::path::PathBuf {
    std::path::PathBuf::from(crate::constants::K8S_DEFAULT_SERVICE_ACCOUNT_PATH)
}

fn default_k8s_cluster_name() -> String {
    crate::constants::K8S_DEFAULT_CLUSTER_NAME.to_string()
}

/// `kubernetes_ip_lookup_mode` (spec.md §4.10).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpLookupMode {
    Endpoints,
    Pods,
}

impl Default for IpLookupMode {
    fn default() -> Self {
        IpLookupMode::Endpoints
    }
}

/// `mode` (spec.md §4.10): how a discovered `(ip, namespace, hostname)`
/// triple becomes a [`Peer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerNameMode {
    Ip,
    Hostname,
    Dns,
}

impl Default for PeerNameMode {
    fn default() -> Self {
        PeerNameMode::Ip
    }
}

/// spec.md §4.10, §6.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KubernetesConfig {
    #[serde(default)]
    pub kubernetes_node_basename: Option<String>,
    #[serde(default)]
    pub kubernetes_selector: Option<String>,
    #[serde(default)]
    pub kubernetes_namespace: Option<String>,
    #[serde(default = "default_k8s_master")]
    pub kubernetes_master: String,
    #[serde(default)]
    pub kubernetes_service_name: Option<String>,
    #[serde(default = "default_k8s_sa_path")]
    pub kubernetes_service_account_path: std::path::PathBuf,
    #[serde(default)]
    pub kubernetes_ip_lookup_mode: IpLookupMode,
    #[serde(default)]
    pub kubernetes_use_cached_resources: bool,
    #[serde(default = "default_k8s_cluster_name")]
    pub kubernetes_cluster_name: String,
    #[serde(default)]
    pub mode: PeerNameMode,
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
}

impl KubernetesConfig {
    pub fn polling_interval(&self) -> Duration {
        duration_from_ms(self.polling_interval_ms)
    }
}

/// spec.md §4.11.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RancherConfig {
    pub node_basename: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub stacks: Vec<String>,
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
}

impl RancherConfig {
    pub fn polling_interval(&self) -> Duration {
        duration_from_ms(self.polling_interval_ms)
    }
}

/// spec.md §4.11.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NomadConfig {
    pub node_basename: String,
    pub nomad_server_url: String,
    pub service_name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
}

impl NomadConfig {
    pub fn polling_interval(&self) -> Duration {
        duration_from_ms(self.polling_interval_ms)
    }
}
