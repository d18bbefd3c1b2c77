//! Tunable constants shared across strategies.
//!
//! Collected here the way `zebra_network::constants` collects its protocol
//! constants, so defaults documented in spec.md §6 live in one place instead
//! of being scattered as magic numbers through `strategy/`.

use std::time::Duration;

/// Default polling interval for every periodic strategy (spec.md §5, §6).
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(5000);

/// Per-request timeout for HTTP-based strategies (Kubernetes, Rancher,
/// Nomad) — spec.md §5.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Default Gossip UDP port (spec.md §6).
pub const GOSSIP_DEFAULT_PORT: u16 = 45892;

/// Default Gossip multicast group address (spec.md §6).
pub const GOSSIP_DEFAULT_MULTICAST_ADDR: std::net::Ipv4Addr = std::net::Ipv4Addr::new(233, 252, 1, 32);

/// Default Gossip multicast TTL (spec.md §6).
pub const GOSSIP_DEFAULT_MULTICAST_TTL: u32 = 1;

/// Lower bound of the stuttered heartbeat jitter window (spec.md §4.7).
pub const GOSSIP_HEARTBEAT_JITTER_MIN: Duration = Duration::from_millis(1);

/// Upper bound of the stuttered heartbeat jitter window (spec.md §4.7).
pub const GOSSIP_HEARTBEAT_JITTER_MAX: Duration = Duration::from_millis(5000);

/// Sentinel that prefixes every plaintext gossip packet, preserved
/// byte-exactly for wire compatibility with prior deployments (spec.md §9).
pub const GOSSIP_SENTINEL: &[u8] = b"heartbeat::";

/// Default headless-service cluster domain for DNS-SRV (spec.md §4.9).
pub const DEFAULT_SRV_CLUSTER_DOMAIN: &str = "cluster.local.";

/// Environment variable that overrides the computed cluster domain for both
/// the Kubernetes and DNS-SRV strategies (spec.md §6).
pub const CLUSTER_DOMAIN_ENV_VAR: &str = "CLUSTER_DOMAIN";

/// Default Kubernetes API host (spec.md §4.10).
pub const K8S_DEFAULT_MASTER: &str = "kubernetes.default.svc";

/// Default projected service-account directory (spec.md §4.10).
pub const K8S_DEFAULT_SERVICE_ACCOUNT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Default Kubernetes cluster name used to build the cluster-local suffix
/// (spec.md §4.10).
pub const K8S_DEFAULT_CLUSTER_NAME: &str = "cluster";

/// How many consecutive Gossip send failures accumulate before we fold a
/// burst of identical `warn!`s into one rate-limited line (SPEC_FULL.md
/// §11.4).
pub const GOSSIP_SEND_FAILURE_LOG_THRESHOLD: u32 = 3;
