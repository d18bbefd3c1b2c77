//! Crate-wide error type.
//!
//! Only failures that must propagate to the [`Supervisor`](crate::Supervisor)
//! as a worker crash live here. Everything else spec.md classifies as a
//! transient, per-tick failure (DNS error, non-200 response, decryption
//! failure, a "false"/"ignored" callback return) is handled inside the
//! strategy that produced it and never reaches this type.

use crate::peer::TopologyName;

/// Errors that cause a worker to crash (and the supervisor to restart it)
/// or that abort startup outright.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A topology's configuration is missing one of the three callbacks
    /// `reconcile` needs (`connect`, `disconnect`, `list_connected`) and no
    /// default was supplied by the embedding application. Per spec.md §9
    /// this is rejected at startup rather than silently papered over.
    #[error("topology `{topology}` has no {callback} callback and no default was configured")]
    MissingCallback {
        topology: TopologyName,
        callback: MissingCallbackKind,
    },

    /// Two topologies were configured under the same name.
    #[error("duplicate topology name `{0}`")]
    DuplicateTopology(TopologyName),

    /// The Gossip strategy could not bind its UDP socket.
    #[error("gossip topology `{topology}` failed to bind {addr}: {source}")]
    GossipBind {
        topology: TopologyName,
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A strategy could not build the HTTP client it needs (Kubernetes,
    /// Rancher, Nomad).
    #[error("topology `{topology}` failed to build an HTTP client: {source}")]
    HttpClientBuild {
        topology: TopologyName,
        #[source]
        source: reqwest::Error,
    },

    /// The DNS-A or DNS-SRV strategy could not build a resolver from the
    /// host's system configuration.
    #[error("topology `{topology}` failed to build a DNS resolver: {reason}")]
    DnsResolverBuild {
        topology: TopologyName,
        reason: String,
    },
}

/// Which of the three `reconcile` callbacks was missing when a topology
/// failed startup validation (see [`Error::MissingCallback`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingCallbackKind {
    Connect,
    Disconnect,
    ListConnected,
}

impl std::fmt::Display for MissingCallbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MissingCallbackKind::Connect => "connect",
            MissingCallbackKind::Disconnect => "disconnect",
            MissingCallbackKind::ListConnected => "list_connected",
        };
        f.write_str(name)
    }
}

/// Crate-local result alias, mirroring `zebra-chain`'s `Result<T>` over its
/// own error enum.
pub type Result<T> = std::result::Result<T, Error>;
