//! Gossip Strategy: multicast UDP peer discovery with optional symmetric
//! encryption (spec.md §4.7).

pub mod crypto;

use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::sync::Notify;

use crate::config::GossipConfig;
use crate::constants::{
    GOSSIP_HEARTBEAT_JITTER_MAX, GOSSIP_HEARTBEAT_JITTER_MIN, GOSSIP_SENTINEL,
    GOSSIP_SEND_FAILURE_LOG_THRESHOLD,
};
use crate::error::Error;
use crate::peer::Peer;
use crate::reconcile::{reconcile, Prune};
use crate::strategy::{ExitReason, WorkerContext};

#[derive(Serialize, Deserialize)]
struct HeartbeatRecord {
    node: String,
}

/// Builds a wire packet announcing `local_node`, encrypting it under `key`
/// if one is configured (spec.md §4.7 "Packet format").
fn build_packet(local_node: &Peer, key: Option<&[u8; 32]>) -> Vec<u8> {
    let record = HeartbeatRecord {
        node: local_node.as_str().to_string(),
    };
    let mut plaintext = GOSSIP_SENTINEL.to_vec();
    plaintext.extend_from_slice(&serde_json::to_vec(&record).expect("record always serializes"));

    match key {
        Some(key) => crypto::encrypt(key, &plaintext),
        None => plaintext,
    }
}

/// Parses a received packet, decrypting it first if `key` is configured.
/// Returns `None` for anything that fails to decrypt, fails to unpad, or
/// does not carry the `heartbeat::` sentinel (spec.md §4.7 "Failure
/// semantics").
fn parse_packet(data: &[u8], key: Option<&[u8; 32]>) -> Option<Peer> {
    let plaintext = match key {
        Some(key) => crypto::decrypt(key, data)?,
        None => data.to_vec(),
    };

    let rest = plaintext.strip_prefix(GOSSIP_SENTINEL)?;
    let record: HeartbeatRecord = serde_json::from_slice(rest).ok()?;
    record.node.parse().ok()
}

fn jittered_delay() -> Duration {
    rand::thread_rng().gen_range(GOSSIP_HEARTBEAT_JITTER_MIN..=GOSSIP_HEARTBEAT_JITTER_MAX)
}

fn target_addr(config: &GossipConfig) -> SocketAddr {
    if config.broadcast_only {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, config.port))
    } else {
        SocketAddr::V4(SocketAddrV4::new(config.multicast_addr, config.port))
    }
}

fn bind_socket(topology: &crate::peer::TopologyName, config: &GossipConfig) -> Result<UdpSocket, Error> {
    use socket2::{Domain, Protocol, Socket, Type};

    let bind_addr = SocketAddr::V4(SocketAddrV4::new(config.if_addr, config.port));
    let make = || -> std::io::Result<std::net::UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd", target_os = "netbsd", target_os = "openbsd", target_os = "dragonfly"))]
        socket.set_reuse_port(true)?;
        socket.bind(&bind_addr.into())?;

        if config.broadcast_only {
            socket.set_broadcast(true)?;
        } else {
            socket.set_multicast_ttl_v4(config.multicast_ttl)?;
            socket.set_multicast_loop_v4(true)?;
            let interface = config
                .multicast_if
                .as_ref()
                .and_then(|s| s.parse::<Ipv4Addr>().ok())
                .unwrap_or(Ipv4Addr::UNSPECIFIED);
            socket.join_multicast_v4(&config.multicast_addr, &interface)?;
        }

        socket.set_nonblocking(true)?;
        Ok(socket.into())
    };

    let std_socket = make().map_err(|source| Error::GossipBind {
        topology: topology.clone(),
        addr: bind_addr,
        source,
    })?;

    UdpSocket::from_std(std_socket).map_err(|source| Error::GossipBind {
        topology: topology.clone(),
        addr: bind_addr,
        source,
    })
}

/// Runs the Gossip worker's event loop: a jittered heartbeat timer, a
/// receive loop that reconciles newly-announced peers in, and a shutdown
/// signal, all serialized through a single `select!` (spec.md §5).
pub async fn run(config: &GossipConfig, ctx: &WorkerContext, shutdown: Arc<Notify>) -> ExitReason {
    let socket = match bind_socket(&ctx.topology, config) {
        Ok(socket) => socket,
        Err(err) => return ExitReason::Crashed(err),
    };

    let key = config.secret.as_deref().map(crypto::derive_key);
    let target = target_addr(config);
    let mut previous: HashSet<Peer> = HashSet::new();
    let mut consecutive_send_failures: u32 = 0;

    // "On start, schedule an immediate heartbeat" (spec.md §4.7).
    let mut heartbeat = Box::pin(tokio::time::sleep(Duration::from_secs(0)));
    let mut buf = vec![0u8; 2048];

    loop {
        tokio::select! {
            _ = shutdown.notified() => return ExitReason::Shutdown,
            _ = &mut heartbeat => {
                let packet = build_packet(&ctx.local_node, key.as_ref());
                match socket.send_to(&packet, target).await {
                    Ok(_) => consecutive_send_failures = 0,
                    Err(err) => {
                        consecutive_send_failures += 1;
                        if consecutive_send_failures == 1 || consecutive_send_failures % GOSSIP_SEND_FAILURE_LOG_THRESHOLD == 0 {
                            tracing::warn!(topology = %ctx.topology, %err, consecutive_send_failures, "gossip send failed");
                        }
                    }
                }
                heartbeat = Box::pin(tokio::time::sleep(jittered_delay()));
            }
            received = socket.recv_from(&mut buf) => {
                match received {
                    Ok((len, _from)) => {
                        if let Some(peer) = parse_packet(&buf[..len], key.as_ref()) {
                            if peer != ctx.local_node {
                                let mut desired = previous.clone();
                                desired.insert(peer);
                                previous = reconcile(
                                    &ctx.topology,
                                    &desired,
                                    &previous,
                                    &ctx.local_node,
                                    &ctx.callbacks,
                                    Prune::Disabled,
                                )
                                .await;
                            }
                        } else {
                            tracing::debug!(topology = %ctx.topology, "dropped unparseable gossip packet");
                        }
                    }
                    Err(err) => {
                        tracing::debug!(topology = %ctx.topology, %err, "gossip recv_from failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_packet_carries_sentinel_byte_exactly() {
        let peer = Peer::new("a", "1.1.1.1");
        let packet = build_packet(&peer, None);
        assert!(packet.starts_with(GOSSIP_SENTINEL));
    }

    #[test]
    fn parse_packet_roundtrips_plaintext() {
        let peer = Peer::new("a", "1.1.1.1");
        let packet = build_packet(&peer, None);
        assert_eq!(parse_packet(&packet, None), Some(peer));
    }

    #[test]
    fn parse_packet_roundtrips_encrypted() {
        let peer = Peer::new("a", "1.1.1.1");
        let key = crypto::derive_key("password");
        let packet = build_packet(&peer, Some(&key));
        assert_eq!(parse_packet(&packet, Some(&key)), Some(peer));
    }

    #[test]
    fn parse_packet_rejects_missing_sentinel() {
        assert_eq!(parse_packet(b"not-a-heartbeat", None), None);
    }

    #[test]
    fn parse_packet_rejects_tampered_ciphertext() {
        // spec.md §8 Scenario E.
        let peer = Peer::new("a", "1.1.1.1");
        let key = crypto::derive_key("password");
        let mut packet = build_packet(&peer, Some(&key));
        let last = packet.len() - 1;
        packet[last] ^= 0xFF;
        assert_eq!(parse_packet(&packet, Some(&key)), None);
    }

    #[test]
    fn parse_packet_with_wrong_key_is_dropped() {
        let peer = Peer::new("a", "1.1.1.1");
        let key = crypto::derive_key("password");
        let other_key = crypto::derive_key("wrong");
        let packet = build_packet(&peer, Some(&key));
        assert_eq!(parse_packet(&packet, Some(&other_key)), None);
    }

    #[test]
    fn target_addr_uses_multicast_by_default() {
        let config = GossipConfig::default();
        assert_eq!(
            target_addr(&config),
            SocketAddr::V4(SocketAddrV4::new(config.multicast_addr, config.port))
        );
    }

    #[test]
    fn target_addr_uses_broadcast_when_configured() {
        let config = GossipConfig {
            broadcast_only: true,
            ..GossipConfig::default()
        };
        assert_eq!(
            target_addr(&config),
            SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, config.port))
        );
    }

    #[test]
    fn jittered_delay_is_within_spec_window() {
        for _ in 0..100 {
            let delay = jittered_delay();
            assert!(delay >= GOSSIP_HEARTBEAT_JITTER_MIN);
            assert!(delay <= GOSSIP_HEARTBEAT_JITTER_MAX);
        }
    }
}
