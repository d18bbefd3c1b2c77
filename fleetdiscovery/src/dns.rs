//! DNS resolution abstractions shared by the DNS-A and DNS-SRV strategies
//! (spec.md §4.8, §4.9).
//!
//! Both strategies accept a `resolver` override "for testability" (spec.md
//! §6); that override is one of these two traits, so tests can script
//! resolver responses without touching the network.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use trust_dns_resolver::TokioAsyncResolver;

/// Resolves A/AAAA records for a name (spec.md §4.8).
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn lookup_ip(&self, name: &str) -> Result<Vec<IpAddr>, String>;
}

/// Resolves SRV records for a name, returning each target's hostname
/// (spec.md §4.9).
#[async_trait]
pub trait SrvResolver: Send + Sync {
    async fn lookup_srv(&self, name: &str) -> Result<Vec<String>, String>;
}

/// The production resolver, backed by `trust-dns-resolver`'s system
/// configuration (`/etc/resolv.conf` on Unix).
pub struct SystemResolver {
    inner: TokioAsyncResolver,
}

impl SystemResolver {
    pub fn from_system_conf() -> Result<Self, String> {
        let inner = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|err| format!("failed to read system resolver configuration: {err}"))?;
        Ok(SystemResolver { inner })
    }
}

#[async_trait]
impl AddressResolver for SystemResolver {
    async fn lookup_ip(&self, name: &str) -> Result<Vec<IpAddr>, String> {
        self.inner
            .lookup_ip(name)
            .await
            .map(|lookup| lookup.iter().collect())
            .map_err(|err| err.to_string())
    }
}

#[async_trait]
impl SrvResolver for SystemResolver {
    async fn lookup_srv(&self, name: &str) -> Result<Vec<String>, String> {
        self.inner
            .srv_lookup(name)
            .await
            .map(|lookup| {
                lookup
                    .iter()
                    .map(|srv| srv.target().to_utf8())
                    .collect()
            })
            .map_err(|err| err.to_string())
    }
}

pub type SharedAddressResolver = Arc<dyn AddressResolver>;
pub type SharedSrvResolver = Arc<dyn SrvResolver>;
