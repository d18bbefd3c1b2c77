//! The local name registry lookup used by LocalDiscovery (spec.md §4.5) and
//! HostsFile (spec.md §4.6).
//!
//! Both strategies ask "what names does the ambient node registry know about
//! on this host" (the EPMD-style lookup spec.md §1 calls out as local-only
//! discovery). Like the [`Callbacks`](crate::callbacks::Callbacks) triple,
//! this is an opaque, caller-supplied primitive: `fleetdiscovery` never talks
//! to a concrete name-registration daemon itself.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// `names_on(host) -> [basename]`: the set of registered node basenames the
/// local name registry knows about on `host` (`host` is the local hostname
/// for LocalDiscovery, or a line from the hosts file for HostsFile).
pub type NamesOnFn = Arc<dyn Fn(String) -> BoxFuture<'static, Vec<String>> + Send + Sync>;

/// Builds a [`NamesOnFn`] from a plain async closure.
pub fn names_on<F, Fut>(f: F) -> NamesOnFn
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Vec<String>> + Send + 'static,
{
    Arc::new(move |host| Box::pin(f(host)))
}
