//! Membership callbacks (spec.md §3, §6, §9 "Callbacks as values").
//!
//! Each callback is represented as a bound invocable value — a boxed closure
//! capturing whatever fixed prefix arguments the embedder's `(module,
//! function, fixed_args)` triple would have carried — rather than as a
//! dynamic-dispatch-by-name lookup. The core never inspects a callback's
//! internals; it only calls it and classifies the result.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::peer::Peer;

/// The classified result of a `connect`/`disconnect` invocation.
///
/// spec.md §3 describes the sentinel vocabulary as "true" / "false" /
/// "ignored", plus (for `disconnect` only) "any other value" meaning a
/// transport-specific failure to be retried. `Other` carries that case for
/// both callbacks uniformly; the [`reconcile`](crate::reconcile) algorithm
/// only reads it in the `disconnect` path, per spec.md §4.3.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// "true": connected, or disconnected, successfully.
    True,
    /// "false": the peer was unreachable (connect) or already not connected
    /// (disconnect).
    False,
    /// "ignored": the transport refused to consider the peer part of its
    /// network.
    Ignored,
    /// Any other returned value: a transport-specific error. Only
    /// meaningful for `disconnect`; spec.md §4.3 has no such case for
    /// `connect`.
    Other(String),
}

impl fmt::Display for CallbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackOutcome::True => f.write_str("true"),
            CallbackOutcome::False => f.write_str("false"),
            CallbackOutcome::Ignored => f.write_str("ignored"),
            CallbackOutcome::Other(s) => f.write_str(s),
        }
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// `connect(peer) -> CallbackOutcome`.
pub type ConnectFn = Arc<dyn Fn(Peer) -> BoxFuture<'static, CallbackOutcome> + Send + Sync>;

/// `disconnect(peer) -> CallbackOutcome`.
pub type DisconnectFn = Arc<dyn Fn(Peer) -> BoxFuture<'static, CallbackOutcome> + Send + Sync>;

/// `list_connected() -> HashSet<Peer>`.
pub type ListConnectedFn = Arc<dyn Fn() -> BoxFuture<'static, HashSet<Peer>> + Send + Sync>;

/// The triple of callbacks a topology reconciles against (spec.md §3).
#[derive(Clone)]
pub struct Callbacks {
    pub connect: ConnectFn,
    pub disconnect: DisconnectFn,
    pub list_connected: ListConnectedFn,
}

impl Callbacks {
    /// Builds a `Callbacks` from three async closures, matching spec.md §9's
    /// "callback as value" design note. Most callers use this rather than
    /// constructing the `Arc<dyn Fn...>` fields directly.
    pub fn new<C, CFut, D, DFut, L, LFut>(connect: C, disconnect: D, list_connected: L) -> Self
    where
        C: Fn(Peer) -> CFut + Send + Sync + 'static,
        CFut: Future<Output = CallbackOutcome> + Send + 'static,
        D: Fn(Peer) -> DFut + Send + Sync + 'static,
        DFut: Future<Output = CallbackOutcome> + Send + 'static,
        L: Fn() -> LFut + Send + Sync + 'static,
        LFut: Future<Output = HashSet<Peer>> + Send + 'static,
    {
        Callbacks {
            connect: Arc::new(move |peer| Box::pin(connect(peer))),
            disconnect: Arc::new(move |peer| Box::pin(disconnect(peer))),
            list_connected: Arc::new(move || Box::pin(list_connected())),
        }
    }
}

/// A possibly-partial set of callbacks, as read from configuration before
/// defaults are applied (spec.md §4.1, §9 open question).
#[derive(Clone, Default)]
pub struct PartialCallbacks {
    pub connect: Option<ConnectFn>,
    pub disconnect: Option<DisconnectFn>,
    pub list_connected: Option<ListConnectedFn>,
}

/// Supplies the built-in "connect by name" / "disconnect by name" / "list
/// currently connected names" primitives referenced by spec.md §4.1 as the
/// default callback bindings.
///
/// The embedding application implements this once, against its actual
/// node-to-node transport; `fleetdiscovery` never talks to that transport
/// directly.
pub trait TransportDefaults: Send + Sync {
    fn default_connect(&self) -> Option<ConnectFn> {
        None
    }
    fn default_disconnect(&self) -> Option<DisconnectFn> {
        None
    }
    fn default_list_connected(&self) -> Option<ListConnectedFn> {
        None
    }
}

/// A [`TransportDefaults`] that supplies no defaults at all, forcing every
/// topology to specify its own callbacks explicitly.
pub struct NoDefaults;

impl TransportDefaults for NoDefaults {}

impl PartialCallbacks {
    /// Fills in any missing callback with the supplied defaults. Returns
    /// `None` for a component that is still missing afterwards so the
    /// caller (`Supervisor::start`) can decide how to react; per spec.md §9
    /// a missing `list_connected` is a hard startup error rather than a
    /// silent fallback.
    pub fn resolve(self, defaults: &dyn TransportDefaults) -> PartialCallbacks {
        PartialCallbacks {
            connect: self.connect.or_else(|| defaults.default_connect()),
            disconnect: self.disconnect.or_else(|| defaults.default_disconnect()),
            list_connected: self
                .list_connected
                .or_else(|| defaults.default_list_connected()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn callbacks_new_invokes_closures() {
        let callbacks = Callbacks::new(
            |_peer| async { CallbackOutcome::True },
            |_peer| async { CallbackOutcome::False },
            || async { HashSet::new() },
        );
        assert_eq!(
            (callbacks.connect)(Peer::new("a", "1.1.1.1")).await,
            CallbackOutcome::True
        );
        assert_eq!(
            (callbacks.disconnect)(Peer::new("a", "1.1.1.1")).await,
            CallbackOutcome::False
        );
        assert!((callbacks.list_connected)().await.is_empty());
    }

    #[test]
    fn partial_callbacks_resolve_prefers_explicit_over_default() {
        struct AllDefaults;
        impl TransportDefaults for AllDefaults {
            fn default_list_connected(&self) -> Option<ListConnectedFn> {
                Some(Arc::new(|| Box::pin(async { HashSet::new() })))
            }
        }
        let partial = PartialCallbacks::default();
        let resolved = partial.resolve(&AllDefaults);
        assert!(resolved.list_connected.is_some());
        assert!(resolved.connect.is_none());
    }
}
