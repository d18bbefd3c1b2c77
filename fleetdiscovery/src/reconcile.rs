//! The shared reconciliation algorithm (spec.md §4.3).
//!
//! Every polling strategy reduces to "produce a desired set, hand it to
//! [`reconcile`]" (spec.md §9's "Reconciler factoring" design note). This
//! module is the one place that diffs desired membership against the
//! connected set and drives convergence through [`Callbacks`].

use std::collections::HashSet;

use crate::callbacks::{CallbackOutcome, Callbacks};
use crate::peer::{Peer, TopologyName};

/// Whether the `to_remove` step (spec.md §4.3 step 1) runs at all.
///
/// `DNS-A-Poll` with `prune=false` (spec.md §4.8) is the one strategy that
/// skips it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prune {
    Enabled,
    Disabled,
}

/// Diffs `desired` against `previous` and the callbacks' live connected set,
/// invoking `connect`/`disconnect` to converge, and returns the new
/// carry-forward set (spec.md §4.3, §8 property 1).
///
/// `local_node` is filtered out of every add so a strategy never instructs a
/// connect/disconnect for the local node (spec.md §3, §8 property 3).
pub async fn reconcile(
    topology: &TopologyName,
    desired: &HashSet<Peer>,
    previous: &HashSet<Peer>,
    local_node: &Peer,
    callbacks: &Callbacks,
    prune: Prune,
) -> HashSet<Peer> {
    let current = (callbacks.list_connected)().await;
    let mut carry_forward = previous.clone();

    if prune == Prune::Enabled {
        let to_remove: HashSet<&Peer> = previous.difference(desired).collect();
        for peer in to_remove {
            let outcome = (callbacks.disconnect)(peer.clone()).await;
            match outcome {
                CallbackOutcome::True => {
                    tracing::info!(%topology, %peer, "disconnected");
                    carry_forward.remove(peer);
                }
                CallbackOutcome::False | CallbackOutcome::Ignored => {
                    tracing::info!(%topology, %peer, outcome = %outcome, "peer already gone, dropping from membership");
                    carry_forward.remove(peer);
                }
                CallbackOutcome::Other(ref reason) => {
                    tracing::warn!(%topology, %peer, %reason, "disconnect failed, will retry next cycle");
                    metrics::increment_counter!("fleetdiscovery_disconnect_failed_total");
                }
            }
        }
    }

    let to_add: HashSet<&Peer> = desired
        .difference(&current)
        .filter(|peer| *peer != local_node)
        .collect();
    for peer in to_add {
        let outcome = (callbacks.connect)(peer.clone()).await;
        match outcome {
            CallbackOutcome::True => {
                tracing::info!(%topology, %peer, "connected");
                carry_forward.insert(peer.clone());
                metrics::increment_counter!("fleetdiscovery_connect_ok_total");
            }
            CallbackOutcome::False | CallbackOutcome::Ignored => {
                tracing::warn!(%topology, %peer, outcome = %outcome, "connect failed, will retry next cycle");
                carry_forward.remove(peer);
                metrics::increment_counter!("fleetdiscovery_connect_failed_total");
            }
            CallbackOutcome::Other(ref reason) => {
                // Not specified by spec.md §4.3 for connect; treat the same
                // as an unreachable peer so a future poll retries it.
                tracing::warn!(%topology, %peer, %reason, "connect returned an unexpected result, will retry next cycle");
                carry_forward.remove(peer);
                metrics::increment_counter!("fleetdiscovery_connect_failed_total");
            }
        }
    }

    carry_forward
}
