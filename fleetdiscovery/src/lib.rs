//! Automatic peer discovery and membership maintenance for a cluster of
//! application nodes.
//!
//! A [`Supervisor`] owns one supervised worker task per configured
//! [`TopologyName`], each bound to a [`StrategyKind`]. Workers periodically
//! (or once, for one-shot strategies) compute the set of peers the local
//! node should be connected to and hand it to [`reconcile`], which diffs it
//! against the currently-connected set and drives convergence through the
//! caller-supplied [`Callbacks`].
//!
//! This crate does not implement a transport: `connect`/`disconnect` are
//! opaque callbacks (see [`callbacks`]) bound by the embedding application to
//! whatever node-to-node connection mechanism it uses.

#![forbid(unsafe_code)]

pub mod callbacks;
pub mod config;
pub mod constants;
pub mod dns;
pub mod error;
pub mod peer;
pub mod reconcile;
pub mod registry;
pub mod strategy;
pub mod supervisor;

pub use callbacks::{CallbackOutcome, Callbacks, TransportDefaults};
pub use config::{ClusterConfig, TopologySpec};
pub use error::{Error, Result};
pub use peer::{Peer, TopologyName};
pub use reconcile::reconcile;
pub use strategy::StrategyKind;
pub use supervisor::{StartOptions, Supervisor, TopologyCallbacks, TopologyState};
