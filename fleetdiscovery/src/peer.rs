//! The [`Peer`] and [`TopologyName`] identifiers (spec.md §3).

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An opaque node identifier, typically `basename@host_or_ip`.
///
/// Equality is by value; a `Peer` is immutable once produced, mirroring the
/// `MetaAddr` convention of treating peer identity as a plain value type
/// rather than a handle into mutable state.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Peer(String);

impl Peer {
    /// Builds a peer from a basename and a host/IP/hostname component,
    /// joined with `@` (spec.md §3, §4.8, §4.10).
    pub fn new(basename: impl AsRef<str>, host: impl AsRef<str>) -> Self {
        Peer(format!("{}@{}", basename.as_ref(), host.as_ref()))
    }

    /// The full `basename@host` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the peer back into its `(basename, host)` halves, if it
    /// contains exactly one `@`.
    pub fn parts(&self) -> Option<(&str, &str)> {
        let mut iter = self.0.splitn(2, '@');
        let basename = iter.next()?;
        let host = iter.next()?;
        if host.contains('@') {
            return None;
        }
        Some((basename, host))
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Peer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Peer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Error returned when a string does not parse as `basename@host`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid peer `{0}`: expected exactly one `@`")]
pub struct ParsePeerError(String);

impl FromStr for Peer {
    type Err = ParsePeerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '@');
        let basename = parts.next().filter(|s| !s.is_empty());
        let host = parts.next().filter(|s| !s.is_empty() && !s.contains('@'));
        match (basename, host) {
            (Some(_), Some(_)) => Ok(Peer(s.to_string())),
            _ => Err(ParsePeerError(s.to_string())),
        }
    }
}

/// A short symbolic tag identifying one configured topology, used as a log
/// prefix and as the supervisor's per-worker child id. Unique within a
/// [`Supervisor`](crate::Supervisor).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopologyName(String);

impl TopologyName {
    pub fn new(name: impl Into<String>) -> Self {
        TopologyName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopologyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TopologyName {
    fn from(s: &str) -> Self {
        TopologyName::new(s)
    }
}

impl From<String> for TopologyName {
    fn from(s: String) -> Self {
        TopologyName::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_new_joins_with_at() {
        let peer = Peer::new("app", "10.0.0.1");
        assert_eq!(peer.as_str(), "app@10.0.0.1");
    }

    #[test]
    fn peer_parts_roundtrip() {
        let peer = Peer::new("app", "host.example.com");
        assert_eq!(peer.parts(), Some(("app", "host.example.com")));
    }

    #[test]
    fn peer_from_str_accepts_single_at() {
        let peer: Peer = "app@10.0.0.1".parse().unwrap();
        assert_eq!(peer, Peer::new("app", "10.0.0.1"));
    }

    #[test]
    fn peer_from_str_rejects_missing_at() {
        assert!("no-at-sign".parse::<Peer>().is_err());
    }

    #[test]
    fn peer_from_str_rejects_multiple_at() {
        assert!("a@b@c".parse::<Peer>().is_err());
    }

    #[test]
    fn peer_from_str_rejects_empty_halves() {
        assert!("@host".parse::<Peer>().is_err());
        assert!("app@".parse::<Peer>().is_err());
    }
}
