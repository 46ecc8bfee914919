//! Trust-aware client address resolution.
//!
//! Behind a reverse proxy the TCP peer is the proxy, not the client. The
//! proxy reports the real client in a header, but a header is only as
//! trustworthy as whoever set it, so headers are believed only when the peer
//! itself is a trusted proxy.
//!
//! ```text
//! client ── 203.0.113.7 ──▶ nginx 10.0.0.2 ──▶ app
//!                          X-Forwarded-For: 203.0.113.7
//! ```
//!
//! The host server supplies the peer by inserting [`RemoteAddr`] into each
//! request's extensions.

use std::net::{IpAddr, SocketAddr};

use http::HeaderMap;
use ipnet::IpNet;
use serde::Deserialize;

/// TCP peer address of a request, inserted by the host server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

/// Which peers may vouch for the client address through headers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trust {
    /// Every peer is a trusted proxy.
    #[default]
    All,
    /// Only peers inside these networks (`10.0.0.0/8`, `10.0.0.2/32`).
    /// An empty list trusts nobody.
    Only(Vec<IpNet>),
}

impl Trust {
    fn contains(&self, ip: IpAddr) -> bool {
        match self {
            Self::All => true,
            Self::Only(nets) => nets.iter().any(|net| net.contains(&ip)),
        }
    }
}

/// How the `ip` field is resolved.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClientIpPolicy {
    /// Headers consulted in order when the peer is trusted.
    pub headers: Vec<String>,
    pub trusted_proxies: Trust,
}

impl Default for ClientIpPolicy {
    fn default() -> Self {
        Self {
            headers: vec!["X-Forwarded-For".to_owned(), "X-Real-IP".to_owned()],
            trusted_proxies: Trust::All,
        }
    }
}

impl ClientIpPolicy {
    /// Ignore every header and report the TCP peer.
    pub fn peer_only() -> Self {
        Self { headers: Vec::new(), trusted_proxies: Trust::Only(Vec::new()) }
    }

    pub fn trust(mut self, proxies: Trust) -> Self {
        self.trusted_proxies = proxies;
        self
    }

    pub fn resolve(&self, remote: Option<SocketAddr>, headers: &HeaderMap) -> Option<IpAddr> {
        let peer = remote?.ip();
        if !self.trusted_proxies.contains(peer) {
            return Some(peer);
        }

        self.headers
            .iter()
            .filter_map(|name| headers.get(name.as_str()))
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| self.from_chain(value))
            .or(Some(peer))
    }

    /// Walks a forwarding chain right to left and stops at the first hop that
    /// is not a trusted proxy. An unparsable hop poisons the whole header.
    fn from_chain(&self, value: &str) -> Option<IpAddr> {
        let hops: Vec<&str> = value.split(',').collect();
        for (i, hop) in hops.iter().enumerate().rev() {
            let ip: IpAddr = hop.trim().parse().ok()?;
            if i == 0 || !self.trusted_proxies.contains(ip) {
                return Some(ip);
            }
        }
        None
    }
}
