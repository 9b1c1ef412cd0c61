//! Per-request diagnostics returned by every client call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// How a response was served with respect to the client cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheHitStatus {
    /// A fresh entry was served without a network round trip.
    Hit,
    /// An entry existed but had outlived its TTL; it was refetched.
    Expired,
    /// No entry existed (or caching was off); the response is live.
    Miss,
    /// Unknown status.
    #[serde(rename = "")]
    Invalid,
}

impl CacheHitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Expired => "expired",
            Self::Miss => "miss",
            Self::Invalid => "",
        }
    }

    /// Case-insensitive parse; anything unrecognised is `Invalid`.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "hit" => Self::Hit,
            "expired" => Self::Expired,
            "miss" => Self::Miss,
            _ => Self::Invalid,
        }
    }
}

impl fmt::Display for CacheHitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache status and resolved remote address of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReqInf {
    pub cache_hit_status: CacheHitStatus,
    pub remote_addr: Option<SocketAddr>,
}

impl ReqInf {
    /// Info for a live, uncached request.
    pub fn live(remote_addr: Option<SocketAddr>) -> Self {
        Self {
            cache_hit_status: CacheHitStatus::Miss,
            remote_addr,
        }
    }
}
