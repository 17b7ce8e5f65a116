// # IP Information Source Trait
//
// Defines the interface for one external source of the host's public IP
// address. The resolver owns fallback across an ordered list of sources;
// a source performs exactly one lookup per call and reports failure instead
// of retrying.

use async_trait::async_trait;
use std::net::IpAddr;

/// Address family requested from an IP information source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// True when `ip` belongs to this family
    pub fn matches(&self, ip: IpAddr) -> bool {
        match self {
            IpFamily::V4 => ip.is_ipv4(),
            IpFamily::V6 => ip.is_ipv6(),
        }
    }
}

impl std::fmt::Display for IpFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "ipv4"),
            IpFamily::V6 => write!(f, "ipv6"),
        }
    }
}

/// One external source of the host's public IP address
///
/// Implementations must be thread-safe and single-shot: one lookup per
/// `fetch` call, no internal retries, no caching. A response of the wrong
/// address family is an error (the resolver skips to the next source).
#[async_trait]
pub trait IpInfoSource: Send + Sync {
    /// Fetch the host's current public address for `family`
    async fn fetch(&self, family: IpFamily) -> Result<IpAddr, crate::Error>;

    /// Source name for logs (typically the service URL)
    fn name(&self) -> &str;
}
