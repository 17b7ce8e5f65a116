//! Public IP resolver with ordered multi-source fallback
//!
//! The resolver holds one ordered source list per address family. A failing
//! source (timeout, transport error, malformed response, wrong family) is
//! logged and skipped; resolution fails only when every source for the
//! requested family has failed. No caching happens here: the engine owns
//! the comparison against each record's last-known address and shares one
//! resolution per family within a cycle.

use crate::error::{Error, Result};
use crate::traits::{IpFamily, IpInfoSource};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// Multi-source public IP resolver
pub struct PublicIpResolver {
    v4_sources: Vec<Box<dyn IpInfoSource>>,
    v6_sources: Vec<Box<dyn IpInfoSource>>,
    timeout: Duration,
}

impl PublicIpResolver {
    /// Create a resolver from per-family source lists and a per-call
    /// deadline
    pub fn new(
        v4_sources: Vec<Box<dyn IpInfoSource>>,
        v6_sources: Vec<Box<dyn IpInfoSource>>,
        timeout: Duration,
    ) -> Self {
        Self {
            v4_sources,
            v6_sources,
            timeout,
        }
    }

    /// Whether any source is configured for `family`
    pub fn supports(&self, family: IpFamily) -> bool {
        !self.sources(family).is_empty()
    }

    fn sources(&self, family: IpFamily) -> &[Box<dyn IpInfoSource>] {
        match family {
            IpFamily::V4 => &self.v4_sources,
            IpFamily::V6 => &self.v6_sources,
        }
    }

    /// Resolve the host's current public address for `family`.
    ///
    /// Sources are tried in configured order; each attempt is bounded by
    /// the per-call deadline. Returns the first address of the right
    /// family, or [`Error::Resolver`] when every source failed.
    pub async fn resolve(&self, family: IpFamily) -> Result<IpAddr> {
        let sources = self.sources(family);
        if sources.is_empty() {
            return Err(Error::resolver(format!(
                "no {} information sources configured",
                family
            )));
        }

        for source in sources {
            match tokio::time::timeout(self.timeout, source.fetch(family)).await {
                Ok(Ok(ip)) if family.matches(ip) => {
                    debug!(source = source.name(), %ip, "public {} resolved", family);
                    return Ok(ip);
                }
                Ok(Ok(ip)) => {
                    warn!(
                        source = source.name(),
                        %ip,
                        "source answered with the wrong address family, skipping"
                    );
                }
                Ok(Err(err)) => {
                    warn!(source = source.name(), error = %err, "IP source failed, skipping");
                }
                Err(_) => {
                    warn!(
                        source = source.name(),
                        timeout = ?self.timeout,
                        "IP source timed out, skipping"
                    );
                }
            }
        }

        Err(Error::resolver(format!(
            "all {} sources failed for {}",
            sources.len(),
            family
        )))
    }
}
