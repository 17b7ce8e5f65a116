// # DNS Provider Adapter Trait
//
// Defines the interface one vendor adapter implements so the engine can
// drive N different DNS APIs uniformly.
//
// ## Responsibility boundaries
//
// Adapters are thin, mechanical translators from {domain, IP, credentials}
// to vendor API calls. They must stay isolated and single-shot:
//
// - Perform HTTP calls to their vendor endpoint only
// - No retry or backoff logic (owned by the engine)
// - No caching or scheduling decisions (owned by the engine)
// - No knowledge of other adapters or of record state
//
// If a provider implemented its own retries, the engine could no longer
// bound the per-record deadline or guarantee at-most-one in-flight vendor
// call per record key.

use crate::config::IpVersion;
use async_trait::async_trait;
use std::net::IpAddr;

/// Vendor-specific DNS record update adapter
///
/// One implementation per vendor; the engine only ever holds the trait
/// object. Each adapter is bound to exactly one domain/owner/IP-version
/// triple and is validated completely at construction: malformed
/// credentials, a missing zone identifier or a zero TTL are
/// [`crate::Error::Config`] from the factory, never runtime errors.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Bring the remote record in line with `ip` and return the address the
    /// vendor confirmed as live.
    ///
    /// Contract:
    /// 1. Resolve the remote record for this domain and type. Not found is
    ///    signalled internally and answered with exactly one creation
    ///    attempt in this same call; if the creation response still carries
    ///    no record, [`crate::Error::NoResult`] surfaces and the attempt is
    ///    fatal for the cycle. More than one match surfaces
    ///    [`crate::Error::MultipleResults`] and is never auto-resolved.
    /// 2. If the record exists and already equals `ip`, return `ip` without
    ///    any mutating call.
    /// 3. Otherwise update in place (or create with the record type chosen
    ///    by the IP family) and return the new address.
    ///
    /// Transport, auth and rate-limit failures are opaque runtime errors,
    /// distinct from the two control-flow signals above.
    async fn update(&self, ip: IpAddr) -> Result<IpAddr, crate::Error>;

    /// Registered domain this adapter manages
    fn domain(&self) -> &str;

    /// Owner label within the domain ("@" for the apex)
    fn owner(&self) -> &str;

    /// Address family this adapter keeps up to date
    fn ip_version(&self) -> IpVersion;

    /// Provider name token (e.g. "cloudflare"), for logs and the status
    /// projection
    fn provider_name(&self) -> &'static str;

    /// Human-readable one-line summary of the managed record
    fn describe(&self) -> String {
        format!(
            "{} [owner: {}] via {} ({})",
            self.domain(),
            self.owner(),
            self.provider_name(),
            self.ip_version()
        )
    }
}

/// Constructs provider adapters from record configuration
///
/// Factories are registered with the [`crate::ProviderRegistry`] at startup.
/// A factory captures whatever shared resources its adapters need (notably
/// the shared HTTP client) and performs all configuration validation inside
/// `create`.
pub trait ProviderFactory: Send + Sync {
    /// Create an adapter for one configured record.
    ///
    /// All construction-time validation happens here; an `Err` means the
    /// record never becomes schedulable.
    fn create(
        &self,
        record: &crate::config::RecordConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
