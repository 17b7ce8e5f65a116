//! Configuration types for the dynsync system
//!
//! This module defines all configuration structures used throughout the
//! crate. Every type validates itself; all validation failures are
//! [`crate::Error::Config`] and reject the offending record before the
//! engine ever sees it.

use serde::{Deserialize, Serialize};

/// Top-level settings: the managed records plus engine and resolver tuning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// DNS records to manage
    pub records: Vec<RecordConfig>,

    /// Engine scheduling settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Public IP resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl Settings {
    /// Validate the full configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.records.is_empty() {
            return Err(crate::Error::config("no records configured"));
        }
        for record in &self.records {
            record.validate()?;
        }
        self.engine.validate()?;
        self.resolver.validate()?;
        Ok(())
    }
}

/// One managed record: a domain/owner/IP-version triple bound to a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Registered domain (e.g. "example.com")
    pub domain: String,

    /// Owner label within the domain; "@" means the apex
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Provider name token, resolved through the registry
    pub provider: String,

    /// Which address family to keep up to date
    #[serde(default)]
    pub ip_version: IpVersion,

    /// Provider-specific settings, decoded by the adapter at construction
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl RecordConfig {
    /// Validate the record-level fields (provider settings are validated by
    /// the adapter's own constructor)
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_domain_name(&self.domain)?;
        if self.owner.is_empty() {
            return Err(crate::Error::config(format!(
                "record {}: owner cannot be empty (use \"@\" for the apex)",
                self.domain
            )));
        }
        if self.provider.is_empty() {
            return Err(crate::Error::config(format!(
                "record {}: provider cannot be empty",
                self.domain
            )));
        }
        Ok(())
    }

    /// Fully qualified record name: `owner.domain`, or the bare domain for
    /// the apex owner "@"
    pub fn fqdn(&self) -> String {
        build_fqdn(&self.owner, &self.domain)
    }
}

fn default_owner() -> String {
    "@".to_string()
}

/// Build the fully qualified name managed by a record
pub fn build_fqdn(owner: &str, domain: &str) -> String {
    if owner == "@" {
        domain.to_string()
    } else {
        format!("{}.{}", owner, domain)
    }
}

/// Which address family a record tracks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// IPv4 only (A record)
    #[default]
    #[serde(rename = "ipv4")]
    V4,
    /// IPv6 only (AAAA record)
    #[serde(rename = "ipv6")]
    V6,
    /// IPv4 preferred, IPv6 accepted
    #[serde(rename = "dual")]
    Dual,
}

impl std::fmt::Display for IpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpVersion::V4 => write!(f, "ipv4"),
            IpVersion::V6 => write!(f, "ipv6"),
            IpVersion::Dual => write!(f, "ipv4 or ipv6"),
        }
    }
}

/// Engine scheduling configuration
///
/// The staleness re-check interval and worker pool size are deliberately
/// operator-configured rather than hardcoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between scheduled update cycles
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// A record whose last attempt is older than this is re-checked even
    /// when the public IP has not changed (recovers from earlier failures
    /// and provider-side resets)
    #[serde(default = "default_recheck_interval_secs")]
    pub recheck_interval_secs: u64,

    /// Maximum number of concurrent in-flight provider calls per cycle
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Deadline for a single provider update call, in seconds
    #[serde(default = "default_update_timeout_secs")]
    pub update_timeout_secs: u64,

    /// Capacity of the engine event channel; events are dropped (with a
    /// warning log) when full
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.tick_interval_secs == 0 {
            return Err(crate::Error::config("tick_interval_secs must be > 0"));
        }
        if self.worker_pool_size == 0 {
            return Err(crate::Error::config("worker_pool_size must be > 0"));
        }
        if self.update_timeout_secs == 0 {
            return Err(crate::Error::config("update_timeout_secs must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            recheck_interval_secs: default_recheck_interval_secs(),
            worker_pool_size: default_worker_pool_size(),
            update_timeout_secs: default_update_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_tick_interval_secs() -> u64 {
    300
}

fn default_recheck_interval_secs() -> u64 {
    3600
}

fn default_worker_pool_size() -> usize {
    8
}

fn default_update_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1000
}

/// Public IP resolver configuration: ordered source URLs per family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// IPv4 information sources, tried in order
    #[serde(default = "default_ipv4_sources")]
    pub ipv4_sources: Vec<String>,

    /// IPv6 information sources, tried in order
    #[serde(default = "default_ipv6_sources")]
    pub ipv6_sources: Vec<String>,

    /// Per-source fetch deadline, in seconds
    #[serde(default = "default_resolver_timeout_secs")]
    pub timeout_secs: u64,
}

impl ResolverConfig {
    /// Validate the resolver settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ipv4_sources.is_empty() && self.ipv6_sources.is_empty() {
            return Err(crate::Error::config(
                "at least one IP information source must be configured",
            ));
        }
        for url in self.ipv4_sources.iter().chain(&self.ipv6_sources) {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "IP source URL must use http or https: {}",
                    url
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("resolver timeout_secs must be > 0"));
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ipv4_sources: default_ipv4_sources(),
            ipv6_sources: default_ipv6_sources(),
            timeout_secs: default_resolver_timeout_secs(),
        }
    }
}

fn default_ipv4_sources() -> Vec<String> {
    vec![
        "https://api.ipify.org".to_string(),
        "https://ipv4.icanhazip.com".to_string(),
        "https://ifconfig.me/ip".to_string(),
    ]
}

fn default_ipv6_sources() -> Vec<String> {
    vec![
        "https://api6.ipify.org".to_string(),
        "https://ipv6.icanhazip.com".to_string(),
    ]
}

fn default_resolver_timeout_secs() -> u64 {
    10
}

/// Validate a domain name per RFC 1035 label rules.
///
/// Not comprehensive, but catches the common operator mistakes before a
/// record is registered.
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    if domain.is_empty() {
        return Err(crate::Error::config("domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "domain name too long: {} chars (max 253)",
            domain.len()
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "domain label too long: {} chars (max 63) in '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "domain label contains invalid characters: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "domain label cannot start or end with hyphen: '{}'",
                label
            )));
        }
    }

    Ok(())
}
