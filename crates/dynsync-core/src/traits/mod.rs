//! Core trait definitions
//!
//! These traits define the seams of the dynsync system:
//! - [`DnsProvider`]: vendor-specific record update adapters
//! - [`IpInfoSource`]: external public-IP information sources

pub mod ip_source;
pub mod provider;

pub use ip_source::{IpFamily, IpInfoSource};
pub use provider::{DnsProvider, ProviderFactory};
