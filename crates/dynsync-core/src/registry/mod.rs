//! Provider factory registry
//!
//! Maps provider names from configuration to injected adapter factories.
//! The daemon registers the factories it was built with at startup; nothing
//! here reaches for ambient global state. Unknown provider names fail fast
//! at configuration time, before the engine ever starts.

use crate::config::{RecordConfig, Settings};
use crate::error::{Error, Result};
use crate::record::Record;
use crate::traits::{DnsProvider, ProviderFactory};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Registry of named provider factories
#[derive(Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, Box<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a provider name.
    ///
    /// Re-registering a name replaces the previous factory.
    pub fn register(&mut self, name: impl Into<String>, factory: Box<dyn ProviderFactory>) {
        let name = name.into();
        info!(provider = %name, "provider registered");
        self.factories.insert(name, factory);
    }

    /// Whether a factory is registered under `name`
    pub fn has_provider(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered provider names, sorted for stable output
    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build one adapter for a record configuration.
    ///
    /// Fails with a configuration error when the record names a provider
    /// nobody registered, or when the factory rejects the record's settings.
    pub fn create(&self, record: &RecordConfig) -> Result<Box<dyn DnsProvider>> {
        let factory = self.factories.get(&record.provider).ok_or_else(|| {
            Error::config(format!(
                "unknown provider '{}' for {} (registered: {})",
                record.provider,
                record.fqdn(),
                self.provider_names().join(", ")
            ))
        })?;
        factory.create(record)
    }

    /// Build the full record collection from validated settings.
    ///
    /// Fails fast on the first bad record, naming it; a partially built
    /// collection is never returned.
    pub fn build_records(&self, settings: &Settings) -> Result<Vec<Arc<Record>>> {
        let mut records = Vec::with_capacity(settings.records.len());
        for config in &settings.records {
            let provider = self.create(config).map_err(|err| {
                Error::config(format!(
                    "record {} ({}): {}",
                    config.fqdn(),
                    config.provider,
                    err
                ))
            })?;
            records.push(Arc::new(Record::new(provider)));
        }
        Ok(records)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IpVersion;
    use async_trait::async_trait;
    use std::net::IpAddr;

    struct MockProvider {
        domain: String,
        owner: String,
    }

    #[async_trait]
    impl DnsProvider for MockProvider {
        async fn update(&self, ip: IpAddr) -> Result<IpAddr> {
            Ok(ip)
        }

        fn domain(&self) -> &str {
            &self.domain
        }

        fn owner(&self) -> &str {
            &self.owner
        }

        fn ip_version(&self) -> IpVersion {
            IpVersion::V4
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }

    struct MockFactory;

    impl ProviderFactory for MockFactory {
        fn create(&self, record: &RecordConfig) -> Result<Box<dyn DnsProvider>> {
            Ok(Box::new(MockProvider {
                domain: record.domain.clone(),
                owner: record.owner.clone(),
            }))
        }
    }

    struct RejectingFactory;

    impl ProviderFactory for RejectingFactory {
        fn create(&self, _record: &RecordConfig) -> Result<Box<dyn DnsProvider>> {
            Err(Error::config("missing credentials"))
        }
    }

    fn record_config(provider: &str) -> RecordConfig {
        RecordConfig {
            domain: "example.com".to_string(),
            owner: "@".to_string(),
            provider: provider.to_string(),
            ip_version: IpVersion::V4,
            settings: serde_json::Value::Null,
        }
    }

    #[test]
    fn registered_factory_builds_an_adapter() {
        let mut registry = ProviderRegistry::new();
        registry.register("mock", Box::new(MockFactory));

        assert!(registry.has_provider("mock"));
        let provider = registry.create(&record_config("mock")).unwrap();
        assert_eq!(provider.domain(), "example.com");
        assert_eq!(provider.provider_name(), "mock");
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let mut registry = ProviderRegistry::new();
        registry.register("mock", Box::new(MockFactory));

        let err = registry.create(&record_config("nonexistent")).err().unwrap();
        match err {
            Error::Config(message) => {
                assert!(message.contains("nonexistent"));
                assert!(message.contains("mock"));
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn build_records_fails_fast_naming_the_record() {
        let mut registry = ProviderRegistry::new();
        registry.register("mock", Box::new(MockFactory));
        registry.register("broken", Box::new(RejectingFactory));

        let settings = Settings {
            records: vec![record_config("mock"), record_config("broken")],
            ..Default::default()
        };

        let err = registry.build_records(&settings).unwrap_err();
        match err {
            Error::Config(message) => {
                assert!(message.contains("example.com"));
                assert!(message.contains("missing credentials"));
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn build_records_builds_all() {
        let mut registry = ProviderRegistry::new();
        registry.register("mock", Box::new(MockFactory));

        let settings = Settings {
            records: vec![record_config("mock"), record_config("mock")],
            ..Default::default()
        };

        let records = registry.build_records(&settings).unwrap();
        assert_eq!(records.len(), 2);
    }
}
