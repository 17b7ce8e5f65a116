// # dynsync-core
//
// Core library for the dynsync dynamic DNS updater.
//
// ## Architecture Overview
//
// This library provides everything needed to keep DNS records pointed at a
// host's current public IP address:
// - **DnsProvider**: Trait for vendor-specific record update adapters
// - **IpInfoSource** / **PublicIpResolver**: Public IP discovery with
//   ordered multi-source fallback
// - **Record** / **History**: Per-record status state machine and IP change
//   log
// - **UpdateEngine**: Tick-driven orchestrator that resolves the public IP
//   once per cycle and fans out to all due records
// - **ProviderRegistry**: Injected name-to-factory map for building adapters
//   from configuration
// - **report**: Read-only JSON projection of record state for API/dashboard
//   consumers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Adapters translate one update call into one
//    vendor API exchange; all scheduling, retry and state decisions live in
//    the engine
// 2. **Single-writer-per-record**: Only the tick worker holding a record's
//    update gate mutates its state
// 3. **Idempotency**: An unchanged address never produces a vendor write
// 4. **Injected construction**: Provider factories are registered at startup
//    and passed in, never looked up through ambient global state

pub mod config;
pub mod engine;
pub mod error;
pub mod record;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod traits;

// Re-export core types for convenience
pub use config::{EngineConfig, IpVersion, RecordConfig, ResolverConfig, Settings};
pub use engine::{EngineEvent, TriggerHandle, UpdateEngine};
pub use error::{Error, Result};
pub use record::{History, Record, Status, UpdateOutcome};
pub use registry::ProviderRegistry;
pub use report::{RecordSummary, StatusReport, status_report};
pub use resolver::PublicIpResolver;
pub use traits::{DnsProvider, IpFamily, IpInfoSource, ProviderFactory};
