//! Test doubles and helpers for the orchestration contract tests

#![allow(dead_code)]

use async_trait::async_trait;
use dynsync_core::config::{EngineConfig, IpVersion};
use dynsync_core::{DnsProvider, Error, IpFamily, IpInfoSource, PublicIpResolver, Record, Result};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// One scripted step for a provider's next update call
pub enum Script {
    /// Confirm this address as live
    Confirm(IpAddr),
    /// Lookup (and the follow-up creation attempt) came back empty
    NoResult,
    /// Lookup was ambiguous
    MultipleResults(usize),
    /// Transport-level failure
    Transport(&'static str),
}

/// Provider double that consumes a script, then echoes whatever address it
/// is asked to set. Counts every vendor call.
pub struct ScriptedProvider {
    domain: String,
    owner: String,
    version: IpVersion,
    script: Mutex<VecDeque<Script>>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new(domain: &str, owner: &str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Self {
            domain: domain.to_string(),
            owner: owner.to_string(),
            version: IpVersion::V4,
            script: Mutex::new(VecDeque::new()),
            delay: Duration::ZERO,
            calls: calls.clone(),
        };
        (provider, calls)
    }

    pub fn with_script(mut self, steps: Vec<Script>) -> Self {
        self.script = Mutex::new(steps.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_ip_version(mut self, version: IpVersion) -> Self {
        self.version = version;
        self
    }
}

#[async_trait]
impl DnsProvider for ScriptedProvider {
    async fn update(&self, ip: IpAddr) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let step = self.script.lock().unwrap().pop_front();
        match step {
            None => Ok(ip),
            Some(Script::Confirm(addr)) => Ok(addr),
            Some(Script::NoResult) => Err(Error::NoResult),
            Some(Script::MultipleResults(count)) => Err(Error::MultipleResults { count }),
            Some(Script::Transport(msg)) => Err(Error::http(msg)),
        }
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    fn owner(&self) -> &str {
        &self.owner
    }

    fn ip_version(&self) -> IpVersion {
        self.version
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// One scripted step for an IP source's next fetch
pub enum SourceStep {
    Answer(IpAddr),
    Fail,
}

/// IP source double answering a script, repeating the final step once the
/// script is exhausted. Counts every fetch.
pub struct ScriptedSource {
    steps: Mutex<VecDeque<SourceStep>>,
    last: Mutex<Option<IpAddr>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn answering(addr: &str) -> (Box<dyn IpInfoSource>, Arc<AtomicUsize>) {
        Self::scripted(vec![SourceStep::Answer(addr.parse().unwrap())])
    }

    pub fn failing() -> (Box<dyn IpInfoSource>, Arc<AtomicUsize>) {
        Self::scripted(vec![])
    }

    pub fn scripted(steps: Vec<SourceStep>) -> (Box<dyn IpInfoSource>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            calls: calls.clone(),
        };
        (Box::new(source), calls)
    }
}

#[async_trait]
impl IpInfoSource for ScriptedSource {
    async fn fetch(&self, _family: IpFamily) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(SourceStep::Answer(addr)) => {
                *self.last.lock().unwrap() = Some(addr);
                Ok(addr)
            }
            Some(SourceStep::Fail) => Err(Error::http("503 service unavailable")),
            None => match *self.last.lock().unwrap() {
                Some(addr) => Ok(addr),
                None => Err(Error::http("503 service unavailable")),
            },
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Engine tuning for tests: ticks far in the future so only the initial
/// tick, direct `run_cycle` calls and manual triggers drive cycles
pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        tick_interval_secs: 10_000,
        recheck_interval_secs: 10_000,
        worker_pool_size: 4,
        update_timeout_secs: 5,
        event_channel_capacity: 64,
    }
}

pub fn resolver_with(sources: Vec<Box<dyn IpInfoSource>>) -> Arc<PublicIpResolver> {
    Arc::new(PublicIpResolver::new(
        sources,
        vec![],
        Duration::from_secs(1),
    ))
}

pub fn record(provider: ScriptedProvider) -> Arc<Record> {
    Arc::new(Record::new(Box::new(provider)))
}
