//! Record: one managed domain/owner/IP-version binding and its state machine
//!
//! Status transitions per update attempt:
//!
//! ```text
//! Unset ──> Updating ──> { Success, UpToDate, Fail }
//! ```
//!
//! `Updating` is set immediately before the provider call and is the only
//! state in which a concurrent trigger for the same record is turned away.
//! Status and message always change together under one lock, so no reader
//! ever observes a status without its matching message.

pub mod history;

pub use history::History;

use crate::config::IpVersion;
use crate::error::Error;
use crate::traits::DnsProvider;
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Per-record update status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No attempt has been made yet
    Unset,
    /// An update attempt is in flight
    Updating,
    /// The last attempt changed the remote record
    Success,
    /// The last attempt found the remote record already correct
    UpToDate,
    /// The last attempt failed
    Fail,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Unset => write!(f, "unset"),
            Status::Updating => write!(f, "updating"),
            Status::Success => write!(f, "success"),
            Status::UpToDate => write!(f, "up to date"),
            Status::Fail => write!(f, "failed"),
        }
    }
}

/// Outcome of one driven update attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The remote record was changed to `new_ip`
    Success {
        new_ip: IpAddr,
        previous_ip: Option<IpAddr>,
    },
    /// The remote record already carried `ip`; no write happened
    UpToDate { ip: IpAddr },
    /// The attempt failed; `message` is what the status now carries
    Failed { message: String },
    /// Another attempt holds this record's update gate; no vendor call made
    InProgress,
}

/// Mutable state of a record, always mutated as a unit
#[derive(Debug)]
pub struct RecordState {
    pub status: Status,
    pub message: String,
    pub last_attempt: Option<DateTime<Utc>>,
    pub history: History,
}

impl RecordState {
    fn new() -> Self {
        Self {
            status: Status::Unset,
            message: String::new(),
            last_attempt: None,
            history: History::new(),
        }
    }
}

/// One managed record: a provider adapter plus its status and history
///
/// The record's unique key is (domain, owner, ip_version). The update gate
/// guarantees at most one in-flight vendor call per key; state reads are
/// short critical sections on a plain mutex and never block on network I/O.
pub struct Record {
    provider: Box<dyn DnsProvider>,
    state: Mutex<RecordState>,
    update_gate: tokio::sync::Mutex<()>,
}

impl Record {
    /// Register a record around a constructed provider adapter.
    ///
    /// The history starts empty and lives for the record's lifetime.
    pub fn new(provider: Box<dyn DnsProvider>) -> Self {
        Self {
            provider,
            state: Mutex::new(RecordState::new()),
            update_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// The bound provider adapter
    pub fn provider(&self) -> &dyn DnsProvider {
        self.provider.as_ref()
    }

    /// Registered domain
    pub fn domain(&self) -> &str {
        self.provider.domain()
    }

    /// Owner label ("@" for the apex)
    pub fn owner(&self) -> &str {
        self.provider.owner()
    }

    /// Address family this record tracks
    pub fn ip_version(&self) -> IpVersion {
        self.provider.ip_version()
    }

    /// Current status and its message, read atomically
    pub fn status(&self) -> (Status, String) {
        let state = self.state.lock().unwrap();
        (state.status, state.message.clone())
    }

    /// Timestamp of the most recent attempt, success or failure
    pub fn last_attempt(&self) -> Option<DateTime<Utc>> {
        self.state.lock().unwrap().last_attempt
    }

    /// The last address the provider confirmed as live
    pub fn current_ip(&self) -> Option<IpAddr> {
        self.state.lock().unwrap().history.current_ip()
    }

    /// Run a closure over the record state (used by the status projection)
    pub fn with_state<R>(&self, f: impl FnOnce(&RecordState) -> R) -> R {
        let state = self.state.lock().unwrap();
        f(&state)
    }

    /// Whether this record needs an attempt for the candidate address.
    ///
    /// Due when the candidate differs from the last confirmed address, when
    /// no attempt has been made yet, or when the last attempt is older than
    /// the re-check interval (recovers from earlier failures and confirms
    /// still-correct records after provider-side resets).
    pub fn is_due(&self, candidate: IpAddr, now: DateTime<Utc>, recheck: Duration) -> bool {
        let state = self.state.lock().unwrap();
        if state.history.current_ip() != Some(candidate) {
            return true;
        }
        match state.last_attempt {
            None => true,
            Some(at) => {
                now.signed_duration_since(at)
                    >= chrono::Duration::from_std(recheck).unwrap_or(chrono::Duration::MAX)
            }
        }
    }

    /// Drive one update attempt against the provider, bounded by `deadline`.
    ///
    /// Acquires the record's update gate without waiting: a trigger arriving
    /// while another attempt is in flight gets [`UpdateOutcome::InProgress`]
    /// and causes no vendor call. The terminal status (and `last_attempt`)
    /// is always written before this returns, including on timeout.
    pub async fn run_update(&self, ip: IpAddr, deadline: Duration) -> UpdateOutcome {
        let _gate = match self.update_gate.try_lock() {
            Ok(gate) => gate,
            Err(_) => {
                debug!(
                    domain = self.domain(),
                    owner = self.owner(),
                    "update already in progress, skipping trigger"
                );
                return UpdateOutcome::InProgress;
            }
        };

        {
            let mut state = self.state.lock().unwrap();
            state.status = Status::Updating;
            state.message.clear();
            state.last_attempt = Some(Utc::now());
        }

        let result = tokio::time::timeout(deadline, self.provider.update(ip)).await;
        let finished = Utc::now();

        let mut state = self.state.lock().unwrap();
        match result {
            Ok(Ok(confirmed)) => {
                let previous = state.history.current_ip();
                state.message.clear();
                state.history.record(confirmed, finished);
                if previous == Some(confirmed) {
                    state.status = Status::UpToDate;
                    UpdateOutcome::UpToDate { ip: confirmed }
                } else {
                    state.status = Status::Success;
                    UpdateOutcome::Success {
                        new_ip: confirmed,
                        previous_ip: previous,
                    }
                }
            }
            Ok(Err(err)) => {
                // NoResult surfacing here means the adapter's single
                // creation attempt also came back empty.
                let message = match &err {
                    Error::NoResult => "record not found even after a creation attempt".to_string(),
                    _ => err.to_string(),
                };
                state.status = Status::Fail;
                state.message = message.clone();
                UpdateOutcome::Failed { message }
            }
            Err(_) => {
                let message = Error::Timeout(deadline).to_string();
                state.status = Status::Fail;
                state.message = message.clone();
                UpdateOutcome::Failed { message }
            }
        }
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("record", &self.provider.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stub adapter returning a scripted result after an optional delay
    struct StubProvider {
        result: fn() -> Result<IpAddr, Error>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn ok() -> Self {
            Self {
                result: || Ok("1.2.3.4".parse().unwrap()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                result: || Err(Error::MultipleResults { count: 2 }),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn slow() -> Self {
            Self {
                result: || Ok("1.2.3.4".parse().unwrap()),
                delay: Duration::from_millis(200),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DnsProvider for StubProvider {
        async fn update(&self, _ip: IpAddr) -> Result<IpAddr, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.result)()
        }

        fn domain(&self) -> &str {
            "example.com"
        }

        fn owner(&self) -> &str {
            "@"
        }

        fn ip_version(&self) -> IpVersion {
            IpVersion::V4
        }

        fn provider_name(&self) -> &'static str {
            "stub"
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn first_success_records_history() {
        let record = Record::new(Box::new(StubProvider::ok()));

        let outcome = record.run_update(ip("1.2.3.4"), Duration::from_secs(1)).await;
        assert_eq!(
            outcome,
            UpdateOutcome::Success {
                new_ip: ip("1.2.3.4"),
                previous_ip: None,
            }
        );

        let (status, message) = record.status();
        assert_eq!(status, Status::Success);
        assert!(message.is_empty());
        assert_eq!(record.current_ip(), Some(ip("1.2.3.4")));
        assert!(record.last_attempt().is_some());
    }

    #[tokio::test]
    async fn unchanged_address_is_up_to_date() {
        let record = Record::new(Box::new(StubProvider::ok()));

        record.run_update(ip("1.2.3.4"), Duration::from_secs(1)).await;
        let outcome = record.run_update(ip("1.2.3.4"), Duration::from_secs(1)).await;

        assert_eq!(outcome, UpdateOutcome::UpToDate { ip: ip("1.2.3.4") });
        let (status, _) = record.status();
        assert_eq!(status, Status::UpToDate);
        assert!(record.with_state(|s| s.history.previous_ips().is_empty()));
    }

    #[tokio::test]
    async fn failure_sets_status_and_message_together() {
        let record = Record::new(Box::new(StubProvider::failing()));

        let outcome = record.run_update(ip("1.2.3.4"), Duration::from_secs(1)).await;
        match outcome {
            UpdateOutcome::Failed { message } => assert!(message.contains('2')),
            other => panic!("expected failure, got {:?}", other),
        }

        let (status, message) = record.status();
        assert_eq!(status, Status::Fail);
        assert!(message.contains("2 matching records"));
        // History untouched on failure
        assert_eq!(record.current_ip(), None);
    }

    #[tokio::test]
    async fn timeout_is_recorded_as_failure() {
        let record = Record::new(Box::new(StubProvider::slow()));

        let outcome = record.run_update(ip("1.2.3.4"), Duration::from_millis(10)).await;
        match outcome {
            UpdateOutcome::Failed { message } => assert!(message.contains("timed out")),
            other => panic!("expected timeout failure, got {:?}", other),
        }
        let (status, _) = record.status();
        assert_eq!(status, Status::Fail);
    }

    #[tokio::test]
    async fn concurrent_attempt_is_turned_away() {
        let record = std::sync::Arc::new(Record::new(Box::new(StubProvider::slow())));

        let first = {
            let record = record.clone();
            tokio::spawn(async move { record.run_update(ip("1.2.3.4"), Duration::from_secs(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = record.run_update(ip("1.2.3.4"), Duration::from_secs(1)).await;
        assert_eq!(second, UpdateOutcome::InProgress);

        let first = first.await.unwrap();
        assert!(matches!(first, UpdateOutcome::Success { .. }));
    }

    #[tokio::test]
    async fn due_when_address_changed_or_stale() {
        let record = Record::new(Box::new(StubProvider::ok()));
        let now = Utc::now();
        let recheck = Duration::from_secs(3600);

        // Never attempted
        assert!(record.is_due(ip("1.2.3.4"), now, recheck));

        record.run_update(ip("1.2.3.4"), Duration::from_secs(1)).await;

        // Same address, fresh attempt
        assert!(!record.is_due(ip("1.2.3.4"), Utc::now(), recheck));
        // Different address
        assert!(record.is_due(ip("5.6.7.8"), Utc::now(), recheck));
        // Stale attempt
        let later = Utc::now() + chrono::Duration::seconds(7200);
        assert!(record.is_due(ip("1.2.3.4"), later, recheck));
    }
}
