//! Update orchestration engine
//!
//! The UpdateEngine owns the full collection of records. On each scheduling
//! tick (or out-of-band manual trigger) it:
//!
//! 1. Resolves the current public IP once per needed address family and
//!    shares the result read-only across the cycle
//! 2. Selects the records that are due: candidate address differs from the
//!    record's last confirmed address, or the record's last attempt is older
//!    than the re-check interval
//! 3. Fans out to the due records on a bounded worker pool; each record's
//!    own update gate keeps at most one vendor call in flight per key
//! 4. Joins every worker before the cycle ends, so each attempt's outcome
//!    is written to its record before the cycle's boundary
//!
//! ```text
//! ┌──────────────────┐   candidate IP    ┌──────────────┐
//! │ PublicIpResolver │ ────────────────> │ UpdateEngine │
//! └──────────────────┘   (per family)    └──────┬───────┘
//!                                               │ due records, bounded fan-out
//!                            ┌──────────────────┼──────────────────┐
//!                            ▼                  ▼                  ▼
//!                      ┌──────────┐       ┌──────────┐       ┌──────────┐
//!                      │ Record A │       │ Record B │       │ Record C │
//!                      │ adapter  │       │ adapter  │       │ adapter  │
//!                      └──────────┘       └──────────┘       └──────────┘
//! ```
//!
//! A resolver failure for one family skips that family's records for the
//! cycle; their staleness clock keeps advancing, so a later tick retries.

use crate::config::{EngineConfig, IpVersion};
use crate::error::Result;
use crate::record::{Record, UpdateOutcome};
use crate::resolver::PublicIpResolver;
use crate::traits::IpFamily;
use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Events emitted by the engine for external monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started { records_count: usize },

    /// An update attempt started
    UpdateStarted {
        domain: String,
        owner: String,
        new_ip: IpAddr,
    },

    /// The remote record was changed
    UpdateSucceeded {
        domain: String,
        owner: String,
        new_ip: IpAddr,
        previous_ip: Option<IpAddr>,
    },

    /// The remote record already matched the resolved address
    RecordUpToDate {
        domain: String,
        owner: String,
        ip: IpAddr,
    },

    /// The attempt failed; the record now reports this message
    UpdateFailed {
        domain: String,
        owner: String,
        error: String,
    },

    /// A trigger found the record already mid-update; nothing was started
    UpdateSkipped { domain: String, owner: String },

    /// Every IP source for a family failed this cycle
    ResolveFailed { family: String, error: String },

    /// Engine stopped
    Stopped { reason: String },
}

/// Handle for out-of-band update triggers (e.g. from an external API)
///
/// Triggers coalesce: the channel holds at most one pending trigger, and a
/// trigger arriving while a cycle runs folds into the next cycle.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: mpsc::Sender<()>,
}

impl TriggerHandle {
    /// Request an immediate update cycle. Returns `false` when a cycle is
    /// already pending (the request coalesces into it).
    pub fn trigger(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

/// Tick-driven update orchestrator
pub struct UpdateEngine {
    /// The full collection of managed records
    records: Vec<Arc<Record>>,

    /// Shared public IP resolver
    resolver: Arc<PublicIpResolver>,

    /// Interval between scheduled cycles
    tick_interval: Duration,

    /// Staleness threshold beyond which a record is re-checked without an
    /// IP change
    recheck_interval: Duration,

    /// Deadline for one provider update call
    update_timeout: Duration,

    /// Worker pool bound for per-cycle fan-out
    workers: usize,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,

    /// Manual trigger receiver, taken once by the run loop
    trigger_rx: std::sync::Mutex<Option<mpsc::Receiver<()>>>,
}

impl UpdateEngine {
    /// Create an engine over already-constructed records.
    ///
    /// Returns the engine, the event receiver and the manual trigger
    /// handle. The records come from
    /// [`crate::ProviderRegistry::build_records`]; by the time they reach
    /// the engine every configuration error has already been rejected.
    pub fn new(
        records: Vec<Arc<Record>>,
        resolver: Arc<PublicIpResolver>,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>, TriggerHandle)> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let (trigger_tx, trigger_rx) = mpsc::channel(1);

        let engine = Self {
            records,
            resolver,
            tick_interval: Duration::from_secs(config.tick_interval_secs),
            recheck_interval: Duration::from_secs(config.recheck_interval_secs),
            update_timeout: Duration::from_secs(config.update_timeout_secs),
            workers: config.worker_pool_size,
            event_tx,
            trigger_rx: std::sync::Mutex::new(Some(trigger_rx)),
        };

        Ok((engine, event_rx, TriggerHandle { tx: trigger_tx }))
    }

    /// The managed records (for the status projection)
    pub fn records(&self) -> &[Arc<Record>] {
        &self.records
    }

    /// Run the engine until SIGINT
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run with a controlled shutdown signal.
    ///
    /// Used by contract tests and by daemons that manage their own signal
    /// handling; `run()` wires Ctrl-C instead.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        let mut trigger_rx = self
            .trigger_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| crate::Error::Other("engine is already running".to_string()))?;

        self.emit(EngineEvent::Started {
            records_count: self.records.len(),
        });
        info!(records = self.records.len(), "update engine started");

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        if let Some(mut rx) = shutdown_rx {
            loop {
                tokio::select! {
                    _ = interval.tick() => self.run_cycle().await,
                    Some(()) = trigger_rx.recv() => {
                        debug!("manual trigger received");
                        self.run_cycle().await;
                    }
                    _ = &mut rx => {
                        info!("shutdown signal received");
                        self.emit(EngineEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            loop {
                tokio::select! {
                    _ = interval.tick() => self.run_cycle().await,
                    Some(()) = trigger_rx.recv() => {
                        debug!("manual trigger received");
                        self.run_cycle().await;
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("shutdown signal received");
                        self.emit(EngineEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Run one full orchestration cycle.
    ///
    /// Public so that daemons and tests can drive cycles deterministically;
    /// the run loop calls this on every tick and trigger.
    pub async fn run_cycle(&self) {
        let now = Utc::now();

        let needs_v4 = self
            .records
            .iter()
            .any(|r| matches!(r.ip_version(), IpVersion::V4 | IpVersion::Dual));
        let needs_v6 = self
            .records
            .iter()
            .any(|r| matches!(r.ip_version(), IpVersion::V6 | IpVersion::Dual));

        // One resolution per family per cycle, shared read-only
        let v4 = if needs_v4 {
            self.resolve_family(IpFamily::V4).await
        } else {
            None
        };
        let v6 = if needs_v6 {
            self.resolve_family(IpFamily::V6).await
        } else {
            None
        };

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut workers = JoinSet::new();

        for record in &self.records {
            let candidate = match record.ip_version() {
                IpVersion::V4 => v4,
                IpVersion::V6 => v6,
                IpVersion::Dual => v4.or(v6),
            };
            let Some(candidate) = candidate else {
                debug!(
                    domain = record.domain(),
                    owner = record.owner(),
                    "no resolved address for this record's family, skipping this cycle"
                );
                continue;
            };

            if !record.is_due(candidate, now, self.recheck_interval) {
                continue;
            }

            let record = Arc::clone(record);
            let semaphore = Arc::clone(&semaphore);
            let event_tx = self.event_tx.clone();
            let update_timeout = self.update_timeout;

            workers.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                let domain = record.domain().to_string();
                let owner = record.owner().to_string();

                emit_to(
                    &event_tx,
                    EngineEvent::UpdateStarted {
                        domain: domain.clone(),
                        owner: owner.clone(),
                        new_ip: candidate,
                    },
                );

                match record.run_update(candidate, update_timeout).await {
                    UpdateOutcome::Success {
                        new_ip,
                        previous_ip,
                    } => {
                        info!(%domain, %owner, %new_ip, ?previous_ip, "record updated");
                        emit_to(
                            &event_tx,
                            EngineEvent::UpdateSucceeded {
                                domain,
                                owner,
                                new_ip,
                                previous_ip,
                            },
                        );
                    }
                    UpdateOutcome::UpToDate { ip } => {
                        debug!(%domain, %owner, %ip, "record already up to date");
                        emit_to(&event_tx, EngineEvent::RecordUpToDate { domain, owner, ip });
                    }
                    UpdateOutcome::Failed { message } => {
                        warn!(%domain, %owner, error = %message, "record update failed");
                        emit_to(
                            &event_tx,
                            EngineEvent::UpdateFailed {
                                domain,
                                owner,
                                error: message,
                            },
                        );
                    }
                    UpdateOutcome::InProgress => {
                        debug!(%domain, %owner, "update already in flight, skipped");
                        emit_to(&event_tx, EngineEvent::UpdateSkipped { domain, owner });
                    }
                }
            });
        }

        // The cycle's boundary: every attempt's outcome is written to its
        // record before this returns.
        while workers.join_next().await.is_some() {}
    }

    async fn resolve_family(&self, family: IpFamily) -> Option<IpAddr> {
        match self.resolver.resolve(family).await {
            Ok(ip) => Some(ip),
            Err(err) => {
                warn!(%family, error = %err, "public IP resolution failed for this cycle");
                self.emit(EngineEvent::ResolveFailed {
                    family: family.to_string(),
                    error: err.to_string(),
                });
                None
            }
        }
    }

    fn emit(&self, event: EngineEvent) {
        emit_to(&self.event_tx, event);
    }
}

/// Send an event without blocking; a full channel drops the event with a
/// warning rather than growing without bound.
fn emit_to(tx: &mpsc::Sender<EngineEvent>, event: EngineEvent) {
    if tx.try_send(event).is_err() {
        warn!("engine event channel full, dropping event");
    }
}
