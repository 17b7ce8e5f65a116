//! Read-only JSON projection of record state
//!
//! Builds the status document served to API and dashboard consumers. The
//! projection is a point-in-time snapshot: it takes each record's state
//! lock briefly and never blocks on network I/O.
//!
//! The per-record status string is composed as
//! `"<state> (<message>), <age> ago"`, where the parenthetical is dropped
//! when there is no message and the age comes from the record's last
//! attempt. A record that has never been attempted reports `"N/A"`.

use crate::record::{Record, RecordState, Status, history::format_duration};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Snapshot of one record for the status document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSummary {
    pub domain: String,
    pub owner: String,
    pub provider: String,
    pub ip_version: String,
    /// Composed human status line, e.g. `"failed (HTTP error: 502), 3m ago"`
    pub status: String,
    /// Textual address, empty until the first confirmed address
    pub current_ip: String,
    pub previous_ips: Vec<String>,
}

/// The full status document envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub success: bool,
    pub status: String,
    pub data: Vec<RecordSummary>,
    pub count: usize,
    /// Unix timestamp of the snapshot
    pub timestamp: i64,
}

impl Record {
    /// Snapshot this record for the status document
    pub fn summary(&self, now: DateTime<Utc>) -> RecordSummary {
        self.with_state(|state| RecordSummary {
            domain: self.domain().to_string(),
            owner: self.owner().to_string(),
            provider: self.provider().provider_name().to_string(),
            ip_version: self.ip_version().to_string(),
            status: compose_status(state, now),
            current_ip: state
                .history
                .current_ip()
                .map(|ip| ip.to_string())
                .unwrap_or_default(),
            previous_ips: state
                .history
                .previous_ips()
                .iter()
                .map(|ip| ip.to_string())
                .collect(),
        })
    }
}

/// Build the status document over the full record collection
pub fn status_report(records: &[Arc<Record>], now: DateTime<Utc>) -> StatusReport {
    let data: Vec<RecordSummary> = records.iter().map(|r| r.summary(now)).collect();
    StatusReport {
        success: true,
        status: "success".to_string(),
        count: data.len(),
        data,
        timestamp: now.timestamp(),
    }
}

fn compose_status(state: &RecordState, now: DateTime<Utc>) -> String {
    if state.status == Status::Unset {
        return "N/A".to_string();
    }

    let message = match state.status {
        Status::UpToDate => format!(
            "no IP change for {}",
            state.history.duration_since_success(now)
        ),
        _ => state.message.clone(),
    };

    let mut out = state.status.to_string();
    if !message.is_empty() {
        out.push_str(&format!(" ({})", message));
    }
    if let Some(at) = state.last_attempt {
        out.push_str(&format!(
            ", {} ago",
            format_duration(now.signed_duration_since(at).num_seconds())
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IpVersion;
    use crate::error::Error;
    use crate::traits::DnsProvider;
    use async_trait::async_trait;
    use std::net::IpAddr;
    use std::time::Duration;

    struct FakeProvider {
        result: std::result::Result<IpAddr, ()>,
    }

    #[async_trait]
    impl DnsProvider for FakeProvider {
        async fn update(&self, _ip: IpAddr) -> Result<IpAddr, Error> {
            match self.result {
                Ok(ip) => Ok(ip),
                Err(()) => Err(Error::http("502 bad gateway")),
            }
        }

        fn domain(&self) -> &str {
            "example.com"
        }

        fn owner(&self) -> &str {
            "www"
        }

        fn ip_version(&self) -> IpVersion {
            IpVersion::V4
        }

        fn provider_name(&self) -> &'static str {
            "fake"
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn untouched_record_reports_not_available() {
        let record = Record::new(Box::new(FakeProvider {
            result: Ok(ip("1.2.3.4")),
        }));

        let summary = record.summary(Utc::now());
        assert_eq!(summary.status, "N/A");
        // The field is always present, empty before the first success
        assert_eq!(summary.current_ip, "");
        assert!(summary.previous_ips.is_empty());
        assert_eq!(summary.domain, "example.com");
        assert_eq!(summary.owner, "www");
        assert_eq!(summary.ip_version, "ipv4");
    }

    #[tokio::test]
    async fn success_composes_state_and_age() {
        let record = Record::new(Box::new(FakeProvider {
            result: Ok(ip("1.2.3.4")),
        }));
        record
            .run_update(ip("1.2.3.4"), Duration::from_secs(1))
            .await;

        let summary = record.summary(Utc::now());
        assert!(summary.status.starts_with("success"), "{}", summary.status);
        assert!(summary.status.ends_with("ago"), "{}", summary.status);
        // No message, so no parenthetical
        assert!(!summary.status.contains('('), "{}", summary.status);
        assert_eq!(summary.current_ip, "1.2.3.4");
    }

    #[tokio::test]
    async fn up_to_date_reports_time_since_change() {
        let record = Record::new(Box::new(FakeProvider {
            result: Ok(ip("1.2.3.4")),
        }));
        record
            .run_update(ip("1.2.3.4"), Duration::from_secs(1))
            .await;
        record
            .run_update(ip("1.2.3.4"), Duration::from_secs(1))
            .await;

        let summary = record.summary(Utc::now());
        assert!(
            summary.status.starts_with("up to date (no IP change for"),
            "{}",
            summary.status
        );
    }

    #[tokio::test]
    async fn failure_message_appears_in_parentheses() {
        let record = Record::new(Box::new(FakeProvider { result: Err(()) }));
        record
            .run_update(ip("1.2.3.4"), Duration::from_secs(1))
            .await;

        let summary = record.summary(Utc::now());
        assert!(summary.status.starts_with("failed ("), "{}", summary.status);
        assert!(summary.status.contains("502"), "{}", summary.status);
    }

    #[tokio::test]
    async fn report_envelope_counts_and_serializes() {
        let records = vec![
            Arc::new(Record::new(Box::new(FakeProvider {
                result: Ok(ip("1.2.3.4")),
            }))),
            Arc::new(Record::new(Box::new(FakeProvider {
                result: Ok(ip("5.6.7.8")),
            }))),
        ];
        records[0]
            .run_update(ip("1.2.3.4"), Duration::from_secs(1))
            .await;

        let now = Utc::now();
        let report = status_report(&records, now);
        assert!(report.success);
        assert_eq!(report.status, "success");
        assert_eq!(report.count, 2);
        assert_eq!(report.data.len(), 2);
        assert_eq!(report.timestamp, now.timestamp());

        let json = serde_json::to_string(&report).unwrap();
        let parsed: StatusReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.count, 2);
        assert_eq!(parsed.data[0].current_ip, "1.2.3.4");
        // The untouched record still carries the field, as an empty string
        assert_eq!(parsed.data[1].current_ip, "");
        assert!(json.contains("\"current_ip\":\"\""), "{}", json);
    }
}
