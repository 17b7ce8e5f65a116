//! Per-record IP change history
//!
//! Append-only, adjacent-deduplicated log of the addresses a provider has
//! confirmed as live. Created empty when a record is registered and kept for
//! the life of the record; only a successful update attempt touches it.

use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// History of resolved addresses for one record
#[derive(Debug, Clone, Default)]
pub struct History {
    /// The last address the provider confirmed as live
    current_ip: Option<IpAddr>,

    /// Prior addresses, oldest first, no two adjacent entries equal
    previous_ips: Vec<IpAddr>,

    /// Last transition into Success or UpToDate
    last_success: Option<DateTime<Utc>>,
}

impl History {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// The last confirmed address, if any
    pub fn current_ip(&self) -> Option<IpAddr> {
        self.current_ip
    }

    /// Prior addresses, oldest first
    pub fn previous_ips(&self) -> &[IpAddr] {
        &self.previous_ips
    }

    /// Timestamp of the last successful attempt
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    /// Record a successful update attempt.
    ///
    /// Always stamps the success time. The address log only moves when the
    /// confirmed address actually changed: the outgoing `current_ip` is
    /// appended to `previous_ips` unless it already equals the last entry,
    /// so a revert-then-revert never produces consecutive duplicates.
    pub fn record(&mut self, new_ip: IpAddr, now: DateTime<Utc>) {
        self.last_success = Some(now);

        if self.current_ip == Some(new_ip) {
            return;
        }

        if let Some(previous) = self.current_ip
            && self.previous_ips.last() != Some(&previous)
        {
            self.previous_ips.push(previous);
        }
        self.current_ip = Some(new_ip);
    }

    /// Coarse human duration since the last success, or "never"
    pub fn duration_since_success(&self, now: DateTime<Utc>) -> String {
        match self.last_success {
            None => "never".to_string(),
            Some(at) => format_duration(now.signed_duration_since(at).num_seconds()),
        }
    }
}

/// Format a duration in whole seconds as a coarse human string
pub(crate) fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn starts_empty() {
        let history = History::new();
        assert_eq!(history.current_ip(), None);
        assert!(history.previous_ips().is_empty());
        assert_eq!(history.duration_since_success(Utc::now()), "never");
    }

    #[test]
    fn unchanged_ip_is_a_noop_for_the_log() {
        let mut history = History::new();
        let now = Utc::now();

        history.record(ip("1.2.3.4"), now);
        history.record(ip("1.2.3.4"), now);

        assert_eq!(history.current_ip(), Some(ip("1.2.3.4")));
        assert!(history.previous_ips().is_empty());
    }

    #[test]
    fn adjacent_duplicates_collapse() {
        // 1.1.1.1 -> 1.1.1.1 -> 2.2.2.2 -> 2.2.2.2 -> 1.1.1.1
        let mut history = History::new();
        let now = Utc::now();

        for addr in ["1.1.1.1", "1.1.1.1", "2.2.2.2", "2.2.2.2", "1.1.1.1"] {
            history.record(ip(addr), now);
        }

        assert_eq!(history.current_ip(), Some(ip("1.1.1.1")));
        assert_eq!(history.previous_ips(), &[ip("1.1.1.1"), ip("2.2.2.2")]);
    }

    #[test]
    fn no_two_consecutive_equal_entries_for_any_sequence() {
        let inputs = ["1.1.1.1", "2.2.2.2", "2.2.2.2", "1.1.1.1", "1.1.1.1", "3.3.3.3", "1.1.1.1"];
        let mut history = History::new();
        let now = Utc::now();

        for addr in inputs {
            history.record(ip(addr), now);
        }

        let previous = history.previous_ips();
        for pair in previous.windows(2) {
            assert_ne!(pair[0], pair[1], "adjacent duplicate in {:?}", previous);
        }
    }

    #[test]
    fn success_time_advances_even_without_change() {
        let mut history = History::new();
        let first = Utc::now();
        history.record(ip("1.2.3.4"), first);

        let later = first + chrono::Duration::seconds(90);
        history.record(ip("1.2.3.4"), later);

        assert_eq!(history.last_success(), Some(later));
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(60), "1m");
        assert_eq!(format_duration(3 * 3600 + 100), "3h");
        assert_eq!(format_duration(2 * 86_400), "2d");
        assert_eq!(format_duration(-5), "0s");
    }
}
