//! Connection Health Tracker
//!
//! Rolling, non-authoritative summary of how reliably the dashboard has been
//! reaching its backend. [`ConnectionHealth::observe`] is a pure transition;
//! the orchestrator calls it once per status change it reports.
//!
//! Quality is derived from the reported status and the error count:
//!
//! | status        | error count | quality     |
//! |---------------|-------------|-------------|
//! | connected     | < 3         | `excellent` |
//! | connected     | >= 3        | `good`      |
//! | not connected | > 10        | `poor`      |
//! | not connected | <= 10       | `unstable`  |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error count below which a connected link is `excellent`
pub const EXCELLENT_MAX_ERRORS: u64 = 3;

/// Error count above which a disconnected link is `poor`
pub const POOR_MIN_ERRORS: u64 = 10;

/// Reported connection status of the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Unstable,
    Poor,
}

impl ConnectionQuality {
    /// Quality for a status and cumulative error count
    pub fn derive(status: ConnectionStatus, error_count: u64) -> Self {
        match (status.is_connected(), error_count) {
            (true, n) if n < EXCELLENT_MAX_ERRORS => ConnectionQuality::Excellent,
            (true, _) => ConnectionQuality::Good,
            (false, n) if n > POOR_MIN_ERRORS => ConnectionQuality::Poor,
            (false, _) => ConnectionQuality::Unstable,
        }
    }
}

/// Connection health as seen by consumers
///
/// Counters only grow; a fresh value is created when the orchestrator is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionHealth {
    last_update: Option<DateTime<Utc>>,
    data_freshness_ms: i64,
    update_frequency_ms: u64,
    error_count: u64,
    reconnect_count: u64,
    quality: ConnectionQuality,
}

impl ConnectionHealth {
    /// Initial health for an orchestrator polling every `update_frequency_ms`
    pub fn new(update_frequency_ms: u64) -> Self {
        Self {
            last_update: None,
            data_freshness_ms: 0,
            update_frequency_ms,
            error_count: 0,
            reconnect_count: 0,
            quality: ConnectionQuality::derive(ConnectionStatus::Connecting, 0),
        }
    }

    /// Health after observing `status` at `now`
    ///
    /// `data_freshness_ms` becomes the gap since the previous observation.
    /// Entering `connecting` counts as a reconnect.
    pub fn observe(&self, status: ConnectionStatus, error_occurred: bool, now: DateTime<Utc>) -> Self {
        let data_freshness_ms = self
            .last_update
            .map(|prev| (now - prev).num_milliseconds().max(0))
            .unwrap_or(0);
        let error_count = if error_occurred {
            self.error_count.saturating_add(1)
        } else {
            self.error_count
        };
        let reconnect_count = if status == ConnectionStatus::Connecting {
            self.reconnect_count.saturating_add(1)
        } else {
            self.reconnect_count
        };

        Self {
            last_update: Some(now),
            data_freshness_ms,
            update_frequency_ms: self.update_frequency_ms,
            error_count,
            reconnect_count,
            quality: ConnectionQuality::derive(status, error_count),
        }
    }

    /// Same counters, new polling period
    pub fn with_update_frequency(&self, update_frequency_ms: u64) -> Self {
        Self {
            update_frequency_ms,
            ..self.clone()
        }
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn data_freshness_ms(&self) -> i64 {
        self.data_freshness_ms
    }

    pub fn update_frequency_ms(&self) -> u64 {
        self.update_frequency_ms
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count
    }

    pub fn quality(&self) -> ConnectionQuality {
        self.quality
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn after_errors(n: u64) -> ConnectionHealth {
        let now = Utc::now();
        (0..n).fold(ConnectionHealth::new(30_000), |h, _| {
            h.observe(ConnectionStatus::Error, true, now)
        })
    }

    #[test]
    fn test_initial_health() {
        let health = ConnectionHealth::new(30_000);
        assert_eq!(health.error_count(), 0);
        assert_eq!(health.reconnect_count(), 0);
        assert!(health.last_update().is_none());
        assert_eq!(health.quality(), ConnectionQuality::Unstable);
    }

    #[test]
    fn test_quality_mapping() {
        use ConnectionQuality::*;
        use ConnectionStatus::*;

        assert_eq!(ConnectionQuality::derive(Connected, 0), Excellent);
        assert_eq!(ConnectionQuality::derive(Connected, 2), Excellent);
        assert_eq!(ConnectionQuality::derive(Connected, 3), Good);
        assert_eq!(ConnectionQuality::derive(Connected, 50), Good);
        assert_eq!(ConnectionQuality::derive(Error, 0), Unstable);
        assert_eq!(ConnectionQuality::derive(Disconnected, 10), Unstable);
        assert_eq!(ConnectionQuality::derive(Connecting, 11), Poor);
    }

    #[test]
    fn test_observe_uses_updated_error_count() {
        let health = after_errors(2).observe(ConnectionStatus::Connected, true, Utc::now());
        assert_eq!(health.error_count(), 3);
        assert_eq!(health.quality(), ConnectionQuality::Good);

        let health = after_errors(11);
        assert_eq!(health.quality(), ConnectionQuality::Poor);
    }

    #[test]
    fn test_connecting_counts_reconnects() {
        let now = Utc::now();
        let health = ConnectionHealth::new(30_000)
            .observe(ConnectionStatus::Connecting, false, now)
            .observe(ConnectionStatus::Connected, false, now)
            .observe(ConnectionStatus::Connecting, false, now);

        assert_eq!(health.reconnect_count(), 2);
        assert_eq!(health.error_count(), 0);
    }

    #[test]
    fn test_counters_never_decrease() {
        let start = Utc::now();
        let statuses = [
            (ConnectionStatus::Connecting, false),
            (ConnectionStatus::Error, true),
            (ConnectionStatus::Connected, false),
            (ConnectionStatus::Disconnected, true),
            (ConnectionStatus::Connecting, false),
            (ConnectionStatus::Connected, false),
        ];

        let mut health = ConnectionHealth::new(1_000);
        for (i, (status, error)) in statuses.iter().enumerate() {
            let next = health.observe(*status, *error, start + Duration::seconds(i as i64));
            assert!(next.error_count() >= health.error_count());
            assert!(next.reconnect_count() >= health.reconnect_count());
            health = next;
        }
        assert_eq!(health.error_count(), 2);
        assert_eq!(health.reconnect_count(), 2);
    }

    #[test]
    fn test_data_freshness_tracks_gap() {
        let start = Utc::now();
        let health = ConnectionHealth::new(1_000)
            .observe(ConnectionStatus::Connected, false, start)
            .observe(ConnectionStatus::Connected, false, start + Duration::milliseconds(1_500));

        assert_eq!(health.data_freshness_ms(), 1_500);
        assert_eq!(health.last_update(), Some(start + Duration::milliseconds(1_500)));
    }
}
