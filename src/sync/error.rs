//! Dashboard error record
//!
//! Whole-cycle failures surface to consumers as a [`DashboardError`] only
//! when synthetic fallback is disabled. A superseded load is classified as
//! [`ErrorKind::Cancelled`] for logging and is never surfaced.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// A remote call failed or timed out
    Network,
    /// No reachable source and fallback disabled
    NoSource,
    /// Superseded by a newer load
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Network => "network",
            ErrorKind::NoSource => "no-source",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Orchestrator settings at the time of the failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    pub selected_source_id: Option<String>,
    pub refresh_interval_ms: u64,
    pub fallback_enabled: bool,
    pub using_synthetic_data: bool,
}

/// Typed error shown by the dashboard's dismissible error indicator
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{message}")]
pub struct DashboardError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
    pub timestamp: DateTime<Utc>,
    pub context: ErrorContext,
}

impl DashboardError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        details: Option<String>,
        context: ErrorContext,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            details,
            retryable: kind != ErrorKind::Cancelled,
            timestamp: Utc::now(),
            context,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ErrorContext {
        ErrorContext {
            selected_source_id: Some("canister-1".to_string()),
            refresh_interval_ms: 30_000,
            fallback_enabled: false,
            using_synthetic_data: false,
        }
    }

    #[test]
    fn test_error_display_is_message() {
        let err = DashboardError::new(
            ErrorKind::Network,
            "Remote call timed out",
            Some("get_analytics".to_string()),
            context(),
        );
        assert_eq!(err.to_string(), "Remote call timed out");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::NoSource).unwrap(),
            "\"no-source\""
        );
        assert_eq!(ErrorKind::NoSource.to_string(), "no-source");
    }

    #[test]
    fn test_cancelled_not_retryable() {
        let err = DashboardError::new(ErrorKind::Cancelled, "superseded", None, context());
        assert!(!err.retryable);
    }
}
