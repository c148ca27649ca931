//! Remote Accessor Boundary
//!
//! Everything the dashboard knows about payment state comes through the
//! traits in this module. The backend canisters are opaque: each call may
//! resolve, reject, or hang, independently of every other call.
//!
//! ## Architecture
//!
//! - **SourceDirectory**: lists the sources a credential can reach and opens
//!   an accessor for one of them
//! - **RemoteAccessor**: the per-source read operations, each returning its
//!   own [`RemoteResult`]
//! - **GatewayClient**: JSON-over-HTTP implementation of both traits

mod http;
mod types;

pub use http::{GatewayClient, GatewayConfig};
pub use types::{
    BillingInterval, CanisterConfiguration, CouponType, DiscountCoupon, ModalConfig,
    NanoTimestamp, PaymentAnalytics, PaymentTransaction, Product, ProductStatus, SourceRecord,
    Subscription, SubscriptionPlan, SubscriptionStatus, TokenConfig, TransactionStatus,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result of a single remote call
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Lists reachable sources and opens accessors for them
#[async_trait]
pub trait SourceDirectory: Send + Sync {
    /// Sources owned by the holder of `credential`
    async fn list_sources(&self, credential: &Credential) -> RemoteResult<Vec<RemoteSource>>;

    /// Open an accessor bound to one source
    async fn connect(
        &self,
        source: &RemoteSource,
        credential: &Credential,
    ) -> RemoteResult<Arc<dyn RemoteAccessor>>;
}

/// Read operations against a single source
#[async_trait]
pub trait RemoteAccessor: Send + Sync {
    async fn get_analytics(&self) -> RemoteResult<PaymentAnalytics>;

    async fn get_configuration(&self) -> RemoteResult<CanisterConfiguration>;

    async fn get_supported_tokens(&self) -> RemoteResult<Vec<TokenConfig>>;

    async fn list_modals(&self) -> RemoteResult<Vec<ModalConfig>>;

    async fn list_coupons(&self) -> RemoteResult<Vec<DiscountCoupon>>;

    async fn list_all_subscriptions(&self) -> RemoteResult<Vec<Subscription>>;

    async fn list_subscription_plans(&self) -> RemoteResult<Vec<SubscriptionPlan>>;

    async fn list_products(&self) -> RemoteResult<Vec<Product>>;

    /// Most recent transactions, newest first
    async fn recent_transactions(&self, limit: usize) -> RemoteResult<Vec<PaymentTransaction>>;
}

/// One reachable backend target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteSource {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub is_active: bool,
}

impl RemoteSource {
    /// Create a source with just an id and name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            owner: String::new(),
            version: 1,
            created_at: now,
            last_updated: now,
            is_active: true,
        }
    }
}

impl From<SourceRecord> for RemoteSource {
    fn from(record: SourceRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            owner: record.owner,
            version: record.version,
            created_at: record.created_at.to_datetime(),
            last_updated: record.last_updated.to_datetime(),
            is_active: record.is_active,
        }
    }
}

/// Opaque identity handed to the remote boundary
#[derive(Clone, Default)]
pub struct Credential {
    principal: String,
    token: Option<String>,
}

impl Credential {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            token: None,
        }
    }

    /// Attach a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Unauthenticated caller
    pub fn anonymous() -> Self {
        Self::new("2vxsx-fae")
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("principal", &self.principal)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Errors from the remote boundary
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote source unavailable")]
    Unavailable,

    #[error("Remote call timed out")]
    Timeout,

    #[error("Remote call rejected: {0}")]
    Rejected(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_record() {
        let record = SourceRecord {
            id: "rdmx6-jaaaa-aaaaa-aaadq-cai".to_string(),
            owner: "2vxsx-fae".to_string(),
            name: "Demo Payment System".to_string(),
            description: String::new(),
            version: 3,
            created_at: NanoTimestamp(1_700_000_000_000_000_000),
            last_updated: NanoTimestamp(1_700_000_360_000_000_000),
            is_active: true,
        };

        let source = RemoteSource::from(record);
        assert_eq!(source.version, 3);
        assert_eq!(source.created_at.timestamp(), 1_700_000_000);
        assert_eq!(source.last_updated.timestamp(), 1_700_000_360);
    }

    #[test]
    fn test_credential_debug_redacts_token() {
        let credential = Credential::new("aaaaa-aa").with_token("secret-token");
        let debug = format!("{:?}", credential);
        assert!(debug.contains("aaaaa-aa"));
        assert!(!debug.contains("secret-token"));
        assert_eq!(credential.token(), Some("secret-token"));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(RemoteError::Timeout.to_string(), "Remote call timed out");
        assert_eq!(
            RemoteError::Rejected("not owner".to_string()).to_string(),
            "Remote call rejected: not owner"
        );
    }
}
