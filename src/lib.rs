//! # ckPayment Dashboard
//!
//! Resilient data synchronization for the ckPayment merchant dashboard. Pulls
//! payment state from remote canisters, tolerates partial and total failure,
//! substitutes synthetic data when the backend is unreachable, polls on an
//! interval and reports a connection-health signal.
//!
//! ## Modules
//!
//! - [`remote`]: Remote accessor boundary and the HTTP gateway client
//! - [`model`]: Consumer-facing records and the aggregated snapshot
//! - [`synthetic`]: Synthetic data generator with a TTL cache
//! - [`health`]: Connection health tracker
//! - [`sync`]: Synchronization orchestrator and auto-refresh scheduler
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ckpay_dashboard::remote::{Credential, GatewayClient, GatewayConfig};
//! use ckpay_dashboard::sync::{DashboardSync, SyncOptions};
//! use ckpay_dashboard::synthetic::SyntheticGenerator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Arc::new(GatewayClient::new(GatewayConfig::default())?);
//!     let synthetic = Arc::new(SyntheticGenerator::default());
//!
//!     let sync = DashboardSync::new(
//!         gateway,
//!         Credential::anonymous(),
//!         synthetic,
//!         SyncOptions::default(),
//!     );
//!
//!     // Initial load; auto-refresh starts once data is published
//!     sync.load(false).await?;
//!
//!     let view = sync.view().await;
//!     println!("Status: {}", view.state.connection_status);
//!
//!     sync.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod health;
pub mod model;
pub mod remote;
pub mod sync;
pub mod synthetic;

// Re-export top-level types for convenience
pub use config::{Config, ConfigError};

pub use health::{ConnectionHealth, ConnectionQuality, ConnectionStatus};

pub use model::{AggregatedSnapshot, ConfigData, MetricsData, TransactionData, WebhookData};

pub use remote::{Credential, RemoteAccessor, RemoteError, RemoteSource, SourceDirectory};

pub use sync::{
    DashboardError, DashboardSync, DashboardView, ErrorKind, LoadOutcome, SyncOptions, SyncState,
};

pub use synthetic::{SyntheticConfig, SyntheticGenerator};
