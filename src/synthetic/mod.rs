//! Synthetic Data Generator
//!
//! Produces substitute dashboard data when the real backend is missing or
//! unreachable. The generated dataset is cached for a short TTL so repeated
//! requests see the same values, and regenerated lazily on the first
//! request after expiry.
//!
//! One generator is created at startup and shared (`Arc`) by every
//! orchestrator. Randomness is seeded from the generation time, so a given
//! dataset is reproducible from its `generated_at`.

mod metrics;
mod records;

pub use metrics::{generate_chart, generate_metrics, long_wave, short_wave, BaseMetrics, CHART_DAYS};
pub use records::{generate_config, generate_transactions, generate_webhooks};

use crate::model::{AggregatedSnapshot, ConfigData, MetricsData, TransactionData, WebhookData};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::RwLock;

const SEED: u64 = 12345;

/// Configuration for the synthetic generator
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// How long a generated dataset is served before regeneration
    pub cache_ttl_ms: u64,
    /// Number of synthetic transactions
    pub transaction_count: usize,
    pub base: BaseMetrics,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 30_000,
            transaction_count: 50,
            base: BaseMetrics::default(),
        }
    }
}

/// One generated set of dashboard data
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticDataset {
    pub metrics: MetricsData,
    pub config: ConfigData,
    pub webhooks: Vec<WebhookData>,
    pub transactions: Vec<TransactionData>,
    pub generated_at: DateTime<Utc>,
}

impl SyntheticDataset {
    /// Generate a dataset for `now`
    pub fn generate(config: &SyntheticConfig, now: DateTime<Utc>) -> Self {
        let mut rng = StdRng::seed_from_u64(SEED ^ now.timestamp_millis() as u64);

        Self {
            metrics: generate_metrics(&config.base, now, &mut rng),
            config: generate_config(&mut rng, now),
            webhooks: generate_webhooks(&mut rng, now),
            transactions: generate_transactions(&mut rng, now, config.transaction_count),
            generated_at: now,
        }
    }

    /// Whether this dataset may still be served at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.generated_at < ttl
    }

    /// Snapshot-shaped copy stamped with `refreshed_at`
    pub fn to_snapshot(&self, refreshed_at: DateTime<Utc>) -> AggregatedSnapshot {
        AggregatedSnapshot {
            analytics: Some(self.metrics.clone()),
            config: Some(self.config.clone()),
            webhooks: Some(self.webhooks.clone()),
            transactions: self.transactions.clone(),
            ..AggregatedSnapshot::empty(refreshed_at)
        }
    }
}

/// TTL-cached synthetic data source
pub struct SyntheticGenerator {
    config: SyntheticConfig,
    cache: RwLock<Option<Arc<SyntheticDataset>>>,
}

impl SyntheticGenerator {
    /// Create a new generator with the given configuration
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            cache: RwLock::new(None),
        }
    }

    /// Get the current configuration
    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    fn ttl(&self) -> Duration {
        Duration::milliseconds(self.config.cache_ttl_ms.min(i64::MAX as u64) as i64)
    }

    /// Cached dataset, regenerated if older than the TTL
    pub async fn dataset(&self) -> Arc<SyntheticDataset> {
        self.dataset_at(Utc::now()).await
    }

    /// [`dataset`](Self::dataset) evaluated at an explicit time
    pub async fn dataset_at(&self, now: DateTime<Utc>) -> Arc<SyntheticDataset> {
        let ttl = self.ttl();

        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.is_fresh(now, ttl) {
                return Arc::clone(cached);
            }
        }

        let fresh = Arc::new(SyntheticDataset::generate(&self.config, now));

        let mut cache = self.cache.write().await;
        // Another caller may have regenerated while we were generating
        if let Some(current) = cache.as_ref() {
            if current.is_fresh(now, ttl) {
                return Arc::clone(current);
            }
        }

        tracing::debug!(generated_at = %fresh.generated_at, "Regenerated synthetic dataset");
        *cache = Some(Arc::clone(&fresh));
        fresh
    }

    /// Snapshot built from the cached dataset, stamped with the current time
    pub async fn generate_snapshot(&self) -> AggregatedSnapshot {
        self.snapshot_at(Utc::now()).await
    }

    pub async fn snapshot_at(&self, now: DateTime<Utc>) -> AggregatedSnapshot {
        self.dataset_at(now).await.to_snapshot(now)
    }

    /// Drop the cached dataset
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new(SyntheticConfig::default())
    }
}
