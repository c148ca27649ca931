//! Synchronization Orchestrator
//!
//! Owns the refresh lifecycle of one dashboard: initial load, manual refetch,
//! interval-driven auto-refresh, supersession of stale loads, source
//! selection and fallback to synthetic data.
//!
//! ## Single flight
//!
//! Every load takes a generation number under the state lock when it begins
//! and compares it under the same lock when it commits. Starting a load
//! supersedes any load still in flight; the superseded load keeps running
//! until its remote calls settle, but its result is dropped without touching
//! state, snapshot or health.
//!
//! ## Publication
//!
//! Each state change is sent as one [`DashboardView`] on a `watch` channel,
//! so consumers never observe a snapshot from one cycle with the state of
//! another.

pub mod error;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use error::{DashboardError, ErrorContext, ErrorKind};
pub use scheduler::{RefreshPolicy, RefreshScheduler, TickFuture};

pub use crate::health::ConnectionStatus;

use crate::health::ConnectionHealth;
use crate::model::{AggregatedSnapshot, ConfigData, MetricsData};
use crate::remote::{
    CanisterConfiguration, Credential, DiscountCoupon, ModalConfig, PaymentAnalytics,
    PaymentTransaction, Product, RemoteAccessor, RemoteError, RemoteResult, RemoteSource,
    SourceDirectory, Subscription, SubscriptionPlan, TokenConfig,
};
use crate::synthetic::SyntheticGenerator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, RwLock, RwLockWriteGuard};

/// Orchestrator options
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Auto-refresh period
    pub refresh_interval: Duration,
    pub enable_auto_refresh: bool,
    /// Substitute synthetic data instead of surfacing whole-cycle failures
    pub fallback_to_synthetic: bool,
    /// Extra attempts after a whole-cycle failure
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    /// Limit for each individual remote call
    pub request_timeout: Duration,
    /// Number of recent transactions to read
    pub transaction_limit: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(30),
            enable_auto_refresh: true,
            fallback_to_synthetic: true,
            retry_attempts: 1,
            retry_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
            transaction_limit: 50,
        }
    }
}

/// Lifecycle flags of the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncState {
    /// A load without published data is in flight
    pub is_loading: bool,
    /// A refresh of already published data is in flight
    pub is_refreshing: bool,
    pub error: Option<DashboardError>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub connection_status: ConnectionStatus,
    pub is_using_synthetic_data: bool,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            is_loading: false,
            is_refreshing: false,
            error: None,
            last_refresh: None,
            connection_status: ConnectionStatus::Connecting,
            is_using_synthetic_data: false,
        }
    }
}

/// One consistent view of everything the orchestrator publishes
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub snapshot: Option<Arc<AggregatedSnapshot>>,
    pub state: SyncState,
    pub health: ConnectionHealth,
}

/// What a call to [`DashboardSync::load`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A snapshot was published
    Committed { synthetic: bool },
    /// A newer load started first; nothing was changed
    Superseded,
    /// No load was started
    Skipped,
}

struct Inner {
    snapshot: Option<Arc<AggregatedSnapshot>>,
    state: SyncState,
    health: ConnectionHealth,
    selected_source_id: Option<String>,
    has_initial_data: bool,
    generation: u64,
    shut_down: bool,
}

impl Inner {
    fn view(&self) -> DashboardView {
        DashboardView {
            snapshot: self.snapshot.clone(),
            state: self.state.clone(),
            health: self.health.clone(),
        }
    }

    fn in_flight(&self) -> bool {
        self.state.is_loading || self.state.is_refreshing
    }
}

/// Captured when a load begins
#[derive(Debug)]
struct Ticket {
    generation: u64,
    selected_source_id: Option<String>,
}

#[derive(Debug, Error)]
enum CycleError {
    #[error("No payment sources available")]
    NoSources,

    #[error("{stage} failed: {error}")]
    Remote {
        stage: &'static str,
        sources: Vec<RemoteSource>,
        target: Option<RemoteSource>,
        #[source]
        error: RemoteError,
    },
}

struct Failure {
    kind: ErrorKind,
    message: String,
    details: Option<String>,
}

enum Cycle {
    Live(AggregatedSnapshot),
    Synthetic {
        snapshot: AggregatedSnapshot,
        after_failure: bool,
    },
    Failed(Failure),
    Superseded,
}

/// Dashboard data synchronization for one mounted dashboard
///
/// Dropping the orchestrator stops its auto-refresh timer.
pub struct DashboardSync {
    shared: Arc<Shared>,
}

struct Shared {
    directory: Arc<dyn SourceDirectory>,
    credential: Credential,
    synthetic: Arc<SyntheticGenerator>,
    options: SyncOptions,
    inner: RwLock<Inner>,
    publisher: watch::Sender<DashboardView>,
    scheduler: RefreshScheduler,
    this: Weak<Shared>,
}

impl DashboardSync {
    /// Create an orchestrator; nothing is fetched until the first [`load`](Self::load)
    pub fn new(
        directory: Arc<dyn SourceDirectory>,
        credential: Credential,
        synthetic: Arc<SyntheticGenerator>,
        options: SyncOptions,
    ) -> Self {
        let policy = RefreshPolicy::new(options.refresh_interval, options.enable_auto_refresh);
        let inner = Inner {
            snapshot: None,
            state: SyncState::default(),
            health: ConnectionHealth::new(policy.interval_ms()),
            selected_source_id: None,
            has_initial_data: false,
            generation: 0,
            shut_down: false,
        };
        let (publisher, _) = watch::channel(inner.view());

        let shared = Arc::new_cyclic(|this| Shared {
            directory,
            credential,
            synthetic,
            options,
            inner: RwLock::new(inner),
            publisher,
            scheduler: RefreshScheduler::new(policy),
            this: this.clone(),
        });

        Self { shared }
    }

    /// Fetch a new snapshot, superseding any load in flight
    ///
    /// A whole-cycle failure is returned as `Err` only when fallback is
    /// disabled; the same error is recorded in [`SyncState::error`].
    pub async fn load(&self, is_refresh: bool) -> Result<LoadOutcome, DashboardError> {
        match self.shared.begin(is_refresh, false).await {
            Some(ticket) => self.shared.run(ticket).await,
            None => Ok(LoadOutcome::Skipped),
        }
    }

    pub async fn refetch(&self) -> Result<LoadOutcome, DashboardError> {
        self.load(true).await
    }

    /// Target a different source and reload
    ///
    /// Before the first load this only records the choice. Selecting the
    /// source already shown is a no-op.
    pub async fn select_source(
        &self,
        source_id: impl Into<String>,
    ) -> Result<LoadOutcome, DashboardError> {
        let source_id = source_id.into();

        let reload = {
            let mut inner = self.shared.inner.write().await;
            let shown = inner
                .snapshot
                .as_ref()
                .and_then(|snapshot| snapshot.selected_source.as_ref())
                .map(|source| source.id.clone());

            // A stored id may not have resolved, so compare against what is
            // shown unless a load for the stored id is still in flight
            let current = if inner.in_flight() {
                inner.selected_source_id.clone().or(shown)
            } else {
                shown.or_else(|| inner.selected_source_id.clone())
            };
            let changed = current.as_deref() != Some(source_id.as_str());

            tracing::info!(source_id = %source_id, changed, "Source selected");
            inner.selected_source_id = Some(source_id);
            changed && (inner.has_initial_data || inner.in_flight())
        };

        if reload {
            self.load(false).await
        } else {
            Ok(LoadOutcome::Skipped)
        }
    }

    /// Dismiss the current error
    pub async fn clear_error(&self) {
        let mut inner = self.shared.inner.write().await;
        if inner.state.error.take().is_some() {
            self.shared.publish(&inner);
        }
    }

    /// Change the auto-refresh period or enable flag, rebuilding the timer
    pub async fn set_refresh_policy(&self, interval: Duration, enabled: bool) {
        let policy = RefreshPolicy::new(interval, enabled);
        self.shared.scheduler.reschedule(policy);

        let mut inner = self.shared.inner.write().await;
        inner.health = inner.health.with_update_frequency(policy.interval_ms());
        self.shared.publish(&inner);
    }

    /// Stop auto-refresh and supersede any load in flight
    pub async fn shutdown(&self) {
        self.shared.scheduler.stop();

        let mut inner = self.shared.inner.write().await;
        inner.shut_down = true;
        inner.generation += 1;
        inner.state.is_loading = false;
        inner.state.is_refreshing = false;
        self.shared.publish(&inner);

        tracing::info!("Dashboard sync shut down");
    }

    /// Receive every published view
    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.shared.publisher.subscribe()
    }

    pub async fn view(&self) -> DashboardView {
        self.shared.inner.read().await.view()
    }

    pub async fn snapshot(&self) -> Option<Arc<AggregatedSnapshot>> {
        self.shared.inner.read().await.snapshot.clone()
    }

    pub async fn state(&self) -> SyncState {
        self.shared.inner.read().await.state.clone()
    }

    pub async fn health(&self) -> ConnectionHealth {
        self.shared.inner.read().await.health.clone()
    }

    pub async fn selected_source_id(&self) -> Option<String> {
        self.shared.inner.read().await.selected_source_id.clone()
    }

    pub fn options(&self) -> &SyncOptions {
        &self.shared.options
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.shared.scheduler.policy()
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.shared.scheduler.is_running()
    }
}

impl Drop for DashboardSync {
    fn drop(&mut self) {
        self.shared.scheduler.stop();
    }
}

impl Shared {
    /// Claim a new generation and mark the load in flight
    ///
    /// With `only_when_idle` the claim is refused unless the previous cycle
    /// has completed and the connection is up.
    async fn begin(&self, is_refresh: bool, only_when_idle: bool) -> Option<Ticket> {
        let mut inner = self.inner.write().await;
        if inner.shut_down {
            return None;
        }
        if only_when_idle && (inner.in_flight() || !inner.state.connection_status.is_connected()) {
            return None;
        }

        if inner.in_flight() {
            tracing::debug!(
                generation = inner.generation,
                kind = %ErrorKind::Cancelled,
                "Superseding in-flight load"
            );
        }
        inner.generation += 1;

        // A refresh before any data was published is an initial load
        let refreshing = is_refresh && inner.has_initial_data;
        inner.state.is_loading = !refreshing;
        inner.state.is_refreshing = refreshing;

        if !(refreshing && inner.state.connection_status.is_connected()) {
            inner.state.connection_status = ConnectionStatus::Connecting;
            inner.health = inner
                .health
                .observe(ConnectionStatus::Connecting, false, Utc::now());
        }
        self.publish(&inner);

        Some(Ticket {
            generation: inner.generation,
            selected_source_id: inner.selected_source_id.clone(),
        })
    }

    async fn run(&self, ticket: Ticket) -> Result<LoadOutcome, DashboardError> {
        let cycle = self.fetch_cycle(&ticket).await;
        self.commit(ticket, cycle).await
    }

    async fn fetch_cycle(&self, ticket: &Ticket) -> Cycle {
        let mut attempt = 0;

        let failure = loop {
            match self.attempt(ticket).await {
                Ok(snapshot) => return Cycle::Live(snapshot),
                Err(CycleError::NoSources) => break CycleError::NoSources,
                Err(e) if attempt < self.options.retry_attempts => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "Dashboard load failed, retrying");
                    tokio::time::sleep(self.options.retry_delay).await;

                    if self.inner.read().await.generation != ticket.generation {
                        return Cycle::Superseded;
                    }
                }
                Err(e) => break e,
            }
        };

        self.resolve_failure(failure).await
    }

    /// One pass over the remote boundary
    async fn attempt(&self, ticket: &Ticket) -> Result<AggregatedSnapshot, CycleError> {
        let limit = self.options.request_timeout;

        let sources = timed(limit, self.directory.list_sources(&self.credential))
            .await
            .map_err(|error| CycleError::Remote {
                stage: "list_sources",
                sources: Vec::new(),
                target: None,
                error,
            })?;

        let target = match select_target(&sources, ticket.selected_source_id.as_deref()) {
            Some(target) => target,
            None => return Err(CycleError::NoSources),
        };

        let accessor = match timed(limit, self.directory.connect(&target, &self.credential)).await
        {
            Ok(accessor) => accessor,
            Err(error) => {
                return Err(CycleError::Remote {
                    stage: "connect",
                    sources,
                    target: Some(target),
                    error,
                })
            }
        };

        let reads = DomainReads::fetch(
            accessor.as_ref(),
            limit,
            self.options.transaction_limit,
            &target.id,
        )
        .await;

        if reads.failures().len() == DomainReads::COUNT {
            return Err(CycleError::Remote {
                stage: "domain reads",
                sources,
                target: Some(target),
                error: reads.into_first_error(),
            });
        }

        Ok(reads.into_snapshot(sources, target, Utc::now()))
    }

    async fn resolve_failure(&self, failure: CycleError) -> Cycle {
        let fallback = self.options.fallback_to_synthetic;

        match failure {
            CycleError::NoSources if fallback => {
                tracing::info!("No payment sources found, using synthetic data");
                Cycle::Synthetic {
                    snapshot: self.synthetic.generate_snapshot().await,
                    after_failure: false,
                }
            }
            CycleError::NoSources => {
                tracing::warn!("No payment sources found");
                Cycle::Failed(Failure {
                    kind: ErrorKind::NoSource,
                    message: "No payment sources available".to_string(),
                    details: None,
                })
            }
            CycleError::Remote {
                stage,
                sources,
                target,
                error,
            } if fallback => {
                tracing::warn!(stage, error = %error, "Dashboard load failed, using synthetic data");
                Cycle::Synthetic {
                    snapshot: AggregatedSnapshot {
                        sources,
                        selected_source: target,
                        ..self.synthetic.generate_snapshot().await
                    },
                    after_failure: true,
                }
            }
            CycleError::Remote {
                stage,
                target,
                error,
                ..
            } => {
                tracing::error!(stage, error = %error, "Dashboard load failed");
                let details = match target {
                    Some(target) => format!("{} failed for source {}", stage, target.id),
                    None => format!("{} failed", stage),
                };
                Cycle::Failed(Failure {
                    kind: ErrorKind::Network,
                    message: error.to_string(),
                    details: Some(details),
                })
            }
        }
    }

    async fn commit(&self, ticket: Ticket, cycle: Cycle) -> Result<LoadOutcome, DashboardError> {
        let mut inner = self.inner.write().await;

        if inner.generation != ticket.generation {
            tracing::debug!(
                generation = ticket.generation,
                latest = inner.generation,
                kind = %ErrorKind::Cancelled,
                "Discarding superseded load"
            );
            return Ok(LoadOutcome::Superseded);
        }

        inner.state.is_loading = false;
        inner.state.is_refreshing = false;
        let now = Utc::now();

        match cycle {
            Cycle::Live(snapshot) => Ok(self.commit_snapshot(inner, snapshot, false, false, now)),
            Cycle::Synthetic {
                snapshot,
                after_failure,
            } => Ok(self.commit_snapshot(inner, snapshot, true, after_failure, now)),
            Cycle::Failed(failure) => Err(self.commit_failure(inner, failure, now)),
            Cycle::Superseded => Ok(LoadOutcome::Superseded),
        }
    }

    fn commit_snapshot(
        &self,
        mut inner: RwLockWriteGuard<'_, Inner>,
        snapshot: AggregatedSnapshot,
        synthetic: bool,
        after_failure: bool,
        now: DateTime<Utc>,
    ) -> LoadOutcome {
        let source_id = snapshot.selected_source.as_ref().map(|s| s.id.clone());

        inner.snapshot = Some(snapshot.into_shared());
        inner.state.connection_status = ConnectionStatus::Connected;
        inner.state.error = None;
        inner.state.last_refresh = Some(now);
        inner.state.is_using_synthetic_data = synthetic;
        inner.health = inner
            .health
            .observe(ConnectionStatus::Connected, after_failure, now);

        let first = !inner.has_initial_data;
        inner.has_initial_data = true;
        self.publish(&inner);
        drop(inner);

        tracing::info!(
            source_id = ?source_id,
            synthetic,
            "Dashboard snapshot published"
        );

        if first {
            self.start_auto_refresh();
        }
        LoadOutcome::Committed { synthetic }
    }

    fn commit_failure(
        &self,
        mut inner: RwLockWriteGuard<'_, Inner>,
        failure: Failure,
        now: DateTime<Utc>,
    ) -> DashboardError {
        let status = match failure.kind {
            ErrorKind::NoSource => ConnectionStatus::Disconnected,
            _ => ConnectionStatus::Error,
        };
        let context = ErrorContext {
            selected_source_id: inner.selected_source_id.clone(),
            refresh_interval_ms: self.scheduler.policy().interval_ms(),
            fallback_enabled: self.options.fallback_to_synthetic,
            using_synthetic_data: inner.state.is_using_synthetic_data,
        };
        let error = DashboardError::new(failure.kind, failure.message, failure.details, context);

        inner.state.connection_status = status;
        inner.state.error = Some(error.clone());
        inner.health = inner.health.observe(status, true, now);
        self.publish(&inner);

        error
    }

    fn publish(&self, inner: &Inner) {
        self.publisher.send_replace(inner.view());
    }

    fn start_auto_refresh(&self) {
        let this = self.this.clone();
        self.scheduler.start(move || {
            let this = this.clone();
            Box::pin(async move {
                match this.upgrade() {
                    Some(shared) => {
                        shared.auto_refresh().await;
                        true
                    }
                    None => false,
                }
            }) as TickFuture
        });
    }

    async fn auto_refresh(&self) {
        let ticket = match self.begin(true, true).await {
            Some(ticket) => ticket,
            None => {
                tracing::debug!("Skipping auto-refresh tick");
                return;
            }
        };

        if let Err(e) = self.run(ticket).await {
            tracing::warn!(error = %e, "Auto-refresh failed");
        }
    }
}

/// Explicitly selected source, else the first one
fn select_target(sources: &[RemoteSource], selected: Option<&str>) -> Option<RemoteSource> {
    if let Some(id) = selected {
        if let Some(source) = sources.iter().find(|source| source.id == id) {
            return Some(source.clone());
        }
        if !sources.is_empty() {
            tracing::warn!(source_id = %id, "Selected source not found, using first available");
        }
    }
    sources.first().cloned()
}

async fn timed<T>(limit: Duration, call: impl Future<Output = RemoteResult<T>>) -> RemoteResult<T> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(RemoteError::Timeout))
}

/// Results of the per-source reads, each settled independently
struct DomainReads {
    analytics: RemoteResult<PaymentAnalytics>,
    configuration: RemoteResult<CanisterConfiguration>,
    tokens: RemoteResult<Vec<TokenConfig>>,
    modals: RemoteResult<Vec<ModalConfig>>,
    coupons: RemoteResult<Vec<DiscountCoupon>>,
    subscriptions: RemoteResult<Vec<Subscription>>,
    plans: RemoteResult<Vec<SubscriptionPlan>>,
    products: RemoteResult<Vec<Product>>,
    transactions: RemoteResult<Vec<PaymentTransaction>>,
}

impl DomainReads {
    const COUNT: usize = 9;

    async fn fetch(
        accessor: &dyn RemoteAccessor,
        limit: Duration,
        transaction_limit: usize,
        source_id: &str,
    ) -> Self {
        let (
            analytics,
            configuration,
            tokens,
            modals,
            coupons,
            subscriptions,
            plans,
            products,
            transactions,
        ) = tokio::join!(
            timed(limit, accessor.get_analytics()),
            timed(limit, accessor.get_configuration()),
            timed(limit, accessor.get_supported_tokens()),
            timed(limit, accessor.list_modals()),
            timed(limit, accessor.list_coupons()),
            timed(limit, accessor.list_all_subscriptions()),
            timed(limit, accessor.list_subscription_plans()),
            timed(limit, accessor.list_products()),
            timed(limit, accessor.recent_transactions(transaction_limit)),
        );

        let reads = Self {
            analytics,
            configuration,
            tokens,
            modals,
            coupons,
            subscriptions,
            plans,
            products,
            transactions,
        };

        for (domain, error) in reads.failures() {
            tracing::warn!(source_id = %source_id, domain, error = %error, "Domain read failed");
        }
        reads
    }

    fn failures(&self) -> Vec<(&'static str, &RemoteError)> {
        [
            ("analytics", self.analytics.as_ref().err()),
            ("configuration", self.configuration.as_ref().err()),
            ("tokens", self.tokens.as_ref().err()),
            ("modals", self.modals.as_ref().err()),
            ("coupons", self.coupons.as_ref().err()),
            ("subscriptions", self.subscriptions.as_ref().err()),
            ("plans", self.plans.as_ref().err()),
            ("products", self.products.as_ref().err()),
            ("transactions", self.transactions.as_ref().err()),
        ]
        .into_iter()
        .filter_map(|(domain, error)| error.map(|error| (domain, error)))
        .collect()
    }

    fn into_first_error(self) -> RemoteError {
        match self.analytics {
            Err(e) => e,
            Ok(_) => RemoteError::Unavailable,
        }
    }

    fn into_snapshot(
        self,
        sources: Vec<RemoteSource>,
        target: RemoteSource,
        refreshed_at: DateTime<Utc>,
    ) -> AggregatedSnapshot {
        AggregatedSnapshot {
            analytics: self.analytics.ok().map(MetricsData::from),
            config: self
                .configuration
                .ok()
                .map(|config| ConfigData::from_canister(&target, config)),
            webhooks: Some(Vec::new()),
            tokens: self.tokens.unwrap_or_default(),
            modals: views(self.modals),
            discounts: views(self.coupons),
            subscriptions: views(self.subscriptions),
            subscription_plans: views(self.plans),
            products: views(self.products),
            transactions: views(self.transactions),
            sources,
            selected_source: Some(target),
            refreshed_at,
        }
    }
}

fn views<T, V: From<T>>(result: RemoteResult<Vec<T>>) -> Vec<V> {
    result
        .map(|items| items.into_iter().map(V::from).collect())
        .unwrap_or_default()
}
