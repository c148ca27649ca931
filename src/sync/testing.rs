//! Scripted in-memory backend for orchestrator tests

use crate::remote::{
    CanisterConfiguration, Credential, DiscountCoupon, ModalConfig, PaymentAnalytics,
    PaymentTransaction, Product, RemoteAccessor, RemoteError, RemoteResult, RemoteSource,
    SourceDirectory, Subscription, SubscriptionPlan, TokenConfig,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Which reads fail or hang, shared with every accessor the backend hands out
#[derive(Default)]
struct ReadScript {
    failing: Mutex<HashSet<&'static str>>,
    hanging: Mutex<HashSet<&'static str>>,
}

pub struct FakeBackend {
    sources: Mutex<Vec<RemoteSource>>,
    fail_list: AtomicBool,
    fail_connect: AtomicBool,
    list_delay: Mutex<Duration>,
    hold_next_list: Mutex<Option<Arc<Notify>>>,
    reads: Arc<ReadScript>,
    list_calls: AtomicUsize,
    connects: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeBackend {
    pub fn with_sources(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            sources: Mutex::new(
                ids.iter()
                    .map(|id| RemoteSource::new(*id, format!("Canister {}", id)))
                    .collect(),
            ),
            fail_list: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            list_delay: Mutex::new(Duration::ZERO),
            hold_next_list: Mutex::new(None),
            reads: Arc::new(ReadScript::default()),
            list_calls: AtomicUsize::new(0),
            connects: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = delay;
    }

    /// Make the next `list_sources` call wait until the returned gate is notified
    pub fn hold_next_list(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.hold_next_list.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn fail_read(&self, domain: &'static str) {
        self.reads.failing.lock().unwrap().insert(domain);
    }

    pub fn fail_all_reads(&self) {
        for domain in DOMAINS {
            self.fail_read(domain);
        }
    }

    pub fn hang_read(&self, domain: &'static str) {
        self.reads.hanging.lock().unwrap().insert(domain);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> Vec<String> {
        self.connects.lock().unwrap().clone()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

pub const DOMAINS: [&str; 9] = [
    "analytics",
    "configuration",
    "tokens",
    "modals",
    "coupons",
    "subscriptions",
    "plans",
    "products",
    "transactions",
];

#[async_trait]
impl SourceDirectory for FakeBackend {
    async fn list_sources(&self, _credential: &Credential) -> RemoteResult<Vec<RemoteSource>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let gate = self.hold_next_list.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let delay = *self.list_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_list.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable);
        }
        Ok(self.sources.lock().unwrap().clone())
    }

    async fn connect(
        &self,
        source: &RemoteSource,
        _credential: &Credential,
    ) -> RemoteResult<Arc<dyn RemoteAccessor>> {
        self.connects.lock().unwrap().push(source.id.clone());
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(RemoteError::Rejected("canister stopped".to_string()));
        }
        Ok(Arc::new(FakeAccessor {
            reads: Arc::clone(&self.reads),
        }))
    }
}

struct FakeAccessor {
    reads: Arc<ReadScript>,
}

impl FakeAccessor {
    async fn read<T>(&self, domain: &'static str, value: impl FnOnce() -> T) -> RemoteResult<T> {
        let hangs = self.reads.hanging.lock().unwrap().contains(domain);
        if hangs {
            std::future::pending::<()>().await;
        }
        let fails = self.reads.failing.lock().unwrap().contains(domain);
        if fails {
            return Err(RemoteError::Rejected(format!("{} unavailable", domain)));
        }
        Ok(value())
    }
}

#[async_trait]
impl RemoteAccessor for FakeAccessor {
    async fn get_analytics(&self) -> RemoteResult<PaymentAnalytics> {
        self.read("analytics", || PaymentAnalytics {
            total_transactions: 200,
            total_volume: vec![("ckBTC".to_string(), 1_500_000_000)],
            success_rate: 95.0,
            average_amount: vec![("ckBTC".to_string(), 7_500_000)],
            top_tokens: vec!["ckBTC".to_string()],
        })
        .await
    }

    async fn get_configuration(&self) -> RemoteResult<CanisterConfiguration> {
        self.read("configuration", || CanisterConfiguration {
            name: "Shop Canister".to_string(),
            merchant_fee: 2.5,
            ..Default::default()
        })
        .await
    }

    async fn get_supported_tokens(&self) -> RemoteResult<Vec<TokenConfig>> {
        self.read("tokens", || {
            vec![TokenConfig {
                symbol: "ckBTC".to_string(),
                name: "Chain Key Bitcoin".to_string(),
                decimals: 8,
                canister_id: "mxzaz-hqaaa-aaaar-qaada-cai".to_string(),
                fee: 10,
                logo: None,
                is_active: true,
            }]
        })
        .await
    }

    async fn list_modals(&self) -> RemoteResult<Vec<ModalConfig>> {
        self.read("modals", Vec::new).await
    }

    async fn list_coupons(&self) -> RemoteResult<Vec<DiscountCoupon>> {
        self.read("coupons", Vec::new).await
    }

    async fn list_all_subscriptions(&self) -> RemoteResult<Vec<Subscription>> {
        self.read("subscriptions", Vec::new).await
    }

    async fn list_subscription_plans(&self) -> RemoteResult<Vec<SubscriptionPlan>> {
        self.read("plans", Vec::new).await
    }

    async fn list_products(&self) -> RemoteResult<Vec<Product>> {
        self.read("products", Vec::new).await
    }

    async fn recent_transactions(&self, _limit: usize) -> RemoteResult<Vec<PaymentTransaction>> {
        self.read("transactions", Vec::new).await
    }
}
