//! Dashboard records
//!
//! Consumer-facing data published by the orchestrator. Timestamps are
//! always `DateTime<Utc>` (ISO-8601 on the wire) or millisecond epoch
//! integers, never canister nanoseconds. Live amounts stay in each token's
//! smallest unit, since a mixed-token total has no common scale.
//! Synthetic currency values carry two decimals; see [`round_cents`].

use crate::remote::{
    BillingInterval, CanisterConfiguration, CouponType, DiscountCoupon, ModalConfig,
    PaymentAnalytics, PaymentTransaction, Product, ProductStatus, RemoteSource, Subscription,
    SubscriptionPlan, SubscriptionStatus, TokenConfig, TransactionStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Plausible range for conversion rate (percent)
pub const CONVERSION_RATE_RANGE: (f64, f64) = (1.5, 6.0);

/// Plausible range for error rate (percent)
pub const ERROR_RATE_RANGE: (f64, f64) = (0.0, 25.0);

/// Round a currency value to two decimals
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Headline payment metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricsData {
    /// Successful payments
    pub payments: u64,
    /// Failed payments
    pub errors: u64,
    pub transactions: u64,
    pub revenue: f64,
    /// Percent, within [`CONVERSION_RATE_RANGE`] when known
    pub conversion_rate: f64,
    /// Percent, 0-100
    pub success_rate: f64,
    /// Percent, within [`ERROR_RATE_RANGE`]
    pub error_rate: f64,
    pub average_amount: f64,
    pub active_users: u64,
    pub top_tokens: Vec<String>,
    pub chart_data: Vec<ChartDataPoint>,
    pub trends: Trends,
}

impl MetricsData {
    /// Error rate for `errors` out of `transactions`, clamped
    pub fn error_rate_of(errors: u64, transactions: u64) -> f64 {
        if transactions == 0 {
            return 0.0;
        }
        let rate = errors as f64 / transactions as f64 * 100.0;
        rate.clamp(ERROR_RATE_RANGE.0, ERROR_RATE_RANGE.1)
    }
}

impl From<PaymentAnalytics> for MetricsData {
    fn from(analytics: PaymentAnalytics) -> Self {
        let transactions = analytics.total_transactions;
        let success_rate = if analytics.success_rate.is_finite() {
            analytics.success_rate.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let payments = ((transactions as f64) * success_rate / 100.0).round() as u64;
        let errors = transactions.saturating_sub(payments);

        let volume = analytics
            .total_volume
            .iter()
            .fold(0u64, |acc, (_, amount)| acc.saturating_add(*amount));
        let average = analytics
            .average_amount
            .first()
            .map(|(_, amount)| *amount)
            .unwrap_or(0);

        Self {
            payments,
            errors,
            transactions,
            revenue: volume as f64,
            conversion_rate: 0.0,
            success_rate,
            error_rate: Self::error_rate_of(errors, transactions),
            average_amount: average as f64,
            active_users: 0,
            top_tokens: analytics.top_tokens,
            chart_data: Vec::new(),
            trends: Trends::default(),
        }
    }
}

/// One day of activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartDataPoint {
    /// Calendar day, `YYYY-MM-DD`
    pub date: String,
    pub payments: u64,
    pub errors: u64,
    pub revenue: f64,
    pub users: u64,
    /// Start of day, milliseconds since epoch
    pub timestamp: i64,
}

/// Period-over-period change, in percent
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Trends {
    pub payments_change: f64,
    pub errors_change: f64,
    pub revenue_change: f64,
    pub users_change: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub const ALL: [Environment; 3] = [
        Environment::Development,
        Environment::Staging,
        Environment::Production,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Active,
    Inactive,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiKeyConfig {
    pub id: String,
    pub name: String,
    pub key: String,
    pub environment: Environment,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub permissions: Vec<String>,
    pub status: KeyStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    Active,
    Inactive,
    Error,
    Testing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointConfig {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub environment: Environment,
    pub status: EndpointStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub response_time_ms: Option<f64>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub user: String,
    pub ip: String,
}

/// Merchant configuration as shown on the settings tab
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigData {
    pub api_keys: Vec<ApiKeyConfig>,
    pub endpoints: Vec<EndpointConfig>,
    pub webhook_url: Option<String>,
    pub auto_withdraw: bool,
    pub merchant_fee: f64,
    pub audit_log: Vec<AuditLogEntry>,
    pub last_updated: DateTime<Utc>,
}

impl ConfigData {
    /// Configuration for a real source
    pub fn from_canister(source: &RemoteSource, config: CanisterConfiguration) -> Self {
        let name = if config.name.is_empty() {
            "User Payment Canister".to_string()
        } else {
            config.name
        };

        Self {
            api_keys: Vec::new(),
            endpoints: vec![EndpointConfig {
                id: source.id.clone(),
                name,
                url: None,
                environment: Environment::Production,
                status: EndpointStatus::Active,
                last_checked: None,
                response_time_ms: None,
                version: Some(format!("v{}", source.version)),
            }],
            webhook_url: config.webhook.filter(|url| !url.is_empty()),
            auto_withdraw: config.auto_withdraw,
            merchant_fee: config.merchant_fee.max(0.0),
            audit_log: Vec::new(),
            last_updated: source.last_updated,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Active,
    Inactive,
    Error,
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookData {
    pub id: String,
    pub name: String,
    pub url: String,
    pub events: Vec<String>,
    pub status: WebhookStatus,
    pub last_triggered: Option<DateTime<Utc>>,
    /// Percent
    pub success_rate: f64,
    pub response_time_ms: f64,
    pub created_at: DateTime<Utc>,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Completed,
    Pending,
    Failed,
    Cancelled,
    Refunded,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Payment,
    Refund,
    Withdrawal,
    Deposit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionData {
    pub id: String,
    pub tx_hash: Option<String>,
    pub amount: f64,
    pub token: String,
    pub status: TxStatus,
    pub kind: TxKind,
    pub user: String,
    pub timestamp: DateTime<Utc>,
    pub fee: f64,
    pub block_height: Option<u64>,
    pub confirmations: Option<u32>,
    pub description: String,
    pub failure_reason: Option<String>,
}

impl From<PaymentTransaction> for TransactionData {
    fn from(tx: PaymentTransaction) -> Self {
        let (status, failure_reason) = match tx.status {
            TransactionStatus::Pending => (TxStatus::Pending, None),
            TransactionStatus::Completed => (TxStatus::Completed, None),
            TransactionStatus::Failed(reason) => (TxStatus::Failed, Some(reason)),
            TransactionStatus::Refunded => (TxStatus::Refunded, None),
        };
        let amount = tx.amount as f64;

        Self {
            description: format!("Payment - {} {}", tx.amount, tx.token),
            id: tx.id,
            tx_hash: None,
            amount,
            token: tx.token,
            status,
            kind: TxKind::Payment,
            user: tx.from,
            timestamp: tx.timestamp.to_datetime(),
            fee: tx.fee.saturating_add(tx.merchant_fee) as f64,
            block_height: None,
            confirmations: None,
            failure_reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModalView {
    pub modal_id: String,
    pub name: String,
    pub description: Option<String>,
    pub template_id: Option<String>,
    pub allowed_tokens: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ModalConfig> for ModalView {
    fn from(modal: ModalConfig) -> Self {
        Self {
            modal_id: modal.modal_id,
            name: modal.name,
            description: modal.description,
            template_id: modal.template_id,
            allowed_tokens: modal.allowed_tokens,
            is_active: modal.is_active,
            created_at: modal.created_at.to_datetime(),
            updated_at: modal.updated_at.to_datetime(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CouponView {
    pub coupon_id: String,
    pub code: String,
    pub coupon_type: CouponType,
    pub description: String,
    pub minimum_amount: Option<u64>,
    pub applicable_tokens: Vec<String>,
    pub usage_limit: Option<u32>,
    pub used_count: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CouponView {
    /// Whether the coupon can still be redeemed at `now`
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.expires_at.map_or(true, |at| at > now)
            && self.usage_limit.map_or(true, |limit| self.used_count < limit)
    }
}

impl From<DiscountCoupon> for CouponView {
    fn from(coupon: DiscountCoupon) -> Self {
        Self {
            coupon_id: coupon.coupon_id,
            code: coupon.code,
            coupon_type: coupon.coupon_type,
            description: coupon.description,
            minimum_amount: coupon.minimum_amount,
            applicable_tokens: coupon.applicable_tokens,
            usage_limit: coupon.usage_limit,
            used_count: coupon.used_count,
            expires_at: coupon.expires_at.map(|ts| ts.to_datetime()),
            is_active: coupon.is_active,
            created_at: coupon.created_at.to_datetime(),
            updated_at: coupon.updated_at.to_datetime(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionView {
    pub subscription_id: String,
    pub plan_id: String,
    pub subscriber: String,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub next_billing_date: DateTime<Utc>,
    pub trial_end: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub total_payments: u64,
    pub payment_failures: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Subscription> for SubscriptionView {
    fn from(sub: Subscription) -> Self {
        Self {
            subscription_id: sub.subscription_id,
            plan_id: sub.plan_id,
            subscriber: sub.subscriber,
            status: sub.status,
            current_period_start: sub.current_period_start.to_datetime(),
            current_period_end: sub.current_period_end.to_datetime(),
            next_billing_date: sub.next_billing_date.to_datetime(),
            trial_end: sub.trial_end.map(|ts| ts.to_datetime()),
            cancelled_at: sub.cancelled_at.map(|ts| ts.to_datetime()),
            cancel_at_period_end: sub.cancel_at_period_end,
            total_payments: sub.total_payments,
            payment_failures: sub.payment_failures,
            created_at: sub.created_at.to_datetime(),
            updated_at: sub.updated_at.to_datetime(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanView {
    pub plan_id: String,
    pub name: String,
    pub description: String,
    pub price: u64,
    pub token: String,
    pub billing_interval: BillingInterval,
    pub trial_period_days: Option<u32>,
    pub max_subscriptions: Option<u32>,
    pub features: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubscriptionPlan> for PlanView {
    fn from(plan: SubscriptionPlan) -> Self {
        Self {
            plan_id: plan.plan_id,
            name: plan.name,
            description: plan.description,
            price: plan.price,
            token: plan.token,
            billing_interval: plan.billing_interval,
            trial_period_days: plan.trial_period_days,
            max_subscriptions: plan.max_subscriptions,
            features: plan.features,
            is_active: plan.is_active,
            created_at: plan.created_at.to_datetime(),
            updated_at: plan.updated_at.to_datetime(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductView {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub price: u64,
    pub token_symbol: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub status: ProductStatus,
    /// `None` means unlimited
    pub inventory_count: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductView {
    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Active && self.inventory_count.map_or(true, |n| n > 0)
    }
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            product_id: product.product_id,
            name: product.name,
            description: product.description,
            price: product.price,
            token_symbol: product.token_symbol,
            category: product.category,
            image_url: product.image_url,
            status: product.status,
            inventory_count: product.inventory_count,
            created_at: product.created_at.to_datetime(),
            updated_at: product.updated_at.to_datetime(),
        }
    }
}

/// One complete, immutable result of a synchronization cycle
///
/// Published behind an `Arc`; a new cycle replaces it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedSnapshot {
    pub analytics: Option<MetricsData>,
    pub config: Option<ConfigData>,
    pub webhooks: Option<Vec<WebhookData>>,
    pub tokens: Vec<TokenConfig>,
    pub modals: Vec<ModalView>,
    pub discounts: Vec<CouponView>,
    pub subscriptions: Vec<SubscriptionView>,
    pub subscription_plans: Vec<PlanView>,
    pub products: Vec<ProductView>,
    pub transactions: Vec<TransactionData>,
    pub sources: Vec<RemoteSource>,
    pub selected_source: Option<RemoteSource>,
    pub refreshed_at: DateTime<Utc>,
}

impl AggregatedSnapshot {
    /// Snapshot with no data in any domain
    pub fn empty(refreshed_at: DateTime<Utc>) -> Self {
        Self {
            analytics: None,
            config: None,
            webhooks: None,
            tokens: Vec::new(),
            modals: Vec::new(),
            discounts: Vec::new(),
            subscriptions: Vec::new(),
            subscription_plans: Vec::new(),
            products: Vec::new(),
            transactions: Vec::new(),
            sources: Vec::new(),
            selected_source: None,
            refreshed_at,
        }
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::NanoTimestamp;

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(12.346), 12.35);
        assert_eq!(round_cents(0.004), 0.0);
    }

    #[test]
    fn test_metrics_from_analytics() {
        let analytics = PaymentAnalytics {
            total_transactions: 200,
            total_volume: vec![
                ("ckBTC".to_string(), 150_000_000),
                ("ICP".to_string(), 50_000_000),
            ],
            success_rate: 95.0,
            average_amount: vec![("ckBTC".to_string(), 1_000_000)],
            top_tokens: vec!["ckBTC".to_string()],
        };

        let metrics = MetricsData::from(analytics);
        assert_eq!(metrics.transactions, 200);
        assert_eq!(metrics.payments, 190);
        assert_eq!(metrics.errors, 10);
        assert_eq!(metrics.revenue, 200_000_000.0);
        assert_eq!(metrics.average_amount, 1_000_000.0);
        assert!((metrics.error_rate - 5.0).abs() < 1e-9);
        assert_eq!(metrics.top_tokens, vec!["ckBTC"]);
    }

    #[test]
    fn test_revenue_sums_smallest_units_across_decimals() {
        let analytics = PaymentAnalytics {
            total_transactions: 2,
            total_volume: vec![
                ("ckETH".to_string(), 1_000_000_000_000_000_000),
                ("ICP".to_string(), 100_000_000),
            ],
            success_rate: 100.0,
            average_amount: vec![("ckETH".to_string(), 500_000_000_000_000_000)],
            top_tokens: vec!["ckETH".to_string(), "ICP".to_string()],
        };

        let metrics = MetricsData::from(analytics);
        assert_eq!(metrics.revenue, 1_000_000_000_100_000_000u64 as f64);
        assert_eq!(metrics.average_amount, 500_000_000_000_000_000u64 as f64);
    }

    #[test]
    fn test_metrics_clamps_bad_success_rate() {
        let analytics = PaymentAnalytics {
            total_transactions: 10,
            success_rate: 180.0,
            ..Default::default()
        };
        let metrics = MetricsData::from(analytics);
        assert_eq!(metrics.success_rate, 100.0);
        assert_eq!(metrics.errors, 0);

        let analytics = PaymentAnalytics {
            total_transactions: 10,
            success_rate: f64::NAN,
            ..Default::default()
        };
        let metrics = MetricsData::from(analytics);
        assert_eq!(metrics.payments, 0);
        assert_eq!(metrics.error_rate, ERROR_RATE_RANGE.1);
    }

    #[test]
    fn test_config_from_canister() {
        let source = RemoteSource::new("canister-1", "Shop");
        let config = ConfigData::from_canister(
            &source,
            CanisterConfiguration {
                webhook: Some(String::new()),
                merchant_fee: 2.5,
                ..Default::default()
            },
        );

        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].id, "canister-1");
        assert_eq!(config.endpoints[0].name, "User Payment Canister");
        assert_eq!(config.endpoints[0].environment, Environment::Production);
        assert!(config.webhook_url.is_none());
        assert_eq!(config.merchant_fee, 2.5);
    }

    #[test]
    fn test_coupon_redeemable() {
        let now = Utc::now();
        let coupon = CouponView::from(DiscountCoupon {
            coupon_id: "c1".to_string(),
            code: "SAVE10".to_string(),
            coupon_type: CouponType::Percentage(10.0),
            description: String::new(),
            minimum_amount: None,
            applicable_tokens: vec![],
            usage_limit: Some(5),
            used_count: 5,
            expires_at: None,
            is_active: true,
            created_at: NanoTimestamp::from(now),
            updated_at: NanoTimestamp::from(now),
        });

        assert!(!coupon.is_redeemable(now));
    }

    #[test]
    fn test_product_availability() {
        let now = NanoTimestamp::from(Utc::now());
        let product = |status, inventory_count| {
            ProductView::from(Product {
                product_id: "p1".to_string(),
                name: "Sticker".to_string(),
                description: String::new(),
                price: 100_000,
                token_symbol: "ICP".to_string(),
                category: None,
                image_url: None,
                status,
                inventory_count,
                created_at: now,
                updated_at: now,
            })
        };

        assert!(product(ProductStatus::Active, None).is_available());
        assert!(product(ProductStatus::Active, Some(3)).is_available());
        assert!(!product(ProductStatus::Active, Some(0)).is_available());
        assert!(!product(ProductStatus::OutOfStock, Some(3)).is_available());
        assert!(!product(ProductStatus::Inactive, None).is_available());
    }

    #[test]
    fn test_failed_transaction_keeps_reason() {
        let tx = TransactionData::from(PaymentTransaction {
            id: "tx1".to_string(),
            from: "alice".to_string(),
            to: "shop".to_string(),
            token: "ICP".to_string(),
            amount: 250_000_000,
            fee: 10_000,
            merchant_fee: 0,
            timestamp: NanoTimestamp::from_millis(1_700_000_000_000),
            status: TransactionStatus::Failed("insufficient funds".to_string()),
        });

        assert_eq!(tx.status, TxStatus::Failed);
        assert_eq!(tx.failure_reason.as_deref(), Some("insufficient funds"));
        assert_eq!(tx.amount, 250_000_000.0);
        assert_eq!(tx.fee, 10_000.0);
        assert_eq!(tx.description, "Payment - 250000000 ICP");
        assert_eq!(tx.timestamp.timestamp_millis(), 1_700_000_000_000);
    }
}
