//! Wire payloads returned by user payment canisters
//!
//! These mirror the canister interface one-to-one. Amounts are in the
//! token's smallest unit and every timestamp is a [`NanoTimestamp`];
//! the `model` module converts them before anything reaches a consumer.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Canister clock value: nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NanoTimestamp(pub u64);

impl NanoTimestamp {
    pub const NANOS_PER_MILLI: u64 = 1_000_000;

    /// Build from a millisecond epoch value (negative values clamp to the epoch)
    pub fn from_millis(millis: i64) -> Self {
        Self((millis.max(0) as u64).saturating_mul(Self::NANOS_PER_MILLI))
    }

    /// Millisecond epoch value
    pub fn as_millis(self) -> i64 {
        (self.0 / Self::NANOS_PER_MILLI) as i64
    }

    /// Conventional UTC time (serializes as ISO-8601)
    pub fn to_datetime(self) -> DateTime<Utc> {
        Utc.timestamp_nanos(i64::try_from(self.0).unwrap_or(i64::MAX))
    }
}

impl From<DateTime<Utc>> for NanoTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_millis(dt.timestamp_millis())
    }
}

/// A user payment canister as listed by the factory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRecord {
    pub id: String,
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: u64,
    pub created_at: NanoTimestamp,
    pub last_updated: NanoTimestamp,
    pub is_active: bool,
}

/// Token accepted by a canister
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenConfig {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub canister_id: String,
    pub fee: u64,
    #[serde(default)]
    pub logo: Option<String>,
    pub is_active: bool,
}

/// Aggregate payment analytics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PaymentAnalytics {
    pub total_transactions: u64,
    /// Volume per token symbol
    #[serde(default)]
    pub total_volume: Vec<(String, u64)>,
    pub success_rate: f64,
    #[serde(default)]
    pub average_amount: Vec<(String, u64)>,
    #[serde(default)]
    pub top_tokens: Vec<String>,
}

/// Canister-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CanisterConfiguration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub webhook: Option<String>,
    #[serde(default)]
    pub merchant_fee: f64,
    #[serde(default)]
    pub auto_withdraw: bool,
    #[serde(default)]
    pub withdraw_threshold: Option<u64>,
    #[serde(default)]
    pub custom_settings: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModalConfig {
    pub modal_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub allowed_tokens: Vec<String>,
    pub created_at: NanoTimestamp,
    pub updated_at: NanoTimestamp,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum CouponType {
    FreeShipping,
    /// Fixed discount in the token's smallest unit
    FixedAmount(u64),
    Percentage(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscountCoupon {
    pub coupon_id: String,
    pub code: String,
    pub coupon_type: CouponType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub minimum_amount: Option<u64>,
    #[serde(default)]
    pub applicable_tokens: Vec<String>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    pub used_count: u32,
    #[serde(default)]
    pub expires_at: Option<NanoTimestamp>,
    pub is_active: bool,
    pub created_at: NanoTimestamp,
    pub updated_at: NanoTimestamp,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Cancelled,
    Expired,
    PendingPayment,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BillingInterval {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    /// Custom period in seconds
    Custom(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub subscription_id: String,
    pub plan_id: String,
    pub subscriber: String,
    pub status: SubscriptionStatus,
    pub current_period_start: NanoTimestamp,
    pub current_period_end: NanoTimestamp,
    pub next_billing_date: NanoTimestamp,
    #[serde(default)]
    pub trial_end: Option<NanoTimestamp>,
    #[serde(default)]
    pub cancelled_at: Option<NanoTimestamp>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub total_payments: u64,
    #[serde(default)]
    pub payment_failures: u32,
    pub created_at: NanoTimestamp,
    pub updated_at: NanoTimestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionPlan {
    pub plan_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    pub token: String,
    pub billing_interval: BillingInterval,
    #[serde(default)]
    pub trial_period_days: Option<u32>,
    #[serde(default)]
    pub max_subscriptions: Option<u32>,
    #[serde(default)]
    pub features: Vec<String>,
    pub is_active: bool,
    pub created_at: NanoTimestamp,
    pub updated_at: NanoTimestamp,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProductStatus {
    Active,
    Inactive,
    OutOfStock,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    pub token_symbol: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub status: ProductStatus,
    #[serde(default)]
    pub inventory_count: Option<u32>,
    pub created_at: NanoTimestamp,
    pub updated_at: NanoTimestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed(String),
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentTransaction {
    pub id: String,
    pub from: String,
    pub to: String,
    pub token: String,
    pub amount: u64,
    pub fee: u64,
    #[serde(default)]
    pub merchant_fee: u64,
    pub timestamp: NanoTimestamp,
    pub status: TransactionStatus,
}
