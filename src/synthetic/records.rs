//! Synthetic configuration, webhook and transaction records

use crate::model::{
    round_cents, ApiKeyConfig, AuditLogEntry, ConfigData, EndpointConfig, EndpointStatus,
    Environment, KeyStatus, TransactionData, TxKind, TxStatus, WebhookData, WebhookStatus,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

const PERMISSIONS: [&str; 5] = [
    "read_metrics",
    "write_config",
    "manage_webhooks",
    "admin_access",
    "read_logs",
];

const ENDPOINTS: [(&str, &str); 4] = [
    ("Main Canister", "main"),
    ("Payment Processor", "payments"),
    ("User Management", "users"),
    ("Analytics Engine", "analytics"),
];

const AUDIT_ACTIONS: [&str; 7] = [
    "API key created",
    "Configuration updated",
    "Webhook created",
    "User login",
    "Password changed",
    "Webhook deleted",
    "Endpoint tested",
];

const AUDIT_USERS: [&str; 3] = [
    "john.doe@example.com",
    "jane.smith@example.com",
    "admin@example.com",
];

const AUDIT_IPS: [&str; 3] = ["192.168.1.100", "10.0.0.50", "203.0.113.25"];

const WEBHOOK_NAMES: [&str; 6] = [
    "Payment Notifications",
    "User Registration Hook",
    "Transaction Logger",
    "Error Reporting",
    "Analytics Tracker",
    "Backup System",
];

const WEBHOOK_EVENTS: [&str; 4] = [
    "payment.completed",
    "payment.failed",
    "user.created",
    "transaction.created",
];

const TOKENS: [&str; 4] = ["ckBTC", "ckETH", "ICP", "USD"];

const PRINCIPALS: [&str; 3] = [
    "rdmx6-jaaaa-aaaah-qcaiq-cai",
    "rrkah-fqaaa-aaaah-qcaiq-cai",
    "ryjl3-tyaaa-aaaah-qcaiq-cai",
];

fn pick<'a, T, R: Rng>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

fn record_id<R: Rng>(rng: &mut R) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

fn short_token<R: Rng>(rng: &mut R) -> String {
    record_id(rng).simple().to_string()[..12].to_string()
}

fn minutes_back<R: Rng>(rng: &mut R, now: DateTime<Utc>, max_minutes: i64) -> DateTime<Utc> {
    now - Duration::minutes(rng.gen_range(0..max_minutes.max(1)))
}

pub fn generate_config<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> ConfigData {
    ConfigData {
        api_keys: generate_api_keys(rng, now),
        endpoints: generate_endpoints(rng, now),
        webhook_url: Some("https://api.example.com/webhooks/notifications".to_string()),
        auto_withdraw: false,
        merchant_fee: 2.5,
        audit_log: generate_audit_log(rng, now),
        last_updated: now,
    }
}

fn generate_api_keys<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Vec<ApiKeyConfig> {
    let count = rng.gen_range(3..=7);
    let statuses = [KeyStatus::Active, KeyStatus::Inactive, KeyStatus::Expired];

    (0..count)
        .map(|i| {
            let env = *pick(rng, &Environment::ALL);
            let granted = rng.gen_range(1..=PERMISSIONS.len());
            ApiKeyConfig {
                id: format!("key_{}", short_token(rng)),
                name: format!("{} API Key {}", capitalize(env.as_str()), i + 1),
                key: format!("ck_{}_{}", env.as_str(), short_token(rng)),
                environment: env,
                created_at: minutes_back(rng, now, 90 * 24 * 60),
                last_used: Some(minutes_back(rng, now, 7 * 24 * 60)),
                permissions: PERMISSIONS[..granted].iter().map(|p| p.to_string()).collect(),
                status: *pick(rng, &statuses),
            }
        })
        .collect()
}

fn generate_endpoints<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Vec<EndpointConfig> {
    let statuses = [
        EndpointStatus::Active,
        EndpointStatus::Inactive,
        EndpointStatus::Error,
        EndpointStatus::Testing,
    ];

    ENDPOINTS
        .iter()
        .flat_map(|(name, path)| Environment::ALL.iter().map(move |env| (name, path, env)))
        .map(|(name, path, env)| EndpointConfig {
            id: format!("endpoint_{}_{}", path, env.as_str()),
            name: format!("{} ({})", name, env.as_str()),
            url: Some(format!("https://{}-{}.ic0.app", path, env.as_str())),
            environment: *env,
            status: *pick(rng, &statuses),
            last_checked: Some(minutes_back(rng, now, 60)),
            response_time_ms: Some(rng.gen_range(100.0..1100.0)),
            version: Some(format!(
                "v{}.{}.{}",
                rng.gen_range(1..=3),
                rng.gen_range(0..10),
                rng.gen_range(0..10)
            )),
        })
        .collect()
}

fn generate_audit_log<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Vec<AuditLogEntry> {
    let count = rng.gen_range(10..30);
    let mut entries: Vec<AuditLogEntry> = (0..count)
        .map(|i| AuditLogEntry {
            id: format!("audit_{}", i + 1),
            timestamp: minutes_back(rng, now, 7 * 24 * 60),
            action: pick(rng, &AUDIT_ACTIONS).to_string(),
            user: pick(rng, &AUDIT_USERS).to_string(),
            ip: pick(rng, &AUDIT_IPS).to_string(),
        })
        .collect();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries
}

pub fn generate_webhooks<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Vec<WebhookData> {
    let count = rng.gen_range(3..=WEBHOOK_NAMES.len());
    let statuses = [
        WebhookStatus::Active,
        WebhookStatus::Inactive,
        WebhookStatus::Error,
        WebhookStatus::Paused,
    ];

    WEBHOOK_NAMES[..count]
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let subscribed = rng.gen_range(1..=WEBHOOK_EVENTS.len());
            WebhookData {
                id: format!("webhook_{}", short_token(rng)),
                name: name.to_string(),
                url: format!("https://api.example{}.com/webhooks/receive", i + 1),
                events: WEBHOOK_EVENTS[..subscribed].iter().map(|e| e.to_string()).collect(),
                status: *pick(rng, &statuses),
                last_triggered: Some(minutes_back(rng, now, 24 * 60)),
                success_rate: rng.gen_range(70.0..100.0),
                response_time_ms: rng.gen_range(100.0..600.0),
                created_at: minutes_back(rng, now, 60 * 24 * 60),
                max_retries: rng.gen_range(3..=5),
                retry_delay_ms: rng.gen_range(1_000..3_000),
            }
        })
        .collect()
}

/// `count` transactions from the last 30 days, newest first
pub fn generate_transactions<R: Rng>(
    rng: &mut R,
    now: DateTime<Utc>,
    count: usize,
) -> Vec<TransactionData> {
    let statuses = [
        TxStatus::Completed,
        TxStatus::Pending,
        TxStatus::Failed,
        TxStatus::Cancelled,
    ];
    let kinds = [TxKind::Payment, TxKind::Refund, TxKind::Withdrawal, TxKind::Deposit];

    let mut transactions: Vec<TransactionData> = (0..count)
        .map(|i| {
            let token = *pick(rng, &TOKENS);
            let status = *pick(rng, &statuses);
            let kind = *pick(rng, &kinds);
            let (amount, fee) = token_amount(rng, token);
            let completed = status == TxStatus::Completed;

            TransactionData {
                id: format!("tx_{}_{:03}", short_token(rng), i),
                tx_hash: rng
                    .gen_bool(0.7)
                    .then(|| format!("0x{}", record_id(rng).simple())),
                amount,
                token: token.to_string(),
                status,
                kind,
                user: pick(rng, &PRINCIPALS).to_string(),
                timestamp: minutes_back(rng, now, 30 * 24 * 60),
                fee,
                block_height: rng
                    .gen_bool(0.8)
                    .then(|| rng.gen_range(5_000_000..6_000_000)),
                confirmations: completed.then(|| rng.gen_range(6..106)),
                description: format!("{} - {:.6} {}", describe(kind), amount, token),
                failure_reason: (status == TxStatus::Failed)
                    .then(|| "Connection timeout".to_string()),
            }
        })
        .collect();

    transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    transactions
}

/// Amount and fee using each token's realistic range and fee rule
fn token_amount<R: Rng>(rng: &mut R, token: &str) -> (f64, f64) {
    let (amount, fee) = match token {
        "ckBTC" => {
            let amount = rng.gen_range(0.001..2.001);
            (amount, amount * 0.001)
        }
        "ckETH" => {
            let amount = rng.gen_range(0.01..50.01);
            (amount, amount * 0.002)
        }
        "ICP" => {
            let amount = rng.gen_range(1.0..1001.0);
            (amount, amount * 0.001)
        }
        _ => {
            let amount = round_cents(rng.gen_range(10.0..10_010.0));
            (amount, round_cents((amount * 0.029).max(0.5)))
        }
    };

    (round6(amount), round6(fee))
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

fn describe(kind: TxKind) -> &'static str {
    match kind {
        TxKind::Payment => "Payment for premium subscription",
        TxKind::Refund => "Refund for cancelled order",
        TxKind::Withdrawal => "Withdrawal to external wallet",
        TxKind::Deposit => "Deposit from external wallet",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
