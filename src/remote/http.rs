//! Canister Gateway Client
//!
//! HTTP client for a JSON gateway that fronts the factory and the user
//! payment canisters. Each read maps to one `GET` under
//! `/v1/sources/{id}/...`.

use super::types::{
    CanisterConfiguration, DiscountCoupon, ModalConfig, PaymentAnalytics, PaymentTransaction,
    Product, SourceRecord, Subscription, SubscriptionPlan, TokenConfig,
};
use super::{Credential, RemoteAccessor, RemoteError, RemoteResult, RemoteSource, SourceDirectory};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the gateway client
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL (e.g., "http://127.0.0.1:4943")
    pub base_url: String,
    /// Transport-level timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:4943".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Gateway-backed [`SourceDirectory`]
pub struct GatewayClient {
    client: Client,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Create a new gateway client with the given configuration
    pub fn new(config: GatewayConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn source_url(&self, source_id: &str) -> String {
        format!(
            "{}/v1/sources/{}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(source_id)
        )
    }
}

#[async_trait]
impl SourceDirectory for GatewayClient {
    async fn list_sources(&self, credential: &Credential) -> RemoteResult<Vec<RemoteSource>> {
        let url = format!("{}/v1/sources", self.config.base_url.trim_end_matches('/'));
        let records: Vec<SourceRecord> =
            get_json(authorize(self.client.get(&url), credential)).await?;

        Ok(records.into_iter().map(RemoteSource::from).collect())
    }

    async fn connect(
        &self,
        source: &RemoteSource,
        credential: &Credential,
    ) -> RemoteResult<Arc<dyn RemoteAccessor>> {
        let base = self.source_url(&source.id);
        let url = format!("{}/health", base);

        let response = authorize(self.client.get(&url), credential)
            .send()
            .await
            .map_err(map_transport)?;
        check_status(response).await?;

        tracing::debug!(source_id = %source.id, "Connected to payment canister");

        Ok(Arc::new(GatewayAccessor {
            client: self.client.clone(),
            base,
            credential: credential.clone(),
        }))
    }
}

/// Accessor bound to one source behind the gateway
struct GatewayAccessor {
    client: Client,
    base: String,
    credential: Credential,
}

impl GatewayAccessor {
    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str) -> RemoteResult<T> {
        let url = format!("{}/{}", self.base, endpoint);
        get_json(authorize(self.client.get(&url), &self.credential)).await
    }
}

#[async_trait]
impl RemoteAccessor for GatewayAccessor {
    async fn get_analytics(&self) -> RemoteResult<PaymentAnalytics> {
        self.fetch("analytics").await
    }

    async fn get_configuration(&self) -> RemoteResult<CanisterConfiguration> {
        self.fetch("configuration").await
    }

    async fn get_supported_tokens(&self) -> RemoteResult<Vec<TokenConfig>> {
        self.fetch("tokens").await
    }

    async fn list_modals(&self) -> RemoteResult<Vec<ModalConfig>> {
        self.fetch("modals").await
    }

    async fn list_coupons(&self) -> RemoteResult<Vec<DiscountCoupon>> {
        self.fetch("coupons").await
    }

    async fn list_all_subscriptions(&self) -> RemoteResult<Vec<Subscription>> {
        self.fetch("subscriptions").await
    }

    async fn list_subscription_plans(&self) -> RemoteResult<Vec<SubscriptionPlan>> {
        self.fetch("plans").await
    }

    async fn list_products(&self) -> RemoteResult<Vec<Product>> {
        self.fetch("products").await
    }

    async fn recent_transactions(&self, limit: usize) -> RemoteResult<Vec<PaymentTransaction>> {
        self.fetch(&format!("transactions?limit={}&offset=0", limit))
            .await
    }
}

fn authorize(request: RequestBuilder, credential: &Credential) -> RequestBuilder {
    let request = request.header("x-principal", credential.principal());
    match credential.token() {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> RemoteResult<T> {
    let response = request.send().await.map_err(map_transport)?;
    let response = check_status(response).await?;

    response
        .json()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

async fn check_status(response: reqwest::Response) -> RemoteResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::BAD_GATEWAY {
        return Err(RemoteError::Unavailable);
    }

    let text = response.text().await.unwrap_or_default();
    Err(RemoteError::Rejected(format!("{}: {}", status.as_u16(), text)))
}

fn map_transport(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else if e.is_connect() {
        RemoteError::Unavailable
    } else {
        RemoteError::Request(e)
    }
}
