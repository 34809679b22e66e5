//! RevenueCat backend adapter.
//!
//! Endpoints, relative to `base_url`:
//!
//! | method | path                | response                                                                |
//! |--------|---------------------|-------------------------------------------------------------------------|
//! | GET    | `/offerings`        | `{"current_offering_id","offerings":[{"identifier","metadata"}]}`       |
//! | GET    | `/products?ids=a,b` | `{"products":[{"identifier","price","subscription_period"}]}`           |
//! | POST   | `/purchases`        | `{"customer_info":{..}}` or `{"error":{"message"},"user_cancelled"}`    |
//! | POST   | `/restore`          | same as `/purchases`                                                    |
//! | GET    | `/customer_info`    | `{"customer_info":{"entitlements":{"<id>":{"is_active"}}}}`             |
//!
//! Periods are ISO-8601 strings (`P1M`, `P1Y`, ...); a missing period means non-renewing.

use crate::adapters::cache::ProductCache;
use crate::adapters::http::{build_client, into_operation, send_json};
use crate::config::RevenueCatConfig;
use crate::core::duration::parse_iso8601_period;
use crate::domain::model::CommerceFact;
use crate::domain::ports::BackendAdapter;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;

const BACKEND: &str = "revenuecat";

pub struct RevenueCatAdapter {
    config: RevenueCatConfig,
    client: Client,
    cache: Mutex<ProductCache>,
}

#[derive(Debug, Deserialize)]
struct OfferingsResponse {
    #[serde(default)]
    current_offering_id: Option<String>,
    #[serde(default)]
    offerings: Vec<Offering>,
}

#[derive(Debug, Deserialize)]
struct Offering {
    identifier: String,
    #[serde(default)]
    metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ProductsResponse {
    #[serde(default)]
    products: Vec<StoreProduct>,
}

#[derive(Debug, Deserialize)]
struct StoreProduct {
    identifier: String,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    subscription_period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CustomerInfo {
    #[serde(default)]
    entitlements: HashMap<String, Entitlement>,
}

#[derive(Debug, Deserialize)]
struct Entitlement {
    #[serde(default)]
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CustomerInfoResponse {
    #[serde(default)]
    customer_info: Option<CustomerInfo>,
    #[serde(default)]
    error: Option<ErrorBody>,
    #[serde(default)]
    user_cancelled: bool,
}

impl From<StoreProduct> for CommerceFact {
    fn from(product: StoreProduct) -> Self {
        let period = product.subscription_period.as_deref().and_then(|raw| {
            let parsed = parse_iso8601_period(raw);
            if parsed.is_none() {
                tracing::debug!(
                    "Unrecognised RevenueCat period '{}' for {}",
                    raw,
                    product.identifier
                );
            }
            parsed
        });
        let (unit, value) = match period {
            Some((unit, value)) => (Some(unit), value),
            None => (None, 0),
        };
        CommerceFact::new(product.identifier, product.price, unit, value)
    }
}

impl RevenueCatAdapter {
    pub fn new(config: RevenueCatConfig) -> Result<Self> {
        let client = build_client(BACKEND, config.timeout())?;
        Ok(Self {
            config,
            client,
            cache: Mutex::new(ProductCache::new()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn app_user_id(&self) -> &str {
        self.config.app_user_id.as_deref().unwrap_or("anonymous")
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .bearer_auth(&self.config.api_key)
            .query(&[("app_user_id", self.app_user_id())])
    }

    fn post(&self, path: &str, body: Value) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.config.api_key)
            .json(&body)
    }

    fn is_entitled(&self, info: &CustomerInfo) -> bool {
        info.entitlements
            .get(&self.config.entitlement_id)
            .is_some_and(|e| e.is_active)
    }

    /// 購買與恢復共用：錯誤、取消轉成 Operation，其餘回傳 entitlement 狀態
    fn resolve_customer_info(&self, response: CustomerInfoResponse, action: &str) -> Result<bool> {
        if response.user_cancelled {
            return Err(SyncError::operation(
                BACKEND,
                format!("{} cancelled by user", action),
            ));
        }
        if let Some(error) = response.error {
            return Err(SyncError::operation(BACKEND, error.message));
        }
        let info = response.customer_info.unwrap_or_default();
        Ok(self.is_entitled(&info))
    }

    async fn request_products(&self, product_ids: &[String]) -> Result<Vec<CommerceFact>> {
        let request = self
            .client
            .get(self.url("/products"))
            .bearer_auth(&self.config.api_key)
            .query(&[("ids", product_ids.join(","))]);
        let response: ProductsResponse = send_json(BACKEND, request).await?;
        Ok(response.products.into_iter().map(CommerceFact::from).collect())
    }
}

#[async_trait]
impl BackendAdapter for RevenueCatAdapter {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn start(&self) -> Result<()> {
        self.cache.lock().await.clear();
        tracing::info!(
            "🔌 RevenueCat adapter ready (entitlement '{}', user '{}')",
            self.config.entitlement_id,
            self.app_user_id()
        );
        Ok(())
    }

    /// 有 current offering 時只取它的 metadata，否則依序取全部 offering
    async fn fetch_fragments(&self) -> Result<Vec<Value>> {
        tracing::debug!("Fetching RevenueCat offerings from {}", self.url("/offerings"));
        let response: OfferingsResponse = send_json(BACKEND, self.get("/offerings")).await?;

        let current = response.current_offering_id.as_deref().and_then(|id| {
            response
                .offerings
                .iter()
                .position(|offering| offering.identifier == id)
        });

        let selected: Vec<Offering> = match current {
            Some(index) => response.offerings.into_iter().skip(index).take(1).collect(),
            None => response.offerings,
        };

        let mut fragments = Vec::with_capacity(selected.len());
        for offering in selected {
            match offering.metadata {
                Some(Value::Null) | None => {
                    tracing::debug!("Offering '{}' has no metadata", offering.identifier);
                }
                Some(metadata) => fragments.push(metadata),
            }
        }
        Ok(fragments)
    }

    async fn fetch_commerce_facts(
        &self,
        generation: u64,
        product_ids: &[String],
    ) -> Result<Vec<CommerceFact>> {
        let missing = {
            let mut cache = self.cache.lock().await;
            if cache.sync_generation(generation) {
                tracing::debug!(
                    "RevenueCat product cache invalidated for generation {}",
                    generation
                );
            }
            cache.missing(product_ids)
        };

        if missing.is_empty() {
            return Ok(self.cache.lock().await.collect(product_ids));
        }

        let fetched = self.request_products(&missing).await?;
        let mut cache = self.cache.lock().await;
        if cache.generation() != Some(generation) {
            return Ok(fetched);
        }
        cache.insert_all(fetched);
        Ok(cache.collect(product_ids))
    }

    async fn purchase(&self, product_id: &str) -> Result<bool> {
        let request = self.post(
            "/purchases",
            serde_json::json!({
                "app_user_id": self.app_user_id(),
                "product_id": product_id,
            }),
        );
        let response: CustomerInfoResponse = send_json(BACKEND, request)
            .await
            .map_err(|e| into_operation(BACKEND, e))?;
        self.resolve_customer_info(response, "Purchase")
    }

    async fn restore(&self) -> Result<bool> {
        let request = self.post(
            "/restore",
            serde_json::json!({ "app_user_id": self.app_user_id() }),
        );
        let response: CustomerInfoResponse = send_json(BACKEND, request)
            .await
            .map_err(|e| into_operation(BACKEND, e))?;
        self.resolve_customer_info(response, "Restore")
    }

    async fn check_entitlement(&self) -> Result<bool> {
        let response: CustomerInfoResponse =
            send_json(BACKEND, self.get("/customer_info")).await?;
        if let Some(error) = response.error {
            return Err(SyncError::fetch(BACKEND, error.message));
        }
        Ok(self.is_entitled(&response.customer_info.unwrap_or_default()))
    }
}
