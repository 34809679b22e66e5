//! Apphud backend adapter.
//!
//! Endpoints, relative to `base_url`:
//!
//! | method | path                   | response                                                        |
//! |--------|------------------------|-----------------------------------------------------------------|
//! | GET    | `/placements`          | `{"placements":[{"identifier","paywall":{"json","products"}}]}` |
//! | GET    | `/products?ids=a,b`    | `{"products":[{"product_id","price","subscription_period"}]}`   |
//! | POST   | `/purchases`           | `{"subscription":{"is_active"},"non_renewing_purchase","error"}`|
//! | POST   | `/restore`             | `{"has_active_subscription","error"}`                           |
//! | GET    | `/subscription_status` | `{"has_active_subscription"}`                                   |
//!
//! `subscription_period` is either a StoreKit-style name (`monthly`, `everyTwoMonths`, ...), a
//! `{unit, value}` object, an ISO-8601 string, or null for non-renewing products.

use crate::adapters::cache::ProductCache;
use crate::adapters::http::{build_client, into_operation, send_json};
use crate::config::ApphudConfig;
use crate::core::duration::parse_iso8601_period;
use crate::domain::model::{CommerceFact, PeriodUnit};
use crate::domain::ports::BackendAdapter;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

const BACKEND: &str = "apphud";

pub struct ApphudAdapter {
    config: ApphudConfig,
    client: Client,
    cache: Mutex<ProductCache>,
}

#[derive(Debug, Deserialize)]
struct PlacementsResponse {
    #[serde(default)]
    placements: Vec<Placement>,
}

#[derive(Debug, Deserialize)]
struct Placement {
    identifier: String,
    #[serde(default)]
    paywall: Option<Paywall>,
}

#[derive(Debug, Deserialize)]
struct Paywall {
    #[serde(default)]
    json: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ProductsResponse {
    #[serde(default)]
    products: Vec<StoreProduct>,
}

#[derive(Debug, Deserialize)]
struct StoreProduct {
    product_id: String,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    subscription_period: Option<ApphudPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApphudPeriod {
    Named(String),
    Unit {
        unit: String,
        #[serde(default = "one")]
        value: u32,
    },
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct ActiveFlag {
    #[serde(default)]
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct PurchaseResponse {
    #[serde(default)]
    subscription: Option<ActiveFlag>,
    #[serde(default)]
    non_renewing_purchase: Option<ActiveFlag>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    has_active_subscription: bool,
    #[serde(default)]
    error: Option<String>,
}

/// StoreKit 具名週期轉 (unit, count)
///
/// `everyTwoMonths` 對應 (Month, 2)；不沿用把它歸到六個月的舊對照。
fn named_period(name: &str) -> Option<(PeriodUnit, u32)> {
    match name {
        "daily" => Some((PeriodUnit::Day, 1)),
        "everyThreeDays" => Some((PeriodUnit::Day, 3)),
        "weekly" => Some((PeriodUnit::Week, 1)),
        "everyTwoWeeks" => Some((PeriodUnit::Week, 2)),
        "monthly" => Some((PeriodUnit::Month, 1)),
        "everyTwoMonths" => Some((PeriodUnit::Month, 2)),
        "everyThreeMonths" => Some((PeriodUnit::Month, 3)),
        "everySixMonths" => Some((PeriodUnit::Month, 6)),
        "yearly" => Some((PeriodUnit::Year, 1)),
        other => parse_iso8601_period(other),
    }
}

impl From<StoreProduct> for CommerceFact {
    fn from(product: StoreProduct) -> Self {
        let (unit, value) = match product.subscription_period {
            Some(ApphudPeriod::Named(name)) => match named_period(&name) {
                Some((unit, value)) => (Some(unit), value),
                None => {
                    tracing::debug!(
                        "Unknown Apphud period '{}' for {}, treating as lifetime",
                        name,
                        product.product_id
                    );
                    (None, 0)
                }
            },
            Some(ApphudPeriod::Unit { unit, value }) => (PeriodUnit::parse(&unit), value),
            None => (None, 0),
        };
        CommerceFact::new(product.product_id, product.price, unit, value)
    }
}

impl ApphudAdapter {
    pub fn new(config: ApphudConfig) -> Result<Self> {
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

    fn user_id(&self) -> &str {
        self.config.user_id.as_deref().unwrap_or("anonymous")
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .bearer_auth(&self.config.api_key)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.config.api_key)
    }

    async fn request_products(&self, product_ids: &[String]) -> Result<Vec<CommerceFact>> {
        let request = self
            .get("/products")
            .query(&[("ids", product_ids.join(","))]);
        let response: ProductsResponse = send_json(BACKEND, request).await?;
        Ok(response.products.into_iter().map(CommerceFact::from).collect())
    }
}

#[async_trait]
impl BackendAdapter for ApphudAdapter {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn start(&self) -> Result<()> {
        self.cache.lock().await.clear();
        tracing::info!("🔌 Apphud adapter ready for user '{}'", self.user_id());
        Ok(())
    }

    async fn fetch_fragments(&self) -> Result<Vec<Value>> {
        tracing::debug!("Fetching Apphud placements from {}", self.url("/placements"));
        let request = self.get("/placements").query(&[("user_id", self.user_id())]);
        let response: PlacementsResponse = send_json(BACKEND, request).await?;

        let mut fragments = Vec::with_capacity(response.placements.len());
        for placement in response.placements {
            match placement.paywall.and_then(|p| p.json) {
                Some(Value::Null) | None => {
                    tracing::debug!("Placement '{}' has no paywall JSON", placement.identifier);
                }
                Some(json) => fragments.push(json),
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
                tracing::debug!("Apphud product cache invalidated for generation {}", generation);
            }
            cache.missing(product_ids)
        };

        if missing.is_empty() {
            return Ok(self.cache.lock().await.collect(product_ids));
        }

        let fetched = self.request_products(&missing).await?;
        let mut cache = self.cache.lock().await;
        if cache.generation() != Some(generation) {
            // 期間已有新一輪 fetch，不寫入快取
            return Ok(fetched);
        }
        cache.insert_all(fetched);
        Ok(cache.collect(product_ids))
    }

    async fn purchase(&self, product_id: &str) -> Result<bool> {
        let request = self.post("/purchases").json(&serde_json::json!({
            "product_id": product_id,
            "user_id": self.user_id(),
        }));
        let response: PurchaseResponse = send_json(BACKEND, request)
            .await
            .map_err(|e| into_operation(BACKEND, e))?;

        let subscription_active = response.subscription.is_some_and(|s| s.is_active);
        let purchase_active = response.non_renewing_purchase.is_some_and(|p| p.is_active);
        if subscription_active || purchase_active {
            return Ok(true);
        }

        let message = response.error.unwrap_or_else(|| "Purchase failed!".to_string());
        Err(SyncError::operation(BACKEND, message))
    }

    async fn restore(&self) -> Result<bool> {
        let request = self
            .post("/restore")
            .json(&serde_json::json!({ "user_id": self.user_id() }));
        let response: StatusResponse = send_json(BACKEND, request)
            .await
            .map_err(|e| into_operation(BACKEND, e))?;

        if let Some(error) = response.error {
            return Err(SyncError::operation(BACKEND, error));
        }
        Ok(response.has_active_subscription)
    }

    async fn check_entitlement(&self) -> Result<bool> {
        let request = self
            .get("/subscription_status")
            .query(&[("user_id", self.user_id())]);
        let response: StatusResponse = send_json(BACKEND, request).await?;
        Ok(response.has_active_subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_periods_translate() {
        assert_eq!(named_period("everyTwoMonths"), Some((PeriodUnit::Month, 2)));
        assert_eq!(named_period("everySixMonths"), Some((PeriodUnit::Month, 6)));
        assert_eq!(named_period("everyThreeDays"), Some((PeriodUnit::Day, 3)));
        assert_eq!(named_period("P1Y"), Some((PeriodUnit::Year, 1)));
        assert_eq!(named_period("quarterly-ish"), None);
    }

    #[test]
    fn test_store_product_to_fact() {
        let product: StoreProduct = serde_json::from_value(serde_json::json!({
            "product_id": "premium_quarter",
            "price": "24.99",
            "subscription_period": {"unit": "month", "value": 3}
        }))
        .unwrap();

        let fact = CommerceFact::from(product);
        assert_eq!(fact.product_id, "premium_quarter");
        assert_eq!(fact.price, Some(Decimal::new(2499, 2)));
        assert_eq!(fact.period_unit, Some(PeriodUnit::Month));
        assert_eq!(fact.period_value, 3);
    }

    #[test]
    fn test_non_renewing_product_has_no_period() {
        let product: StoreProduct = serde_json::from_value(serde_json::json!({
            "product_id": "lifetime",
            "price": 99.0,
            "subscription_period": null
        }))
        .unwrap();

        let fact = CommerceFact::from(product);
        assert_eq!(fact.period_unit, None);
    }
}
