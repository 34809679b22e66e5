// Adapters layer: concrete backend implementations behind `domain::ports::BackendAdapter`.

pub mod apphud;
pub mod cache;
pub(crate) mod http;
pub mod revenuecat;

pub use apphud::ApphudAdapter;
pub use cache::ProductCache;
pub use revenuecat::RevenueCatAdapter;

use crate::config::BackendConfig;
use crate::domain::model::CommerceFact;
use crate::domain::ports::BackendAdapter;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// 設定檔選定的後端；同一時間只有一個在運作
pub enum Backend {
    Apphud(ApphudAdapter),
    RevenueCat(RevenueCatAdapter),
}

impl Backend {
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        match config {
            BackendConfig::Apphud(apphud) => Ok(Self::Apphud(ApphudAdapter::new(apphud.clone())?)),
            BackendConfig::RevenueCat(revenuecat) => Ok(Self::RevenueCat(RevenueCatAdapter::new(
                revenuecat.clone(),
            )?)),
        }
    }

    fn inner(&self) -> &dyn BackendAdapter {
        match self {
            Self::Apphud(adapter) => adapter,
            Self::RevenueCat(adapter) => adapter,
        }
    }
}

#[async_trait]
impl BackendAdapter for Backend {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    async fn start(&self) -> Result<()> {
        self.inner().start().await
    }

    async fn fetch_fragments(&self) -> Result<Vec<Value>> {
        self.inner().fetch_fragments().await
    }

    async fn fetch_commerce_facts(
        &self,
        generation: u64,
        product_ids: &[String],
    ) -> Result<Vec<CommerceFact>> {
        self.inner()
            .fetch_commerce_facts(generation, product_ids)
            .await
    }

    async fn purchase(&self, product_id: &str) -> Result<bool> {
        self.inner().purchase(product_id).await
    }

    async fn restore(&self) -> Result<bool> {
        self.inner().restore().await
    }

    async fn check_entitlement(&self) -> Result<bool> {
        self.inner().check_entitlement().await
    }
}
