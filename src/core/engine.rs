use crate::core::enrich::{apply_commerce_facts, EnrichmentReport};
use crate::core::merge::merge_fragments;
use crate::domain::model::{
    CommerceBatch, PurchaseOutcome, StyleDefinition, Subscription, SubscriptionResponse,
};
use crate::domain::ports::BackendAdapter;
use crate::utils::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// 狀態變更通知，每次都帶完整值
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum SyncEvent {
    ResponseUpdated {
        generation: u64,
        response: SubscriptionResponse,
    },
    LoadingChanged(bool),
    EntitlementChanged(bool),
    ErrorRaised {
        message: String,
    },
    CommerceApplied {
        generation: u64,
        updated_packages: usize,
    },
}

/// 一次 refresh 的摘要
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub backend: &'static str,
    pub generation: u64,
    pub fetched_at: DateTime<Utc>,
    pub fragments: usize,
    pub subscriptions: usize,
    pub packages: usize,
    pub priced_packages: usize,
}

/// Coordinates one backend adapter and owns the canonical response.
///
/// Every state change goes through `&mut self`, so enrichment passes never interleave.
/// Observers get whole-value updates through [`SyncEngine::subscribe`].
pub struct SyncEngine<A: BackendAdapter> {
    adapter: A,
    response: Option<SubscriptionResponse>,
    generation: u64,
    is_loading: bool,
    is_active: bool,
    last_error: Option<String>,
    events: broadcast::Sender<SyncEvent>,
    fetch_commerce: bool,
}

impl<A: BackendAdapter> SyncEngine<A> {
    pub fn new(adapter: A, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            adapter,
            response: None,
            generation: 0,
            is_loading: false,
            is_active: false,
            last_error: None,
            events,
            fetch_commerce: true,
        }
    }

    /// 關閉後 refresh 只更新設定，commerce facts 需另外呼叫 `refresh_commerce`
    pub fn with_commerce(mut self, enabled: bool) -> Self {
        self.fetch_commerce = enabled;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn response(&self) -> Option<&SubscriptionResponse> {
        self.response.as_ref()
    }

    pub fn subscription(&self, identifier: &str) -> Option<&Subscription> {
        self.response.as_ref()?.subscription(identifier)
    }

    pub fn styles(&self) -> &[StyleDefinition] {
        self.response
            .as_ref()
            .map(SubscriptionResponse::styles)
            .unwrap_or(&[])
    }

    pub fn product_ids(&self) -> Vec<String> {
        self.response
            .as_ref()
            .map(SubscriptionResponse::product_ids)
            .unwrap_or_default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// 啟動後端並完成第一次同步；entitlement 檢查失敗只記錄
    pub async fn start(&mut self) -> Result<SyncReport> {
        tracing::info!("🚀 Starting {} backend", self.adapter.name());
        self.adapter.start().await?;

        let report = self.refresh().await?;

        if let Err(e) = self.check_entitlement().await {
            tracing::warn!("⚠️ Entitlement check failed: {}", e);
        }
        Ok(report)
    }

    /// 重新抓取所有 fragment 並整份取代目前的 response
    ///
    /// 抓取失敗時保留前一份 response 與其 generation，並回傳 `SyncError::Fetch`。
    /// Commerce facts 抓取失敗不算 refresh 失敗，package 維持未定價。
    pub async fn refresh(&mut self) -> Result<SyncReport> {
        let generation = self.generation + 1;
        self.set_loading(true);

        tracing::info!(
            "📥 Fetching fragments from {} (generation {})",
            self.adapter.name(),
            generation
        );
        let fragments = match self.adapter.fetch_fragments().await {
            Ok(fragments) => fragments,
            Err(e) => {
                tracing::error!("❌ Fragment fetch failed: {}", e);
                self.raise(&e);
                self.set_loading(false);
                return Err(e);
            }
        };

        let response = merge_fragments(&fragments);
        tracing::info!(
            "🧩 Canonical response has {} subscription(s), {} style(s)",
            response.subscriptions.len(),
            response.styles().len()
        );
        // generation 只在 response 真正被取代時前進
        self.generation = generation;
        self.response = Some(response);
        self.last_error = None;
        self.publish_response();

        if self.fetch_commerce {
            if let Err(e) = self.refresh_commerce().await {
                tracing::warn!("⚠️ Commerce facts unavailable, packages stay unpriced: {}", e);
                self.raise(&e);
            }
        }

        self.set_loading(false);
        Ok(self.report(fragments.len()))
    }

    /// 針對目前 generation 抓取 commerce facts 並套用
    pub async fn refresh_commerce(&mut self) -> Result<EnrichmentReport> {
        let product_ids = self.product_ids();
        if product_ids.is_empty() {
            return Ok(EnrichmentReport::default());
        }

        let generation = self.generation;
        tracing::debug!(
            "Fetching commerce facts for {} product(s), generation {}",
            product_ids.len(),
            generation
        );
        let facts = self
            .adapter
            .fetch_commerce_facts(generation, &product_ids)
            .await?;

        Ok(self
            .apply_batch(CommerceBatch { generation, facts })
            .unwrap_or_default())
    }

    /// 套用一批 commerce facts；generation 不符（已被新的 fetch 取代）時丟棄並回傳 false
    pub fn apply_commerce_batch(&mut self, batch: CommerceBatch) -> bool {
        self.apply_batch(batch).is_some()
    }

    fn apply_batch(&mut self, batch: CommerceBatch) -> Option<EnrichmentReport> {
        if batch.generation != self.generation {
            tracing::warn!(
                "⏭️ Dropping commerce batch for generation {} (current is {})",
                batch.generation,
                self.generation
            );
            return None;
        }
        let response = self.response.as_mut()?;

        let report = apply_commerce_facts(response, &batch.facts);
        tracing::info!(
            "💰 Priced {} package(s) for generation {}",
            report.updated_packages,
            batch.generation
        );
        self.emit(SyncEvent::CommerceApplied {
            generation: batch.generation,
            updated_packages: report.updated_packages,
        });
        self.publish_response();
        Some(report)
    }

    /// 購買指定 package；結果一律以 `PurchaseOutcome` 回傳
    pub async fn purchase(&mut self, package_id: &str) -> PurchaseOutcome {
        let known = self
            .response
            .as_ref()
            .and_then(|r| r.find_package(package_id))
            .is_some();
        if !known {
            let error = SyncError::NotFound {
                product_id: package_id.to_string(),
            };
            tracing::warn!("⚠️ {}", error);
            self.raise(&error);
            return PurchaseOutcome::failed(error.user_friendly_message());
        }

        tracing::info!("🛒 Purchasing {} via {}", package_id, self.adapter.name());
        self.set_loading(true);
        let result = self.adapter.purchase(package_id).await;
        self.set_loading(false);

        match result {
            Ok(true) => {
                self.set_active(true);
                PurchaseOutcome::succeeded()
            }
            Ok(false) => {
                let message = "Purchase completed but no entitlement is active";
                self.last_error = Some(message.to_string());
                PurchaseOutcome::failed(message)
            }
            Err(e) => {
                tracing::error!("❌ Purchase failed: {}", e);
                self.raise(&e);
                PurchaseOutcome::failed(e.user_friendly_message())
            }
        }
    }

    pub async fn restore(&mut self) -> PurchaseOutcome {
        tracing::info!("♻️ Restoring purchases via {}", self.adapter.name());
        self.set_loading(true);
        let result = self.adapter.restore().await;
        self.set_loading(false);

        match result {
            Ok(true) => {
                self.set_active(true);
                PurchaseOutcome::succeeded()
            }
            Ok(false) => {
                self.set_active(false);
                PurchaseOutcome::failed("No active subscription to restore")
            }
            Err(e) => {
                tracing::error!("❌ Restore failed: {}", e);
                self.raise(&e);
                PurchaseOutcome::failed(e.user_friendly_message())
            }
        }
    }

    pub async fn check_entitlement(&mut self) -> Result<bool> {
        let active = self.adapter.check_entitlement().await?;
        self.set_active(active);
        Ok(active)
    }

    fn report(&self, fragments: usize) -> SyncReport {
        let (subscriptions, packages, priced_packages) = match &self.response {
            Some(response) => {
                let packages = response.subscriptions.iter().flat_map(|s| s.packages.iter());
                let (total, priced) = packages.fold((0, 0), |(total, priced), p| {
                    (total + 1, priced + usize::from(p.is_priced()))
                });
                (response.subscriptions.len(), total, priced)
            }
            None => (0, 0, 0),
        };

        SyncReport {
            backend: self.adapter.name(),
            generation: self.generation,
            fetched_at: Utc::now(),
            fragments,
            subscriptions,
            packages,
            priced_packages,
        }
    }

    fn emit(&self, event: SyncEvent) {
        // 沒有訂閱者時 send 會失敗，忽略即可
        let _ = self.events.send(event);
    }

    fn publish_response(&self) {
        if let Some(response) = &self.response {
            self.emit(SyncEvent::ResponseUpdated {
                generation: self.generation,
                response: response.clone(),
            });
        }
    }

    fn set_loading(&mut self, loading: bool) {
        if self.is_loading != loading {
            self.is_loading = loading;
            self.emit(SyncEvent::LoadingChanged(loading));
        }
    }

    fn set_active(&mut self, active: bool) {
        if self.is_active != active {
            self.is_active = active;
            tracing::info!("🔑 Entitlement active: {}", active);
            self.emit(SyncEvent::EntitlementChanged(active));
        }
    }

    fn raise(&mut self, error: &SyncError) {
        let message = error.to_string();
        self.last_error = Some(message.clone());
        self.emit(SyncEvent::ErrorRaised { message });
    }
}
