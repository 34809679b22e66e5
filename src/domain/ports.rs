use crate::domain::model::CommerceFact;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Capability surface shared by both subscription backends.
///
/// Adapters only fetch and translate; decoding, merging and enrichment stay in `core`.
/// Backend-specific failures come back as `SyncError::Fetch` or `SyncError::Operation`.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn start(&self) -> Result<()>;

    /// Raw paywall fragments, one per placement/offering, in backend order.
    async fn fetch_fragments(&self) -> Result<Vec<Value>>;

    /// Store facts for the given products. A change of `generation` invalidates cached facts.
    async fn fetch_commerce_facts(
        &self,
        generation: u64,
        product_ids: &[String],
    ) -> Result<Vec<CommerceFact>>;

    /// Returns whether the user holds an active entitlement afterwards.
    async fn purchase(&self, product_id: &str) -> Result<bool>;

    async fn restore(&self) -> Result<bool>;

    async fn check_entitlement(&self) -> Result<bool>;
}
