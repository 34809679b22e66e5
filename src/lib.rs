pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::{ApphudAdapter, Backend, RevenueCatAdapter};
pub use config::{BackendConfig, SyncConfig};
pub use core::document::{decode_document, decode_document_str};
pub use core::engine::{SyncEngine, SyncEvent, SyncReport};
pub use core::enrich::{apply_commerce_facts, EnrichmentReport};
pub use core::export::price_sheet_csv;
pub use core::merge::{merge_fragments, FragmentMerger};
pub use domain::model::{
    CommerceBatch, CommerceFact, Duration, DurationFormat, Package, PeriodUnit, PurchaseOutcome,
    StyleDefinition, Subscription, SubscriptionResponse,
};
pub use domain::ports::BackendAdapter;
pub use utils::error::{Result, SyncError};
