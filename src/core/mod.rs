pub mod document;
pub mod duration;
pub mod engine;
pub mod enrich;
pub mod export;
pub mod merge;
pub mod styles;

pub use crate::domain::model::{
    CommerceBatch, CommerceFact, Duration, DurationFormat, Package, PeriodUnit, StyleDefinition,
    Subscription, SubscriptionResponse,
};
pub use crate::domain::ports::BackendAdapter;
pub use crate::utils::error::Result;
