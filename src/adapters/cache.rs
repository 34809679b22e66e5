use crate::domain::model::CommerceFact;
use std::collections::HashMap;

/// Store facts already fetched for the current generation, keyed by product id.
///
/// Owned by one adapter instance. Moving to another generation empties it.
#[derive(Debug, Default)]
pub struct ProductCache {
    generation: Option<u64>,
    facts: HashMap<String, CommerceFact>,
}

impl ProductCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Option<u64> {
        self.generation
    }

    /// Switch to `generation`; returns true when cached facts were dropped.
    pub fn sync_generation(&mut self, generation: u64) -> bool {
        if self.generation == Some(generation) {
            return false;
        }
        let had_entries = !self.facts.is_empty();
        self.facts.clear();
        self.generation = Some(generation);
        had_entries
    }

    pub fn missing(&self, product_ids: &[String]) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for id in product_ids {
            if !self.facts.contains_key(id) && !missing.contains(id) {
                missing.push(id.clone());
            }
        }
        missing
    }

    pub fn insert_all(&mut self, facts: impl IntoIterator<Item = CommerceFact>) {
        for fact in facts {
            self.facts.insert(fact.product_id.clone(), fact);
        }
    }

    /// Cached facts for `product_ids`, in request order.
    pub fn collect(&self, product_ids: &[String]) -> Vec<CommerceFact> {
        let mut collected: Vec<CommerceFact> = Vec::new();
        for id in product_ids {
            if collected.iter().any(|f| &f.product_id == id) {
                continue;
            }
            if let Some(fact) = self.facts.get(id) {
                collected.push(fact.clone());
            }
        }
        collected
    }

    pub fn clear(&mut self) {
        self.facts.clear();
        self.generation = None;
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::PeriodUnit;
    use rust_decimal::Decimal;

    fn fact(id: &str) -> CommerceFact {
        CommerceFact::new(id, Some(Decimal::new(100, 2)), Some(PeriodUnit::Month), 1)
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_missing_and_collect() {
        let mut cache = ProductCache::new();
        cache.sync_generation(1);
        cache.insert_all(vec![fact("a")]);

        assert_eq!(cache.missing(&ids(&["a", "b", "b"])), ids(&["b"]));
        cache.insert_all(vec![fact("b")]);

        let collected = cache.collect(&ids(&["b", "a", "b", "zzz"]));
        let got: Vec<&str> = collected.iter().map(|f| f.product_id.as_str()).collect();
        assert_eq!(got, vec!["b", "a"]);
    }

    #[test]
    fn test_generation_change_invalidates() {
        let mut cache = ProductCache::new();
        assert!(!cache.sync_generation(1));
        cache.insert_all(vec![fact("a")]);

        assert!(!cache.sync_generation(1));
        assert_eq!(cache.len(), 1);

        assert!(cache.sync_generation(2));
        assert!(cache.is_empty());
        assert_eq!(cache.generation(), Some(2));
    }

    #[test]
    fn test_clear() {
        let mut cache = ProductCache::new();
        cache.sync_generation(3);
        cache.insert_all(vec![fact("a")]);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.generation(), None);
    }
}
