use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::product::ProductId;
use crate::graph::ProductGraph;
use crate::parsers::{normalize_ean, EAN_LENGTH};

/// Initial selection priority per product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrioritySeed {
    priorities: BTreeMap<ProductId, f64>,
}

impl PrioritySeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<ProductId>, priority: f64) {
        self.priorities.insert(id.into(), priority);
    }

    pub fn get(&self, id: &ProductId) -> Option<f64> {
        self.priorities.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.priorities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.priorities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, f64)> {
        self.priorities.iter().map(|(id, priority)| (id, *priority))
    }

    /// One point of priority per sales record, keyed by normalised EAN.
    pub fn from_sales<I, S>(eans: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seed = Self::new();
        for ean in eans {
            let key = normalize_ean(ean.as_ref(), EAN_LENGTH);
            if key.trim().is_empty() {
                continue;
            }
            *seed.priorities.entry(ProductId(key)).or_insert(0.0) += 1.0;
        }
        seed
    }

    /// Seed value for a product: exact id first, then the GTIN prefix of the
    /// id (text before the first `-`) normalised to EAN length.
    pub fn resolve(&self, id: &ProductId) -> Option<f64> {
        self.resolve_key(id).map(|(_, priority)| priority)
    }

    /// `(id, priority)` for every graph product; products without a seed
    /// entry start at zero.
    pub fn for_graph(&self, graph: &ProductGraph) -> Vec<(ProductId, f64)> {
        let mut used = BTreeSet::new();
        let mut matched = 0usize;
        let entries = graph
            .products()
            .map(|product| match self.resolve_key(&product.id) {
                Some((key, priority)) => {
                    used.insert(key);
                    matched += 1;
                    (product.id.clone(), priority)
                }
                None => (product.id.clone(), 0.0),
            })
            .collect::<Vec<_>>();

        let unmatched_seed = self.priorities.len() - used.len();
        if unmatched_seed > 0 {
            debug!(
                event_name = "selection.seed.unmatched",
                unmatched_seed,
                "seed entries without a product in the graph were ignored"
            );
        }

        info!(
            event_name = "selection.seed.resolved",
            products = entries.len(),
            matched,
            unmatched_seed,
            "priority seed resolved against graph"
        );
        entries
    }

    fn resolve_key(&self, id: &ProductId) -> Option<(&ProductId, f64)> {
        if let Some((key, priority)) = self.priorities.get_key_value(id) {
            return Some((key, *priority));
        }

        let gtin = id.as_str().split('-').next().unwrap_or_default();
        let key = ProductId(normalize_ean(gtin, EAN_LENGTH));
        self.priorities.get_key_value(&key).map(|(key, priority)| (key, *priority))
    }
}

impl<K: Into<ProductId>> FromIterator<(K, f64)> for PrioritySeed {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self { priorities: iter.into_iter().map(|(id, priority)| (id.into(), priority)).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::PrioritySeed;
    use crate::domain::product::{Product, ProductId};
    use crate::domain::weight::WeightCoefficients;
    use crate::graph::ProductGraph;

    fn id(value: &str) -> ProductId {
        ProductId::from(value)
    }

    #[test]
    fn sales_are_counted_per_normalised_ean() {
        let seed =
            PrioritySeed::from_sales(["7310350118342", "07310350118342", "0007310350118342", "42"]);

        assert_eq!(seed.get(&id("07310350118342")), Some(3.0));
        assert_eq!(seed.get(&id("00000000000042")), Some(1.0));
        assert_eq!(seed.len(), 2);
    }

    #[test]
    fn blank_sales_records_are_skipped() {
        let seed = PrioritySeed::from_sales(["", "  "]);
        assert!(seed.is_empty());
    }

    #[test]
    fn exact_ids_win_over_gtin_prefix() {
        let mut seed = PrioritySeed::new();
        seed.insert("07310350118342-2", 9.0);
        seed.insert("07310350118342", 4.0);

        assert_eq!(seed.resolve(&id("07310350118342-2")), Some(9.0));
        assert_eq!(seed.resolve(&id("7310350118342-5")), Some(4.0));
        assert_eq!(seed.resolve(&id("unrelated")), None);
    }

    #[test]
    fn graph_products_without_seed_start_at_zero() {
        let mut graph = ProductGraph::new(WeightCoefficients::default());
        for value in ["a", "b", "7310350118342-1"] {
            graph.insert_product(Product::new(value));
        }
        let seed: PrioritySeed =
            [("a", 5.0), ("ghost", 10.0), ("07310350118342", 2.0)].into_iter().collect();

        let entries = seed.for_graph(&graph);
        assert_eq!(entries, vec![(id("7310350118342-1"), 2.0), (id("a"), 5.0), (id("b"), 0.0)]);
    }
}
