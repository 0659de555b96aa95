use std::collections::BTreeMap;

use crate::domain::product::ProductId;

/// How often pairs of products were bought together.
///
/// Built once from transaction aggregates and then only read. Lookups are
/// direction-agnostic: the count for `(a, b)` is the larger of the two
/// directional entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoPurchaseTable {
    counts: BTreeMap<ProductId, BTreeMap<ProductId, u64>>,
    max_log_count: f64,
}

impl CoPurchaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a directional count. A repeated `(from, to)` pair keeps the last count.
    pub fn insert(&mut self, from: ProductId, to: ProductId, count: u64) {
        if from == to {
            return;
        }
        match self.counts.entry(from).or_default().insert(to, count) {
            // a lowered count may have been the maximum
            Some(previous) if previous > count => {
                self.max_log_count = self
                    .counts
                    .values()
                    .flat_map(BTreeMap::values)
                    .copied()
                    .max()
                    .map_or(0.0, log_count);
            }
            _ => self.max_log_count = self.max_log_count.max(log_count(count)),
        }
    }

    pub fn count(&self, left: &ProductId, right: &ProductId) -> u64 {
        let forward = self.directional(left, right);
        let backward = self.directional(right, left);
        forward.max(backward)
    }

    /// Directional entries recorded for `id`, in identifier order.
    pub fn related(&self, id: &ProductId) -> impl Iterator<Item = (&ProductId, u64)> {
        self.counts.get(id).into_iter().flatten().map(|(other, count)| (other, *count))
    }

    /// All products that appear on the left side of at least one entry.
    pub fn sources(&self) -> impl Iterator<Item = &ProductId> {
        self.counts.keys()
    }

    /// Log-count of the largest count currently stored, 0 for an empty table.
    pub fn max_log_count(&self) -> f64 {
        self.max_log_count
    }

    pub fn len(&self) -> usize {
        self.counts.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    fn directional(&self, from: &ProductId, to: &ProductId) -> u64 {
        self.counts.get(from).and_then(|related| related.get(to)).copied().unwrap_or(0)
    }
}

impl FromIterator<(ProductId, ProductId, u64)> for CoPurchaseTable {
    fn from_iter<I: IntoIterator<Item = (ProductId, ProductId, u64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (from, to, count) in iter {
            table.insert(from, to, count);
        }
        table
    }
}

pub(crate) fn log_count(count: u64) -> f64 {
    (count as f64).ln_1p()
}

/// Co-purchase affinity between two products.
///
/// `ln(1 + count)` keeps a handful of blockbuster pairs from dominating the
/// edge weights. With `normalize`, the value is divided by the largest
/// log-count in the table so it lands in `[0, 1]`. Unknown identifiers give 0.
pub fn copurchase_weight(
    left: &ProductId,
    right: &ProductId,
    table: &CoPurchaseTable,
    normalize: bool,
) -> f64 {
    let count = table.count(left, right);
    if count == 0 {
        return 0.0;
    }

    let weight = log_count(count);
    if !normalize {
        return weight;
    }

    let scale = table.max_log_count();
    if scale > 0.0 {
        weight / scale
    } else {
        0.0
    }
}
