pub mod builder;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, ProductId};
use crate::domain::weight::{Weight, WeightCoefficients};
use crate::errors::DomainError;

pub use builder::{BuiltGraph, GraphBuilder, GraphStats};

/// Which rules produced an edge. Both flags are set when a content edge and a
/// subcategory edge landed on the same pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSources {
    pub content: bool,
    pub subcategory: bool,
}

impl EdgeSources {
    pub const CONTENT: EdgeSources = EdgeSources { content: true, subcategory: false };
    pub const SUBCATEGORY: EdgeSources = EdgeSources { content: false, subcategory: true };

    fn merge(self, other: EdgeSources) -> EdgeSources {
        EdgeSources {
            content: self.content || other.content,
            subcategory: self.subcategory || other.subcategory,
        }
    }
}

/// Undirected edge; `source < target` always holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: ProductId,
    pub target: ProductId,
    pub weight: Weight,
    pub total: f64,
    pub sources: EdgeSources,
}

impl Edge {
    pub fn other(&self, id: &ProductId) -> Option<&ProductId> {
        if &self.source == id {
            Some(&self.target)
        } else if &self.target == id {
            Some(&self.source)
        } else {
            None
        }
    }
}

/// Product similarity graph. Read-only once built; selection runs borrow it.
#[derive(Clone, Debug, Default)]
pub struct ProductGraph {
    coefficients: WeightCoefficients,
    products: BTreeMap<ProductId, Product>,
    edges: BTreeMap<(ProductId, ProductId), Edge>,
    adjacency: BTreeMap<ProductId, BTreeMap<ProductId, f64>>,
}

impl ProductGraph {
    pub fn new(coefficients: WeightCoefficients) -> Self {
        Self { coefficients, ..Self::default() }
    }

    pub fn coefficients(&self) -> &WeightCoefficients {
        &self.coefficients
    }

    /// Adds a node. Returns `false` and leaves the graph untouched when the id
    /// is already present.
    pub fn insert_product(&mut self, product: Product) -> bool {
        if self.products.contains_key(&product.id) {
            return false;
        }
        self.adjacency.entry(product.id.clone()).or_default();
        self.products.insert(product.id.clone(), product);
        true
    }

    /// Adds or merges an edge between two known products. Merging sums the
    /// weight components and recomputes the total.
    pub fn insert_edge(
        &mut self,
        left: &ProductId,
        right: &ProductId,
        weight: Weight,
        sources: EdgeSources,
    ) -> Result<&Edge, DomainError> {
        for id in [left, right] {
            if !self.products.contains_key(id) {
                return Err(DomainError::UnknownProduct { id: id.clone() });
            }
        }
        if left == right {
            return Err(DomainError::InvariantViolation(format!(
                "self-edge requested for product `{left}`"
            )));
        }

        let key = edge_key(left, right);
        let coefficients = self.coefficients;
        let edge = self
            .edges
            .entry(key.clone())
            .and_modify(|edge| {
                edge.weight = edge.weight.combine(&weight);
                edge.sources = edge.sources.merge(sources);
                edge.total = edge.weight.total(&coefficients);
            })
            .or_insert_with(|| Edge {
                source: key.0.clone(),
                target: key.1.clone(),
                weight,
                total: weight.total(&coefficients),
                sources,
            });

        let total = edge.total;
        self.adjacency.entry(key.0.clone()).or_default().insert(key.1.clone(), total);
        self.adjacency.entry(key.1.clone()).or_default().insert(key.0.clone(), total);

        Ok(edge)
    }

    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(id)
    }

    pub fn contains(&self, id: &ProductId) -> bool {
        self.products.contains_key(id)
    }

    /// Products in identifier order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// Edges in canonical `(source, target)` order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge(&self, left: &ProductId, right: &ProductId) -> Option<&Edge> {
        self.edges.get(&edge_key(left, right))
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Neighbours of `id` with the connecting edge total, in identifier order.
    /// Unknown or isolated products have no neighbours.
    pub fn neighbors<'g>(
        &'g self,
        id: &ProductId,
    ) -> impl Iterator<Item = (&'g ProductId, f64)> + 'g {
        self.adjacency.get(id).into_iter().flatten().map(|(neighbor, total)| (neighbor, *total))
    }

    pub fn degree(&self, id: &ProductId) -> usize {
        self.adjacency.get(id).map(BTreeMap::len).unwrap_or(0)
    }

    /// The `limit` closest neighbours of `id` by descending edge total, ties
    /// by identifier.
    pub fn strongest_neighbors(
        &self,
        id: &ProductId,
        limit: usize,
    ) -> Result<Vec<(&ProductId, f64)>, DomainError> {
        if !self.contains(id) {
            return Err(DomainError::UnknownProduct { id: id.clone() });
        }

        let mut ranked = self.neighbors(id).collect::<Vec<_>>();
        ranked.sort_by(|left, right| match right.1.total_cmp(&left.1) {
            Ordering::Equal => left.0.cmp(right.0),
            other => other,
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    pub fn max_edge_total(&self) -> f64 {
        self.edges.values().map(|edge| edge.total).fold(0.0, f64::max)
    }
}

fn edge_key(left: &ProductId, right: &ProductId) -> (ProductId, ProductId) {
    if left <= right {
        (left.clone(), right.clone())
    } else {
        (right.clone(), left.clone())
    }
}
