use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{EdgeSources, ProductGraph};
use crate::config::GraphConfig;
use crate::domain::product::{Product, ProductId};
use crate::domain::weight::{Weight, WeightCoefficients};
use crate::scoring::{CoPurchaseTable, SimilarityScorer};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub products: usize,
    pub edges: usize,
    pub content_edges: usize,
    pub subcategory_edges: usize,
    /// Pairs that received both a content edge and a subcategory edge.
    pub merged_edges: usize,
    pub pairs_scored: usize,
    /// Scored pairs whose total fell below `min_edge_weight`.
    pub pairs_skipped: usize,
    /// Pairs never scored because they share no ingredient, tag or co-purchase.
    pub pairs_pruned: usize,
    pub max_edge_total: f64,
}

#[derive(Clone, Debug)]
pub struct BuiltGraph {
    pub graph: ProductGraph,
    pub stats: GraphStats,
}

/// Turns a product list plus co-purchase data into a [`ProductGraph`].
#[derive(Clone, Debug)]
pub struct GraphBuilder {
    pub min_edge_weight: f64,
    pub subcategory_edge_weight: f64,
    pub normalize_copurchase: bool,
    pub coefficients: WeightCoefficients,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::from_config(&GraphConfig::default())
    }
}

impl GraphBuilder {
    pub fn from_config(config: &GraphConfig) -> Self {
        Self {
            min_edge_weight: config.min_edge_weight,
            subcategory_edge_weight: config.subcategory_edge_weight,
            normalize_copurchase: config.normalize_copurchase,
            coefficients: config.coefficients,
        }
    }

    pub fn build(&self, products: &[Product], relations: &CoPurchaseTable) -> BuiltGraph {
        let mut graph = ProductGraph::new(self.coefficients);
        for product in products {
            if !graph.insert_product(product.clone()) {
                warn!(
                    event_name = "graph.build.duplicate_product",
                    product_id = %product.id,
                    "duplicate product id ignored"
                );
            }
        }

        let nodes = graph.products().cloned().collect::<Vec<_>>();
        let total_pairs = nodes.len() * nodes.len().saturating_sub(1) / 2;
        let candidates = self.candidate_pairs(&nodes, relations);

        let scorer = SimilarityScorer::new(relations, self.normalize_copurchase, self.coefficients);
        let threshold = self.min_edge_weight;
        let accepted = candidates
            .par_iter()
            .filter_map(|&(left, right)| {
                let weight = scorer.weight(&nodes[left], &nodes[right]);
                (scorer.total(&weight) >= threshold).then_some((left, right, weight))
            })
            .collect::<Vec<_>>();

        let mut stats = GraphStats {
            products: nodes.len(),
            pairs_scored: candidates.len(),
            pairs_skipped: candidates.len() - accepted.len(),
            pairs_pruned: total_pairs - candidates.len(),
            content_edges: accepted.len(),
            ..GraphStats::default()
        };

        for (left, right, weight) in accepted {
            insert(&mut graph, &nodes[left].id, &nodes[right].id, weight, EdgeSources::CONTENT);
        }

        let category_weight = Weight::new(0.0, 0.0, self.subcategory_edge_weight);
        for members in subcategory_groups(&nodes).values() {
            for (offset, left) in members.iter().enumerate() {
                for right in &members[offset + 1..] {
                    let (left, right) = (&nodes[*left].id, &nodes[*right].id);
                    if graph.edge(left, right).is_some() {
                        stats.merged_edges += 1;
                    }
                    insert(&mut graph, left, right, category_weight, EdgeSources::SUBCATEGORY);
                    stats.subcategory_edges += 1;
                }
            }
        }

        stats.edges = graph.edge_count();
        stats.max_edge_total = graph.max_edge_total();

        info!(
            event_name = "graph.build.completed",
            products = stats.products,
            edges = stats.edges,
            content_edges = stats.content_edges,
            subcategory_edges = stats.subcategory_edges,
            pairs_skipped = stats.pairs_skipped,
            pairs_pruned = stats.pairs_pruned,
            min_edge_weight = self.min_edge_weight,
            max_edge_total = stats.max_edge_total,
            "product graph built"
        );

        BuiltGraph { graph, stats }
    }

    /// Index pairs `(i, j)` with `i < j` worth scoring. A pair sharing no
    /// ingredient, tag or co-purchase entry scores exactly zero, so it can only
    /// pass a non-positive threshold; in that case every pair is a candidate.
    fn candidate_pairs(
        &self,
        nodes: &[Product],
        relations: &CoPurchaseTable,
    ) -> Vec<(usize, usize)> {
        if self.min_edge_weight <= 0.0 {
            return (0..nodes.len())
                .flat_map(|left| (left + 1..nodes.len()).map(move |right| (left, right)))
                .collect();
        }

        let mut by_ingredient: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut by_tag: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, product) in nodes.iter().enumerate() {
            let keys = product
                .ingredients
                .iter()
                .map(|ingredient| ingredient.key())
                .filter(|key| !key.is_empty())
                .collect::<BTreeSet<_>>();
            for key in keys {
                by_ingredient.entry(key).or_default().push(index);
            }
            for tag in &product.tags {
                by_tag.entry(tag.as_str()).or_default().push(index);
            }
        }

        let mut pairs = BTreeSet::new();
        for members in by_ingredient.values().chain(by_tag.values()) {
            for (offset, left) in members.iter().enumerate() {
                for right in &members[offset + 1..] {
                    pairs.insert((*left, *right));
                }
            }
        }

        let positions = nodes
            .iter()
            .enumerate()
            .map(|(index, product)| (&product.id, index))
            .collect::<BTreeMap<&ProductId, usize>>();
        for source in relations.sources() {
            let Some(&left) = positions.get(source) else {
                continue;
            };
            for (target, count) in relations.related(source) {
                if count == 0 {
                    continue;
                }
                if let Some(&right) = positions.get(target) {
                    pairs.insert((left.min(right), left.max(right)));
                }
            }
        }

        pairs.into_iter().collect()
    }
}

fn subcategory_groups(nodes: &[Product]) -> BTreeMap<&str, Vec<usize>> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, product) in nodes.iter().enumerate() {
        let subcategory = product.subcategory.trim();
        if !subcategory.is_empty() {
            groups.entry(subcategory).or_default().push(index);
        }
    }
    groups
}

fn insert(
    graph: &mut ProductGraph,
    left: &ProductId,
    right: &ProductId,
    weight: Weight,
    sources: EdgeSources,
) {
    // Both endpoints come from the graph's own node list.
    if let Err(error) = graph.insert_edge(left, right, weight, sources) {
        warn!(event_name = "graph.build.edge_rejected", %error, "edge rejected");
    }
}
