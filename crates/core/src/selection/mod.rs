//! Greedy diverse selection over a built [`ProductGraph`].
//!
//! Every graph product enters an [`IndexedPriorityQueue`] with its seed
//! priority. Each step extracts the current maximum and then lowers the
//! priority of its graph neighbours through a [`PenaltyPolicy`], so products
//! similar to something already picked sink in the ranking.

pub mod penalty;
pub mod queue;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::product::ProductId;
use crate::errors::DomainError;
use crate::graph::ProductGraph;
use crate::seed::PrioritySeed;

pub use penalty::{penalty_policy, LinearPenalty, PenaltyPolicy, ProportionalPenalty};
pub use queue::IndexedPriorityQueue;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedPenalty {
    pub neighbor: ProductId,
    pub edge_total: f64,
    pub before: f64,
    pub after: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionStep {
    /// 1-based position in the result.
    pub rank: usize,
    pub product_id: ProductId,
    /// Priority at the moment of extraction.
    pub priority: f64,
    pub penalties: Vec<AppliedPenalty>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionOutcome {
    pub selected: Vec<ProductId>,
    pub requested: usize,
    /// The queue ran dry before `requested` products were selected.
    pub exhausted: bool,
    pub steps: Vec<SelectionStep>,
}

/// Runs selections against one borrowed graph. The graph is never mutated,
/// so a single engine serves any number of runs.
#[derive(Debug)]
pub struct SelectionEngine<'g, P = LinearPenalty> {
    graph: &'g ProductGraph,
    penalty: P,
}

impl<'g, P: PenaltyPolicy> SelectionEngine<'g, P> {
    pub fn new(graph: &'g ProductGraph, penalty: P) -> Self {
        Self { graph, penalty }
    }

    pub fn graph(&self) -> &'g ProductGraph {
        self.graph
    }

    pub fn generate(
        &self,
        count: usize,
        seed: &PrioritySeed,
    ) -> Result<SelectionOutcome, DomainError> {
        if count == 0 {
            return Err(DomainError::InvalidSelectionCount);
        }

        let mut queue = IndexedPriorityQueue::new(seed.for_graph(self.graph));
        let max_edge_total = self.graph.max_edge_total();
        let mut outcome = SelectionOutcome { requested: count, ..SelectionOutcome::default() };

        while outcome.selected.len() < count {
            let Some((product_id, priority)) = queue.extract_max() else {
                outcome.exhausted = true;
                break;
            };

            let mut penalties = Vec::new();
            for (neighbor, edge_total) in self.graph.neighbors(&product_id) {
                let Some(before) = queue.priority(neighbor) else {
                    // Already selected; the queue treats this as a no-op.
                    queue.decrease_priority(neighbor, 0.0)?;
                    continue;
                };

                let delta = self.penalty.penalty(before, edge_total, max_edge_total);
                queue.decrease_priority(neighbor, delta)?;
                let after = queue.priority(neighbor).unwrap_or(before);
                penalties.push(AppliedPenalty {
                    neighbor: neighbor.clone(),
                    edge_total,
                    before,
                    after,
                });
            }

            let rank = outcome.selected.len() + 1;
            debug!(
                event_name = "selection.step",
                rank,
                product_id = %product_id,
                priority,
                penalised = penalties.len(),
                "product selected"
            );

            outcome.selected.push(product_id.clone());
            outcome.steps.push(SelectionStep { rank, product_id, priority, penalties });
        }

        info!(
            event_name = "selection.completed",
            requested = count,
            selected = outcome.selected.len(),
            exhausted = outcome.exhausted,
            "selection completed"
        );
        Ok(outcome)
    }
}

/// One-shot selection with an explicit penalty policy.
pub fn generate<P: PenaltyPolicy>(
    graph: &ProductGraph,
    count: usize,
    seed: &PrioritySeed,
    penalty: P,
) -> Result<SelectionOutcome, DomainError> {
    SelectionEngine::new(graph, penalty).generate(count, seed)
}
