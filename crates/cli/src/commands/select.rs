use std::path::PathBuf;

use flavour_core::config::{ConfigOverrides, PenaltyMode};
use flavour_core::selection::{penalty_policy, SelectionEngine, SelectionOutcome};
use flavour_core::{ApplicationError, ProductGraph};
use serde::Serialize;

use crate::commands::{load_graph, CommandResult};

#[derive(Clone, Debug, Default)]
pub struct SelectArgs {
    pub count: Option<usize>,
    pub dataset: Option<PathBuf>,
    pub penalty: Option<PenaltyMode>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct SelectReport<'a> {
    dataset: String,
    penalty_mode: PenaltyMode,
    products: Vec<SelectedProduct<'a>>,
    #[serde(flatten)]
    outcome: &'a SelectionOutcome,
}

#[derive(Debug, Serialize)]
struct SelectedProduct<'a> {
    rank: usize,
    id: &'a str,
    name: &'a str,
    subcategory: &'a str,
    priority: f64,
}

pub fn run(args: SelectArgs) -> CommandResult {
    let overrides = ConfigOverrides {
        dataset_path: args.dataset,
        selection_count: args.count,
        penalty_mode: args.penalty,
        ..ConfigOverrides::default()
    };

    let (config, dataset, built) = match load_graph(overrides) {
        Ok(loaded) => loaded,
        Err(error) => return CommandResult::from_error("select", &error),
    };

    let engine = SelectionEngine::new(&built.graph, penalty_policy(&config.selection));
    let outcome = match engine.generate(config.selection.count, &dataset.seed) {
        Ok(outcome) => outcome,
        Err(error) => return CommandResult::from_error("select", &ApplicationError::from(error)),
    };

    let selected = describe(&built.graph, &outcome);
    let message = if outcome.exhausted {
        format!(
            "selected {} of {} requested products (catalogue exhausted)",
            outcome.selected.len(),
            outcome.requested
        )
    } else {
        format!("selected {} products", outcome.selected.len())
    };

    if !args.json {
        let mut lines = vec![message];
        for product in &selected {
            lines.push(format!(
                "{:>3}. {} {} [{}] priority {:.2}",
                product.rank, product.id, product.name, product.subcategory, product.priority
            ));
        }
        return CommandResult::text(lines.join("\n"));
    }

    let report = SelectReport {
        dataset: config.data.dataset_path.display().to_string(),
        penalty_mode: config.selection.penalty_mode,
        products: selected,
        outcome: &outcome,
    };
    CommandResult::success("select", message, &report)
}

fn describe<'a>(
    graph: &'a ProductGraph,
    outcome: &'a SelectionOutcome,
) -> Vec<SelectedProduct<'a>> {
    outcome
        .steps
        .iter()
        .map(|step| {
            let product = graph.product(&step.product_id);
            SelectedProduct {
                rank: step.rank,
                id: step.product_id.as_str(),
                name: product.map(|product| product.name.as_str()).unwrap_or_default(),
                subcategory: product
                    .map(|product| product.subcategory.as_str())
                    .unwrap_or_default(),
                priority: step.priority,
            }
        })
        .collect()
}
