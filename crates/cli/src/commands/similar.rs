use std::path::PathBuf;

use flavour_core::config::ConfigOverrides;
use flavour_core::{ApplicationError, ProductId};
use serde::Serialize;

use crate::commands::{load_graph, CommandResult};

pub const DEFAULT_TOP: usize = 5;

#[derive(Clone, Debug)]
pub struct SimilarArgs {
    pub product: String,
    pub top: usize,
    pub dataset: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Neighbour<'a> {
    id: &'a str,
    name: &'a str,
    total: f64,
}

pub fn run(args: SimilarArgs) -> CommandResult {
    let overrides = ConfigOverrides { dataset_path: args.dataset, ..ConfigOverrides::default() };
    let (_, _, built) = match load_graph(overrides) {
        Ok(loaded) => loaded,
        Err(error) => return CommandResult::from_error("similar", &error),
    };

    let id = ProductId::from(args.product.trim());
    let ranked = match built.graph.strongest_neighbors(&id, args.top) {
        Ok(ranked) => ranked,
        Err(error) => return CommandResult::from_error("similar", &ApplicationError::from(error)),
    };

    let neighbours = ranked
        .into_iter()
        .map(|(neighbour, total)| Neighbour {
            id: neighbour.as_str(),
            name: built
                .graph
                .product(neighbour)
                .map(|product| product.name.as_str())
                .unwrap_or_default(),
            total,
        })
        .collect::<Vec<_>>();

    let message = format!("{} closest products to {id}", neighbours.len());
    CommandResult::success("similar", message, &neighbours)
}
