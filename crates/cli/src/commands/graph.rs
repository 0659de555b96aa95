use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use flavour_core::config::ConfigOverrides;
use flavour_core::graph::{Edge, ProductGraph};
use flavour_core::Product;
use serde::Serialize;

use crate::commands::{load_graph, CommandResult};

#[derive(Clone, Debug, Default)]
pub struct GraphArgs {
    pub dataset: Option<PathBuf>,
    pub export: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct GraphExport<'a> {
    products: Vec<&'a Product>,
    edges: Vec<&'a Edge>,
}

pub fn run(args: GraphArgs) -> CommandResult {
    let overrides = ConfigOverrides { dataset_path: args.dataset, ..ConfigOverrides::default() };
    let (config, _, built) = match load_graph(overrides) {
        Ok(loaded) => loaded,
        Err(error) => return CommandResult::from_error("graph", &error),
    };

    let mut message = format!(
        "built graph with {} products and {} edges (min_edge_weight {})",
        built.stats.products, built.stats.edges, config.graph.min_edge_weight
    );

    if let Some(path) = args.export.as_deref() {
        if let Err(error) = export(&built.graph, path) {
            return CommandResult::failure("graph", "export", format!("{error:#}"), 3);
        }
        message.push_str(&format!("; exported to {}", path.display()));
    }

    CommandResult::success("graph", message, &built.stats)
}

fn export(graph: &ProductGraph, path: &Path) -> anyhow::Result<()> {
    let document =
        GraphExport { products: graph.products().collect(), edges: graph.edges().collect() };
    let rendered =
        serde_json::to_string_pretty(&document).context("failed to serialize graph export")?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create export directory `{}`", parent.display()))?;
    }
    fs::write(path, rendered)
        .with_context(|| format!("failed to write graph export `{}`", path.display()))?;
    Ok(())
}
