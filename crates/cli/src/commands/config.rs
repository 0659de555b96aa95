use std::env;
use std::fs;
use std::path::Path;

use flavour_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in entries(&config) {
        let source = field_source(
            entry.key,
            entry.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(entry.key, &entry.value, source));
    }

    CommandResult::text(lines.join("\n"))
}

fn entries(config: &AppConfig) -> Vec<ConfigEntry> {
    let graph = &config.graph;
    let selection = &config.selection;
    vec![
        entry(
            "graph.min_edge_weight",
            graph.min_edge_weight.to_string(),
            &["FLAVOUR_GRAPH_MIN_EDGE_WEIGHT"],
        ),
        entry(
            "graph.subcategory_edge_weight",
            graph.subcategory_edge_weight.to_string(),
            &["FLAVOUR_GRAPH_SUBCATEGORY_EDGE_WEIGHT"],
        ),
        entry(
            "graph.normalize_copurchase",
            graph.normalize_copurchase.to_string(),
            &["FLAVOUR_GRAPH_NORMALIZE_COPURCHASE"],
        ),
        entry(
            "graph.coefficients.ingredient",
            graph.coefficients.ingredient.to_string(),
            &["FLAVOUR_GRAPH_INGREDIENT_COEFFICIENT"],
        ),
        entry(
            "graph.coefficients.user",
            graph.coefficients.user.to_string(),
            &["FLAVOUR_GRAPH_USER_COEFFICIENT"],
        ),
        entry(
            "graph.coefficients.tag",
            graph.coefficients.tag.to_string(),
            &["FLAVOUR_GRAPH_TAG_COEFFICIENT"],
        ),
        entry("selection.count", selection.count.to_string(), &["FLAVOUR_SELECTION_COUNT"]),
        entry(
            "selection.penalty_mode",
            selection.penalty_mode.to_string(),
            &["FLAVOUR_SELECTION_PENALTY_MODE"],
        ),
        entry(
            "selection.penalty_scale",
            selection.penalty_scale.to_string(),
            &["FLAVOUR_SELECTION_PENALTY_SCALE"],
        ),
        entry(
            "selection.proportional_cap",
            selection.proportional_cap.to_string(),
            &["FLAVOUR_SELECTION_PROPORTIONAL_CAP"],
        ),
        entry(
            "selection.proportional_floor",
            selection.proportional_floor.to_string(),
            &["FLAVOUR_SELECTION_PROPORTIONAL_FLOOR"],
        ),
        entry(
            "data.dataset_path",
            config.data.dataset_path.display().to_string(),
            &["FLAVOUR_DATA_DATASET_PATH"],
        ),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["FLAVOUR_LOGGING_LEVEL", "FLAVOUR_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["FLAVOUR_LOGGING_FORMAT", "FLAVOUR_LOG_FORMAT"],
        ),
    ]
}

struct ConfigEntry {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn entry(key: &'static str, value: String, env_keys: &'static [&'static str]) -> ConfigEntry {
    ConfigEntry { key, value, env_keys }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        if env::var(env_key).is_ok_and(|value| !value.trim().is_empty()) {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
