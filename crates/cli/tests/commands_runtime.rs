use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use flavour_cli::commands::graph::{self, GraphArgs};
use flavour_cli::commands::select::{self, SelectArgs};
use flavour_cli::commands::similar::{self, SimilarArgs};
use flavour_cli::commands::config;
use flavour_core::config::PenaltyMode;
use serde_json::Value;
use tempfile::TempDir;

const CATALOG: &str = r#"{
    "products": [
        {"id": "A", "name": "Cola", "subcategory": "cola", "tags": ["t0","t1","t2","t3","t4","t5","t6","t7","t8","t9"]},
        {"id": "B", "name": "Cola zero", "subcategory": "diet", "tags": ["t0","t1","t2","t3","t4","t5","t6","t7","t8","t9"]},
        {"id": "C", "name": "Sparkling water", "subcategory": "water"}
    ],
    "priorities": {"A": 5, "B": 4, "C": 3}
}"#;

#[test]
fn select_returns_diverse_products_as_json() {
    with_env(&[("FLAVOUR_GRAPH_MIN_EDGE_WEIGHT", "1")], |dataset| {
        let result = select::run(SelectArgs {
            count: Some(2),
            dataset: Some(dataset),
            penalty: None,
            json: true,
        });
        assert_eq!(result.exit_code, 0, "expected successful selection: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "select");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["selected"], serde_json::json!(["A", "C"]));
        assert_eq!(payload["data"]["exhausted"], false);
        assert_eq!(payload["data"]["products"][1]["name"], "Sparkling water");
    });
}

#[test]
fn select_reports_exhaustion_in_text_output() {
    with_env(&[], |dataset| {
        let result = select::run(SelectArgs {
            count: Some(10),
            dataset: Some(dataset),
            penalty: Some(PenaltyMode::Proportional),
            json: false,
        });
        assert_eq!(result.exit_code, 0);
        let first = result.output.lines().next().unwrap_or_default();
        assert!(first.contains("exhausted"), "unexpected header: {first}");
        assert_eq!(result.output.lines().count(), 4);
    });
}

#[test]
fn select_returns_dataset_failure_for_missing_file() {
    with_env(&[], |dataset| {
        let missing = dataset.with_file_name("absent.json");
        let result = select::run(SelectArgs {
            dataset: Some(missing),
            json: true,
            ..SelectArgs::default()
        });
        assert_eq!(result.exit_code, 3, "expected dataset failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "dataset");
    });
}

#[test]
fn select_returns_config_failure_for_invalid_env() {
    with_env(&[("FLAVOUR_SELECTION_PENALTY_SCALE", "-2")], |dataset| {
        let result = select::run(SelectArgs { dataset: Some(dataset), ..SelectArgs::default() });
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn graph_reports_stats_and_exports_edges() {
    with_env(&[("FLAVOUR_GRAPH_MIN_EDGE_WEIGHT", "1")], |dataset| {
        let export_path = dataset.with_file_name("out").join("graph.json");
        let result = graph::run(GraphArgs {
            dataset: Some(dataset),
            export: Some(export_path.clone()),
        });
        assert_eq!(result.exit_code, 0, "expected graph success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["products"], 3);
        assert_eq!(payload["data"]["edges"], 1);

        let exported = fs::read_to_string(&export_path).expect("export file written");
        let document: Value = serde_json::from_str(&exported).expect("export is JSON");
        assert_eq!(document["edges"][0]["source"], "A");
        assert_eq!(document["edges"][0]["target"], "B");
        assert_eq!(document["products"].as_array().map(Vec::len), Some(3));
    });
}

#[test]
fn similar_lists_neighbours_and_rejects_unknown_products() {
    with_env(&[("FLAVOUR_GRAPH_MIN_EDGE_WEIGHT", "1")], |dataset| {
        let result = similar::run(SimilarArgs {
            product: "A".to_string(),
            top: 5,
            dataset: Some(dataset.clone()),
        });
        assert_eq!(result.exit_code, 0);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"][0]["id"], "B");
        assert_eq!(payload["data"][0]["total"], 10.0);

        let missing = similar::run(SimilarArgs {
            product: "Z".to_string(),
            top: 5,
            dataset: Some(dataset),
        });
        assert_eq!(missing.exit_code, 4);
        assert_eq!(parse_payload(&missing.output)["error_class"], "unknown_product");
    });
}

#[test]
fn config_attributes_env_sources() {
    with_env(&[("FLAVOUR_SELECTION_COUNT", "7"), ("FLAVOUR_LOG_LEVEL", "debug")], |_| {
        let result = config::run();
        assert_eq!(result.exit_code, 0);
        assert!(result
            .output
            .contains("- selection.count = 7 (source: env (FLAVOUR_SELECTION_COUNT))"));
        assert!(result.output.contains("- logging.level = debug (source: env (FLAVOUR_LOG_LEVEL))"));
        assert!(result.output.contains("- graph.min_edge_weight = 5 (source: default)"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce(PathBuf)) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "FLAVOUR_GRAPH_MIN_EDGE_WEIGHT",
        "FLAVOUR_GRAPH_SUBCATEGORY_EDGE_WEIGHT",
        "FLAVOUR_GRAPH_NORMALIZE_COPURCHASE",
        "FLAVOUR_GRAPH_INGREDIENT_COEFFICIENT",
        "FLAVOUR_GRAPH_USER_COEFFICIENT",
        "FLAVOUR_GRAPH_TAG_COEFFICIENT",
        "FLAVOUR_SELECTION_COUNT",
        "FLAVOUR_SELECTION_PENALTY_MODE",
        "FLAVOUR_SELECTION_PENALTY_SCALE",
        "FLAVOUR_SELECTION_PROPORTIONAL_CAP",
        "FLAVOUR_SELECTION_PROPORTIONAL_FLOOR",
        "FLAVOUR_DATA_DATASET_PATH",
        "FLAVOUR_LOGGING_LEVEL",
        "FLAVOUR_LOGGING_FORMAT",
        "FLAVOUR_LOG_LEVEL",
        "FLAVOUR_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    let dir = TempDir::new().expect("temp dir");
    let dataset = dir.path().join("dataset.json");
    fs::write(&dataset, CATALOG).expect("dataset written");

    test_fn(dataset);

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
