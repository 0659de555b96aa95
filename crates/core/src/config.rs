use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::weight::{WeightCoefficients, DEFAULT_COEFFICIENTS};

pub const DEFAULT_CONFIG_FILE: &str = "flavour.toml";
pub const NESTED_CONFIG_FILE: &str = "config/flavour.toml";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppConfig {
    pub graph: GraphConfig,
    pub selection: SelectionConfig,
    pub data: DataConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphConfig {
    pub min_edge_weight: f64,
    pub subcategory_edge_weight: f64,
    pub normalize_copurchase: bool,
    pub coefficients: WeightCoefficients,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectionConfig {
    pub count: usize,
    pub penalty_mode: PenaltyMode,
    pub penalty_scale: f64,
    pub proportional_cap: f64,
    pub proportional_floor: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataConfig {
    pub dataset_path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyMode {
    Linear,
    Proportional,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub dataset_path: Option<PathBuf>,
    pub selection_count: Option<usize>,
    pub penalty_mode: Option<PenaltyMode>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_edge_weight: 5.0,
            subcategory_edge_weight: 0.5,
            normalize_copurchase: false,
            coefficients: DEFAULT_COEFFICIENTS,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            count: 20,
            penalty_mode: PenaltyMode::Linear,
            penalty_scale: 1.0,
            proportional_cap: 0.65,
            proportional_floor: 1.0,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            selection: SelectionConfig::default(),
            data: DataConfig { dataset_path: PathBuf::from("data/dataset.json") },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl PenaltyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Proportional => "proportional",
        }
    }
}

impl fmt::Display for PenaltyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PenaltyMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "proportional" => Ok(Self::Proportional),
            other => Err(ConfigError::Validation(format!(
                "unsupported penalty mode `{other}` (expected linear|proportional)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(graph) = patch.graph {
            if let Some(min_edge_weight) = graph.min_edge_weight {
                self.graph.min_edge_weight = min_edge_weight;
            }
            if let Some(subcategory_edge_weight) = graph.subcategory_edge_weight {
                self.graph.subcategory_edge_weight = subcategory_edge_weight;
            }
            if let Some(normalize_copurchase) = graph.normalize_copurchase {
                self.graph.normalize_copurchase = normalize_copurchase;
            }
            if let Some(coefficients) = graph.coefficients {
                if let Some(ingredient) = coefficients.ingredient {
                    self.graph.coefficients.ingredient = ingredient;
                }
                if let Some(user) = coefficients.user {
                    self.graph.coefficients.user = user;
                }
                if let Some(tag) = coefficients.tag {
                    self.graph.coefficients.tag = tag;
                }
            }
        }

        if let Some(selection) = patch.selection {
            if let Some(count) = selection.count {
                self.selection.count = count;
            }
            if let Some(penalty_mode) = selection.penalty_mode {
                self.selection.penalty_mode = penalty_mode;
            }
            if let Some(penalty_scale) = selection.penalty_scale {
                self.selection.penalty_scale = penalty_scale;
            }
            if let Some(proportional_cap) = selection.proportional_cap {
                self.selection.proportional_cap = proportional_cap;
            }
            if let Some(proportional_floor) = selection.proportional_floor {
                self.selection.proportional_floor = proportional_floor;
            }
        }

        if let Some(data) = patch.data {
            if let Some(dataset_path) = data.dataset_path {
                self.data.dataset_path = dataset_path;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FLAVOUR_GRAPH_MIN_EDGE_WEIGHT") {
            self.graph.min_edge_weight = parse_f64("FLAVOUR_GRAPH_MIN_EDGE_WEIGHT", &value)?;
        }
        if let Some(value) = read_env("FLAVOUR_GRAPH_SUBCATEGORY_EDGE_WEIGHT") {
            self.graph.subcategory_edge_weight =
                parse_f64("FLAVOUR_GRAPH_SUBCATEGORY_EDGE_WEIGHT", &value)?;
        }
        if let Some(value) = read_env("FLAVOUR_GRAPH_NORMALIZE_COPURCHASE") {
            self.graph.normalize_copurchase =
                parse_bool("FLAVOUR_GRAPH_NORMALIZE_COPURCHASE", &value)?;
        }
        if let Some(value) = read_env("FLAVOUR_GRAPH_INGREDIENT_COEFFICIENT") {
            self.graph.coefficients.ingredient =
                parse_f64("FLAVOUR_GRAPH_INGREDIENT_COEFFICIENT", &value)?;
        }
        if let Some(value) = read_env("FLAVOUR_GRAPH_USER_COEFFICIENT") {
            self.graph.coefficients.user = parse_f64("FLAVOUR_GRAPH_USER_COEFFICIENT", &value)?;
        }
        if let Some(value) = read_env("FLAVOUR_GRAPH_TAG_COEFFICIENT") {
            self.graph.coefficients.tag = parse_f64("FLAVOUR_GRAPH_TAG_COEFFICIENT", &value)?;
        }

        if let Some(value) = read_env("FLAVOUR_SELECTION_COUNT") {
            self.selection.count = parse_usize("FLAVOUR_SELECTION_COUNT", &value)?;
        }
        if let Some(value) = read_env("FLAVOUR_SELECTION_PENALTY_MODE") {
            self.selection.penalty_mode = value.parse()?;
        }
        if let Some(value) = read_env("FLAVOUR_SELECTION_PENALTY_SCALE") {
            self.selection.penalty_scale = parse_f64("FLAVOUR_SELECTION_PENALTY_SCALE", &value)?;
        }
        if let Some(value) = read_env("FLAVOUR_SELECTION_PROPORTIONAL_CAP") {
            self.selection.proportional_cap =
                parse_f64("FLAVOUR_SELECTION_PROPORTIONAL_CAP", &value)?;
        }
        if let Some(value) = read_env("FLAVOUR_SELECTION_PROPORTIONAL_FLOOR") {
            self.selection.proportional_floor =
                parse_f64("FLAVOUR_SELECTION_PROPORTIONAL_FLOOR", &value)?;
        }

        if let Some(value) = read_env("FLAVOUR_DATA_DATASET_PATH") {
            self.data.dataset_path = PathBuf::from(value);
        }

        let log_level =
            read_env("FLAVOUR_LOGGING_LEVEL").or_else(|| read_env("FLAVOUR_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FLAVOUR_LOGGING_FORMAT").or_else(|| read_env("FLAVOUR_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(dataset_path) = overrides.dataset_path {
            self.data.dataset_path = dataset_path;
        }
        if let Some(count) = overrides.selection_count {
            self.selection.count = count;
        }
        if let Some(penalty_mode) = overrides.penalty_mode {
            self.selection.penalty_mode = penalty_mode;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_graph(&self.graph)?;
        validate_selection(&self.selection)?;
        validate_data(&self.data)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_graph(graph: &GraphConfig) -> Result<(), ConfigError> {
    require_non_negative("graph.min_edge_weight", graph.min_edge_weight)?;
    require_non_negative("graph.subcategory_edge_weight", graph.subcategory_edge_weight)?;
    require_non_negative("graph.coefficients.ingredient", graph.coefficients.ingredient)?;
    require_non_negative("graph.coefficients.user", graph.coefficients.user)?;
    require_non_negative("graph.coefficients.tag", graph.coefficients.tag)?;
    Ok(())
}

fn validate_selection(selection: &SelectionConfig) -> Result<(), ConfigError> {
    if selection.count == 0 {
        return Err(ConfigError::Validation(
            "selection.count must be greater than zero".to_string(),
        ));
    }

    require_non_negative("selection.penalty_scale", selection.penalty_scale)?;
    require_non_negative("selection.proportional_floor", selection.proportional_floor)?;

    let cap = selection.proportional_cap;
    if !cap.is_finite() || !(0.0..1.0).contains(&cap) {
        return Err(ConfigError::Validation(
            "selection.proportional_cap must be in range 0.0..1.0".to_string(),
        ));
    }

    Ok(())
}

fn validate_data(data: &DataConfig) -> Result<(), ConfigError> {
    if data.dataset_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("data.dataset_path must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn require_non_negative(key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{key} must be a finite number >= 0, got {value}"
        )))
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    graph: Option<GraphPatch>,
    selection: Option<SelectionPatch>,
    data: Option<DataPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct GraphPatch {
    min_edge_weight: Option<f64>,
    subcategory_edge_weight: Option<f64>,
    normalize_copurchase: Option<bool>,
    coefficients: Option<CoefficientsPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CoefficientsPatch {
    ingredient: Option<f64>,
    user: Option<f64>,
    tag: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct SelectionPatch {
    count: Option<usize>,
    penalty_mode: Option<PenaltyMode>,
    penalty_scale: Option<f64>,
    proportional_cap: Option<f64>,
    proportional_floor: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    dataset_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
