use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::product::ProductId;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("priority update for `{id}` which was never inserted")]
    UnknownEntry { id: ProductId },
    #[error("priority delta for `{id}` must be finite and non-negative, got {delta}")]
    InvalidPriorityDelta { id: ProductId, delta: f64 },
    #[error("selection count must be greater than zero")]
    InvalidSelectionCount,
    #[error("product `{id}` is not part of the graph")]
    UnknownProduct { id: ProductId },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("could not read dataset `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse dataset `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl ApplicationError {
    /// Stable machine-readable class used in command output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::UnknownProduct { .. }) => "unknown_product",
            Self::Domain(_) => "selection",
            Self::Dataset(_) => "dataset",
            Self::Configuration(_) => "config_validation",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Dataset(_) => 3,
            Self::Domain(_) => 4,
        }
    }
}
