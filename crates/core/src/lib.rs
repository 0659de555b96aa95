pub mod config;
pub mod dataset;
pub mod domain;
pub mod errors;
pub mod graph;
pub mod parsers;
pub mod scoring;
pub mod seed;
pub mod selection;

pub use config::{AppConfig, GraphConfig, PenaltyMode, SelectionConfig};
pub use dataset::Dataset;
pub use domain::product::{Ingredient, Product, ProductId};
pub use domain::weight::{Weight, WeightCoefficients};
pub use errors::{ApplicationError, DatasetError, DomainError};
pub use graph::{BuiltGraph, Edge, EdgeSources, GraphBuilder, GraphStats, ProductGraph};
pub use scoring::{CoPurchaseTable, SimilarityScorer};
pub use seed::PrioritySeed;
pub use selection::{
    penalty_policy, IndexedPriorityQueue, LinearPenalty, PenaltyPolicy, ProportionalPenalty,
    SelectionEngine, SelectionOutcome, SelectionStep,
};
