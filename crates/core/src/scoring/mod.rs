//! Pairwise similarity signals between products.
//!
//! Three independent signals feed an edge [`Weight`]: ingredient overlap
//! (Jaccard plus amount agreement), shared tags, and co-purchase frequency.

mod copurchase;

use std::collections::{BTreeMap, BTreeSet};

pub use copurchase::{copurchase_weight, CoPurchaseTable};

use crate::domain::product::{Ingredient, Product};
use crate::domain::weight::{Weight, WeightCoefficients};

/// Scale applied to the Jaccard index of the ingredient name sets.
pub const JACCARD_SCALE: f64 = 5.0;

/// Scale applied to the mean amount ratio of shared ingredients.
pub const AMOUNT_SCALE: f64 = 3.0;

/// Ingredient similarity between two products.
///
/// `jaccard * 5 + shared_count + mean_amount_ratio * 3`, where the amount
/// ratio of a shared ingredient is `min / max` of its two amounts. Shared
/// ingredients lacking an amount on either side contribute nothing to the
/// ratio, so a pair with no usable amounts degrades to overlap-only scoring.
pub fn ingredient_similarity(left: &[Ingredient], right: &[Ingredient]) -> f64 {
    let left = ingredient_map(left);
    let right = ingredient_map(right);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.keys().filter(|name| right.contains_key(*name)).collect::<Vec<_>>();
    if shared.is_empty() {
        return 0.0;
    }

    let union = left.len() + right.len() - shared.len();
    let jaccard = shared.len() as f64 / union as f64;

    let ratio_sum: f64 =
        shared.iter().map(|name| amount_ratio(left[*name], right[*name])).sum();
    let mean_ratio = ratio_sum / shared.len() as f64;

    jaccard * JACCARD_SCALE + shared.len() as f64 + mean_ratio * AMOUNT_SCALE
}

/// Number of tags present on both products.
pub fn tag_similarity(left: &BTreeSet<String>, right: &BTreeSet<String>) -> u32 {
    left.intersection(right).count() as u32
}

fn ingredient_map(ingredients: &[Ingredient]) -> BTreeMap<String, Option<f64>> {
    ingredients
        .iter()
        .map(|ingredient| (ingredient.key(), ingredient.amount))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

fn amount_ratio(left: Option<f64>, right: Option<f64>) -> f64 {
    match (left, right) {
        (Some(left), Some(right)) => {
            let high = left.max(right);
            if high > 0.0 {
                left.min(right) / high
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Produces edge weights for product pairs against one co-purchase table.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityScorer<'a> {
    relations: &'a CoPurchaseTable,
    normalize_copurchase: bool,
    coefficients: WeightCoefficients,
}

impl<'a> SimilarityScorer<'a> {
    pub fn new(
        relations: &'a CoPurchaseTable,
        normalize_copurchase: bool,
        coefficients: WeightCoefficients,
    ) -> Self {
        Self { relations, normalize_copurchase, coefficients }
    }

    pub fn coefficients(&self) -> &WeightCoefficients {
        &self.coefficients
    }

    pub fn weight(&self, left: &Product, right: &Product) -> Weight {
        Weight::new(
            ingredient_similarity(&left.ingredients, &right.ingredients),
            copurchase_weight(&left.id, &right.id, self.relations, self.normalize_copurchase),
            f64::from(tag_similarity(&left.tags, &right.tags)),
        )
    }

    pub fn total(&self, weight: &Weight) -> f64 {
        weight.total(&self.coefficients)
    }
}
