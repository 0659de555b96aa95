use serde::{Deserialize, Serialize};

/// Multipliers that fold the three similarity components into one total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightCoefficients {
    /// Multiplier for ingredient similarity (default: 1.5)
    pub ingredient: f64,
    /// Multiplier for co-purchase affinity (default: 0.6)
    pub user: f64,
    /// Multiplier for tag overlap (default: 1.0)
    pub tag: f64,
}

pub const DEFAULT_COEFFICIENTS: WeightCoefficients =
    WeightCoefficients { ingredient: 1.5, user: 0.6, tag: 1.0 };

impl Default for WeightCoefficients {
    fn default() -> Self {
        DEFAULT_COEFFICIENTS
    }
}

/// Similarity between two products, split by signal.
///
/// Components are never negative; `Weight::new` clamps anything negative or
/// non-finite to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    pub ingredient_match: f64,
    pub user_match: f64,
    pub tag_match: f64,
}

impl Weight {
    pub fn new(ingredient_match: f64, user_match: f64, tag_match: f64) -> Self {
        Self {
            ingredient_match: sanitize(ingredient_match),
            user_match: sanitize(user_match),
            tag_match: sanitize(tag_match),
        }
    }

    pub fn total(&self, coefficients: &WeightCoefficients) -> f64 {
        self.ingredient_match * coefficients.ingredient
            + self.user_match * coefficients.user
            + self.tag_match * coefficients.tag
    }

    /// Component-wise sum, used when several edge rules hit the same pair.
    pub fn combine(&self, other: &Weight) -> Weight {
        Weight::new(
            self.ingredient_match + other.ingredient_match,
            self.user_match + other.user_match,
            self.tag_match + other.tag_match,
        )
    }

    pub fn is_zero(&self) -> bool {
        self.ingredient_match == 0.0 && self.user_match == 0.0 && self.tag_match == 0.0
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::{Weight, WeightCoefficients};

    #[test]
    fn total_uses_default_coefficients() {
        let weight = Weight::new(4.0, 2.0, 1.0);
        // (4.0 * 1.5) + (2.0 * 0.6) + (1.0 * 1.0) = 6.0 + 1.2 + 1.0 = 8.2
        assert!((weight.total(&WeightCoefficients::default()) - 8.2).abs() < 1e-9);
    }

    #[test]
    fn total_follows_custom_coefficients() {
        let weight = Weight::new(1.0, 1.0, 1.0);
        let coefficients = WeightCoefficients { ingredient: 0.0, user: 2.0, tag: 0.5 };
        assert!((weight.total(&coefficients) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn negative_and_nan_components_clamp_to_zero() {
        let weight = Weight::new(-1.0, f64::NAN, f64::INFINITY);
        assert!(weight.is_zero());
    }

    #[test]
    fn combine_adds_components() {
        let merged = Weight::new(3.0, 0.0, 1.0).combine(&Weight::new(0.0, 0.0, 0.5));
        assert_eq!(merged, Weight::new(3.0, 0.0, 1.5));
    }
}
