use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::parsers::parse_amount;

pub const UNKNOWN_SUBCATEGORY: &str = "Unknown";

/// Stable product key, usually a normalized EAN/GTIN.
///
/// Ordering is plain lexicographic byte order and is the tie-break key for
/// every ordering decision in graph building and selection.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    /// Fractional amount (usually a percentage). `None` when the source had no
    /// amount or the amount could not be read.
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amount: Option<f64>,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, amount: Option<f64>) -> Self {
        let amount = amount.filter(|value| value.is_finite() && *value >= 0.0);
        Self { name: name.into(), amount }
    }

    pub fn key(&self) -> String {
        ingredient_key(&self.name)
    }
}

pub fn ingredient_key(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub subcategory: String,
    pub ingredients: Vec<Ingredient>,
    pub tags: BTreeSet<String>,
}

impl Product {
    pub fn new(id: impl Into<ProductId>) -> Self {
        let id = id.into();
        Self {
            name: id.0.clone(),
            id,
            subcategory: UNKNOWN_SUBCATEGORY.to_owned(),
            ingredients: Vec::new(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = subcategory.into();
        self
    }

    pub fn with_ingredient(mut self, name: impl Into<String>, amount: Option<f64>) -> Self {
        self.ingredients.push(Ingredient::new(name, amount));
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let amount = match raw {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => parse_amount(&text),
        _ => None,
    };
    let amount = amount.filter(|value| value.is_finite() && *value >= 0.0);
    if amount.is_none() {
        tracing::debug!(
            event_name = "product.ingredient.amount_absent",
            "ingredient amount missing or malformed, treating as absent"
        );
    }
    Ok(amount)
}
