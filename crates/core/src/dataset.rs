//! JSON catalogue loader.
//!
//! A dataset file carries the product catalogue plus the optional co-purchase
//! relations, explicit priorities and raw sales records that feed graph
//! building and selection.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::product::{Ingredient, Product, ProductId, UNKNOWN_SUBCATEGORY};
use crate::errors::DatasetError;
use crate::graph::{BuiltGraph, GraphBuilder};
use crate::parsers::parse_ingredient_statement;
use crate::scoring::CoPurchaseTable;
use crate::seed::PrioritySeed;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub products: Vec<Product>,
    pub relations: CoPurchaseTable,
    pub seed: PrioritySeed,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| DatasetError::ReadFile { path: path.to_path_buf(), source })?;
        let dataset = Self::from_json_str(&raw)
            .map_err(|source| DatasetError::ParseFile { path: path.to_path_buf(), source })?;

        info!(
            event_name = "dataset.loaded",
            path = %path.display(),
            products = dataset.products.len(),
            relations = dataset.relations.len(),
            seeded = dataset.seed.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let record = serde_json::from_str::<DatasetRecord>(raw)?;
        Ok(record.into_dataset())
    }

    pub fn build_graph(&self, builder: &GraphBuilder) -> BuiltGraph {
        builder.build(&self.products, &self.relations)
    }
}

#[derive(Debug, Deserialize)]
struct DatasetRecord {
    products: Vec<ProductRecord>,
    #[serde(default)]
    relations: BTreeMap<String, RelationRecord>,
    #[serde(default)]
    priorities: BTreeMap<String, f64>,
    #[serde(default)]
    sales: Vec<EanRecord>,
}

#[derive(Debug, Deserialize)]
struct ProductRecord {
    #[serde(alias = "gtin")]
    id: EanRecord,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    subcategory: Option<String>,
    #[serde(default)]
    ingredients: Vec<Ingredient>,
    #[serde(default)]
    ingredient_statement: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RelationRecord {
    #[serde(default)]
    related_products: Vec<RelatedProductRecord>,
}

#[derive(Debug, Deserialize)]
struct RelatedProductRecord {
    product: EanRecord,
    #[serde(default)]
    co_purchase_count: u64,
}

/// Identifiers show up as strings or as bare JSON numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EanRecord {
    Text(String),
    Integer(u64),
    Float(f64),
}

impl EanRecord {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text.trim().to_owned(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) if value.fract() == 0.0 && value >= 0.0 => format!("{value:.0}"),
            Self::Float(value) => value.to_string(),
        }
    }
}

impl DatasetRecord {
    fn into_dataset(self) -> Dataset {
        let mut seen = BTreeSet::new();
        let mut products = Vec::with_capacity(self.products.len());
        for record in self.products {
            let product = record.into_product();
            if product.id.as_str().is_empty() {
                warn!(event_name = "dataset.product.missing_id", "product without id skipped");
                continue;
            }
            if !seen.insert(product.id.clone()) {
                warn!(
                    event_name = "dataset.product.duplicate",
                    product_id = %product.id,
                    "duplicate product dropped, first occurrence kept"
                );
                continue;
            }
            products.push(product);
        }

        let relations = self
            .relations
            .into_iter()
            .flat_map(|(source, relation)| {
                let source = ProductId(source.trim().to_owned());
                relation.related_products.into_iter().map(move |related| {
                    let target = ProductId(related.product.into_string());
                    (source.clone(), target, related.co_purchase_count)
                })
            })
            .collect::<CoPurchaseTable>();

        let seed = if self.priorities.is_empty() {
            PrioritySeed::from_sales(self.sales.into_iter().map(EanRecord::into_string))
        } else {
            self.priorities
                .into_iter()
                .map(|(id, priority)| (ProductId(id.trim().to_owned()), priority))
                .collect()
        };

        Dataset { products, relations, seed }
    }
}

impl ProductRecord {
    fn into_product(self) -> Product {
        let id = ProductId(self.id.into_string());
        let ingredients = if self.ingredients.is_empty() {
            self.ingredient_statement.as_deref().map(parse_ingredient_statement).unwrap_or_default()
        } else {
            self.ingredients
        };

        Product {
            name: self.name.unwrap_or_else(|| id.0.clone()),
            subcategory: self
                .subcategory
                .map(|value| value.trim().to_owned())
                .unwrap_or_else(|| UNKNOWN_SUBCATEGORY.to_owned()),
            ingredients,
            tags: self
                .tags
                .into_iter()
                .map(|tag| tag.trim().to_owned())
                .filter(|tag| !tag.is_empty())
                .collect(),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;

    use tempfile::TempDir;

    use super::Dataset;
    use crate::domain::product::{ProductId, UNKNOWN_SUBCATEGORY};
    use crate::errors::DatasetError;

    fn id(value: &str) -> ProductId {
        ProductId::from(value)
    }

    const CATALOG: &str = r#"{
        "products": [
            {"id": "07310350118342", "name": "Lemon soda", "subcategory": "Soda",
             "ingredients": [{"name": "Water", "amount": 90}, {"name": "Sugar", "amount": "8,5 %"}],
             "tags": ["soda", " citrus "]},
            {"gtin": 7310350118359, "ingredient_statement": "Ingredienser: vatten, socker (6%), citronsyra",
             "tags": ["soda"]},
            {"id": "07310350118342", "name": "Duplicate"}
        ],
        "relations": {
            "07310350118342": {"related_products": [{"product": 7310350118359, "co_purchase_count": 4}]}
        },
        "sales": ["7310350118342", "07310350118342", 7310350118359]
    }"#;

    #[test]
    fn parses_products_relations_and_sales() {
        let dataset = Dataset::from_json_str(CATALOG).expect("valid dataset");

        assert_eq!(dataset.products.len(), 2);
        let first = &dataset.products[0];
        assert_eq!(first.name, "Lemon soda");
        assert_eq!(first.ingredients[1].amount, Some(8.5));
        assert!(first.tags.contains("citrus"));

        let second = &dataset.products[1];
        assert_eq!(second.id, id("7310350118359"));
        assert_eq!(second.subcategory, UNKNOWN_SUBCATEGORY);
        assert_eq!(second.ingredients.len(), 3);
        assert_eq!(second.ingredients[1].amount, Some(6.0));

        assert_eq!(dataset.relations.count(&id("7310350118359"), &id("07310350118342")), 4);
        assert_eq!(dataset.seed.get(&id("07310350118342")), Some(2.0));
        assert_eq!(dataset.seed.resolve(&id("7310350118359")), Some(1.0));
    }

    #[test]
    fn explicit_priorities_win_over_sales() {
        let dataset = Dataset::from_json_str(
            r#"{"products": [{"id": "a"}], "priorities": {"a": 7.5}, "sales": ["a", "a"]}"#,
        )
        .expect("valid dataset");

        assert_eq!(dataset.seed.get(&id("a")), Some(7.5));
        assert_eq!(dataset.seed.len(), 1);
    }

    #[test]
    fn structured_ingredients_win_over_statement() {
        let dataset = Dataset::from_json_str(
            r#"{"products": [{"id": "a", "ingredients": [{"name": "milk"}],
                              "ingredient_statement": "water, salt"}]}"#,
        )
        .expect("valid dataset");

        let ingredients = &dataset.products[0].ingredients;
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].name, "milk");
        assert_eq!(ingredients[0].amount, None);
    }

    #[test]
    fn load_reports_io_and_parse_failures() -> Result<(), io::Error> {
        let dir = TempDir::new()?;

        let missing = Dataset::load(&dir.path().join("absent.json")).expect_err("missing file");
        assert!(matches!(missing, DatasetError::ReadFile { .. }));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{\"products\": [")?;
        let error = Dataset::load(&broken).expect_err("truncated json");
        assert!(matches!(error, DatasetError::ParseFile { ref path, .. } if *path == broken));

        let valid = dir.path().join("catalog.json");
        fs::write(&valid, CATALOG)?;
        let dataset = Dataset::load(&valid).expect("valid file");
        assert_eq!(dataset.products.len(), 2);
        Ok(())
    }
}
