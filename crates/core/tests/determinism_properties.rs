//! Property tests: graph building and selection do not depend on the order in
//! which products arrive, and penalties only ever push priorities down.

use flavour_core::{
    CoPurchaseTable, GraphBuilder, LinearPenalty, PrioritySeed, Product, ProductId,
    ProportionalPenalty, SelectionEngine,
};
use proptest::{
    collection::vec,
    prelude::{prop_assert, prop_assert_eq, Just, Strategy},
    proptest,
    test_runner::{Config as ProptestConfig, FileFailurePersistence},
};

const PROP_CASES: u32 = 64;
const INGREDIENTS: [&str; 6] = ["water", "sugar", "salt", "citric acid", "milk", "cocoa"];
const TAGS: [&str; 4] = ["soda", "snack", "dairy", "sweet"];
const SUBCATEGORIES: [&str; 3] = ["Soda", "Chips", "Unknown"];

#[derive(Clone, Debug)]
struct Catalog {
    products: Vec<(Product, f64)>,
    relations: Vec<(usize, usize, u64)>,
}

impl Catalog {
    fn table(&self) -> CoPurchaseTable {
        let len = self.products.len();
        self.relations
            .iter()
            .filter(|(from, to, _)| *from < len && *to < len)
            .map(|(from, to, count)| {
                (self.products[*from].0.id.clone(), self.products[*to].0.id.clone(), *count)
            })
            .collect()
    }

    fn seed(&self) -> PrioritySeed {
        self.products.iter().map(|(product, priority)| (product.id.clone(), *priority)).collect()
    }

    fn products(&self) -> Vec<Product> {
        self.products.iter().map(|(product, _)| product.clone()).collect()
    }
}

fn product_strategy() -> impl Strategy<Value = (Vec<(usize, u32)>, Vec<usize>, usize, u32)> {
    (
        vec((0..INGREDIENTS.len(), 1u32..60), 0..4),
        vec(0..TAGS.len(), 0..3),
        0..SUBCATEGORIES.len(),
        0u32..100,
    )
}

fn catalog_strategy() -> impl Strategy<Value = Catalog> {
    (vec(product_strategy(), 1..12), vec((0usize..12, 0usize..12, 1u64..25), 0..8)).prop_map(
        |(records, relations)| {
            let products = records
                .into_iter()
                .enumerate()
                .map(|(index, (ingredients, tags, subcategory, priority))| {
                    let mut product = Product::new(format!("p{index:02}"))
                        .with_subcategory(SUBCATEGORIES[subcategory]);
                    for (ingredient, amount) in ingredients {
                        let amount = Some(f64::from(amount));
                        product = product.with_ingredient(INGREDIENTS[ingredient], amount);
                    }
                    for tag in tags {
                        product = product.with_tag(TAGS[tag]);
                    }
                    (product, f64::from(priority))
                })
                .collect();
            Catalog { products, relations }
        },
    )
}

/// The catalogue plus a shuffled copy of its product list.
fn shuffled_catalog_strategy() -> impl Strategy<Value = (Catalog, Vec<Product>)> {
    catalog_strategy().prop_flat_map(|catalog| {
        let shuffled = Just(catalog.products()).prop_shuffle();
        (Just(catalog), shuffled)
    })
}

fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: PROP_CASES,
        failure_persistence: Some(Box::new(FileFailurePersistence::WithSource(
            "determinism-regressions",
        ))),
        ..ProptestConfig::default()
    }
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn graph_is_independent_of_product_order((catalog, shuffled) in shuffled_catalog_strategy()) {
        let table = catalog.table();
        let builder = GraphBuilder { min_edge_weight: 2.0, ..GraphBuilder::default() };

        let original = builder.build(&catalog.products(), &table);
        let reordered = builder.build(&shuffled, &table);

        let original_edges = original.graph.edges().collect::<Vec<_>>();
        prop_assert_eq!(original_edges, reordered.graph.edges().collect::<Vec<_>>());
        prop_assert_eq!(original.stats, reordered.stats);
    }

    #[test]
    fn selection_is_independent_of_product_order(
        (catalog, shuffled) in shuffled_catalog_strategy()
    ) {
        let table = catalog.table();
        let seed = catalog.seed();
        let builder = GraphBuilder::default();

        let original = builder.build(&catalog.products(), &table);
        let reordered = builder.build(&shuffled, &table);
        let count = catalog.products.len();

        let first = SelectionEngine::new(&original.graph, LinearPenalty::default())
            .generate(count, &seed)
            .map_err(|error| proptest::test_runner::TestCaseError::fail(error.to_string()))?;
        let second = SelectionEngine::new(&reordered.graph, LinearPenalty::default())
            .generate(count, &seed)
            .map_err(|error| proptest::test_runner::TestCaseError::fail(error.to_string()))?;

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.selected.len(), count);

        let mut unique = first.selected.iter().collect::<Vec<&ProductId>>();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), count);
    }

    #[test]
    fn penalties_never_raise_priorities(catalog in catalog_strategy(), take in 1usize..15) {
        let built = GraphBuilder { min_edge_weight: 0.0, ..GraphBuilder::default() }
            .build(&catalog.products(), &catalog.table());
        let seed = catalog.seed();

        let linear = SelectionEngine::new(&built.graph, LinearPenalty { scale: 0.3 })
            .generate(take, &seed)
            .map_err(|error| proptest::test_runner::TestCaseError::fail(error.to_string()))?;
        let proportional = SelectionEngine::new(&built.graph, ProportionalPenalty::default())
            .generate(take, &seed)
            .map_err(|error| proptest::test_runner::TestCaseError::fail(error.to_string()))?;

        for outcome in [&linear, &proportional] {
            prop_assert_eq!(outcome.exhausted, take > catalog.products.len());
            for applied in outcome.steps.iter().flat_map(|step| &step.penalties) {
                prop_assert!(applied.after <= applied.before, "{:?}", applied);
            }
        }
    }
}
