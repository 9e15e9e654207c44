//! Expansion of ambiguous counterexample evidence into child test sets.
//!
//! Each test of a bucket contributes its alternatives; every child candidate
//! receives one alternative per test. Both functions here are pure.

use icebar_ir::test_case::{BranchingTest, PropertyTest};
use tracing::warn;

/// Every way of picking one element from each of `choices`, in order.
///
/// The product is built iteratively; with no choices at all it holds a
/// single empty combination, and any empty choice list empties it.
pub fn cartesian_product<T: Clone>(choices: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut product: Vec<Vec<T>> = vec![Vec::new()];
    for options in choices {
        let mut next = Vec::with_capacity(product.len() * options.len());
        for prefix in &product {
            for option in options {
                let mut combination = Vec::with_capacity(prefix.len() + 1);
                combination.extend_from_slice(prefix);
                combination.push(option.clone());
                next.push(combination);
            }
        }
        product = next;
    }
    product
}

/// The alternatives a test contributes to the product.
///
/// A degenerate branching test falls back to its usable alternatives (at
/// most one); a test with none left contributes nothing and is skipped.
fn usable_alternatives(test: &BranchingTest) -> Option<Vec<Vec<PropertyTest>>> {
    let alternatives = test.alternatives();
    if !test.is_degenerate() {
        return Some(alternatives);
    }
    let usable: Vec<Vec<PropertyTest>> = alternatives
        .into_iter()
        .filter(|alt| !alt.is_empty())
        .collect();
    if usable.is_empty() {
        warn!("branching test has no usable alternative; skipping it");
        return None;
    }
    warn!(
        alternatives = usable.len(),
        "branching test lost its alternatives; producing a single branch"
    );
    Some(usable)
}

/// Flattened test sets, one per child candidate, for a whole bucket.
///
/// Combinations that select only empty alternatives are dropped.
pub fn bucket_combinations(bucket: &[BranchingTest]) -> Vec<Vec<PropertyTest>> {
    let choices: Vec<Vec<Vec<PropertyTest>>> =
        bucket.iter().filter_map(usable_alternatives).collect();
    if choices.is_empty() {
        return Vec::new();
    }
    cartesian_product(&choices)
        .into_iter()
        .map(|combination| combination.into_iter().flatten().collect::<Vec<_>>())
        .filter(|tests| !tests.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use icebar_ir::proptest_generators::arb_branching_test;
    use icebar_ir::test_case::TestKind;
    use proptest::prelude::*;

    fn t(name: &str) -> PropertyTest {
        PropertyTest::new(
            TestKind::CounterexampleUntrusted,
            format!("pred {name} {{}}"),
            format!("run {name} expect 1"),
        )
        .unwrap()
    }

    fn pair(name: &str) -> BranchingTest {
        BranchingTest::PredicatePair {
            positive: vec![t(&format!("{name}_pos"))],
            negative: vec![t(&format!("{name}_neg"))],
        }
    }

    #[test]
    fn product_of_nothing_is_one_empty_combination() {
        let product = cartesian_product::<u8>(&[]);
        assert_eq!(product, vec![Vec::<u8>::new()]);
    }

    #[test]
    fn product_enumerates_in_order() {
        let product = cartesian_product(&[vec![1, 2], vec![10, 20, 30]]);
        assert_eq!(
            product,
            vec![
                vec![1, 10],
                vec![1, 20],
                vec![1, 30],
                vec![2, 10],
                vec![2, 20],
                vec![2, 30],
            ]
        );
    }

    #[test]
    fn product_with_empty_choice_is_empty() {
        assert!(cartesian_product(&[vec![1], vec![]]).is_empty());
    }

    #[test]
    fn two_two_way_tests_give_four_children() {
        let bucket = vec![
            BranchingTest::MultiBranch(vec![vec![t("a1")], vec![t("a2")]]),
            BranchingTest::MultiBranch(vec![vec![t("b1")], vec![t("b2")]]),
        ];
        let combos = bucket_combinations(&bucket);
        assert_eq!(combos.len(), 4);
        assert!(combos.iter().all(|c| c.len() == 2));
    }

    #[test]
    fn single_tests_appear_in_every_combination() {
        let fixed = t("fixed");
        let bucket = vec![BranchingTest::Single(fixed.clone()), pair("p")];
        let combos = bucket_combinations(&bucket);
        assert_eq!(combos.len(), 2);
        assert!(combos.iter().all(|c| c.contains(&fixed)));
    }

    #[test]
    fn degenerate_pair_falls_back_to_one_branch() {
        let bucket = vec![BranchingTest::PredicatePair {
            positive: vec![t("only")],
            negative: vec![],
        }];
        assert_eq!(bucket_combinations(&bucket), vec![vec![t("only")]]);
    }

    #[test]
    fn test_without_alternatives_is_skipped() {
        let bucket = vec![BranchingTest::MultiBranch(vec![]), pair("p")];
        assert_eq!(bucket_combinations(&bucket).len(), 2);
        assert!(bucket_combinations(&[BranchingTest::MultiBranch(vec![vec![]])]).is_empty());
    }

    #[test]
    fn empty_combinations_are_dropped() {
        let bucket = vec![
            BranchingTest::MultiBranch(vec![vec![t("a")], vec![], vec![t("c")]]),
            BranchingTest::MultiBranch(vec![vec![], vec![t("y")], vec![t("z")]]),
        ];
        // 3 x 3 combinations, one of which selects nothing.
        assert_eq!(bucket_combinations(&bucket).len(), 8);
    }

    proptest! {
        #[test]
        fn product_size_is_product_of_alternative_counts(
            bucket in proptest::collection::vec(arb_branching_test(), 1..5)
        ) {
            let expected: usize = bucket.iter().map(|b| b.alternatives().len()).product();
            prop_assert_eq!(bucket_combinations(&bucket).len(), expected);
        }

        #[test]
        fn pairs_always_double(n in 1usize..6) {
            let bucket: Vec<BranchingTest> = (0..n).map(|i| pair(&format!("p{i}"))).collect();
            prop_assert_eq!(bucket_combinations(&bucket).len(), 1usize << n);
        }
    }
}
