//! Proptest strategies for tests and branching evidence.

use proptest::prelude::*;

use crate::test_case::{BranchingTest, PropertyTest, TestKind};

/// Strategy for a test of the given kind drawn from a small name space, so
/// generated batches contain duplicates often enough to exercise dedup.
pub fn arb_test(kind: TestKind) -> impl Strategy<Value = PropertyTest> {
    (0..24u32, any::<bool>()).prop_map(move |(n, expect)| {
        let predicate = format!("pred test_{n} {{ some Node }}");
        let command = format!("run test_{n} expect {}", u8::from(expect));
        PropertyTest::new(kind, predicate, command).expect("generated test is well formed")
    })
}

pub fn arb_untrusted_test() -> impl Strategy<Value = PropertyTest> {
    arb_test(TestKind::CounterexampleUntrusted)
}

/// Strategy for a non-degenerate branching test with 1–4 alternatives.
pub fn arb_branching_test() -> impl Strategy<Value = BranchingTest> {
    prop_oneof![
        arb_untrusted_test().prop_map(BranchingTest::Single),
        proptest::collection::vec(proptest::collection::vec(arb_untrusted_test(), 1..=2), 2..=4)
            .prop_map(BranchingTest::MultiBranch),
        (arb_test(TestKind::Predicate), arb_test(TestKind::Predicate)).prop_map(|(p, n)| {
            BranchingTest::PredicatePair {
                positive: vec![p],
                negative: vec![n],
            }
        }),
    ]
}
