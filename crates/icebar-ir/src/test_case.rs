use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Provenance of a test, which decides whether it may be kept permanently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// A single, unambiguous counterexample witness.
    CounterexampleTrusted,
    /// One of several alternative witnesses for the same counterexample.
    CounterexampleUntrusted,
    /// Derived from an assertion; arrives as a positive/negative pair.
    Predicate,
    /// Seeded externally before the search starts.
    Initial,
}

impl TestKind {
    pub fn is_trusted(self) -> bool {
        matches!(self, TestKind::CounterexampleTrusted | TestKind::Initial)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestKind::CounterexampleTrusted => "counterexample_trusted",
            TestKind::CounterexampleUntrusted => "counterexample_untrusted",
            TestKind::Predicate => "predicate",
            TestKind::Initial => "initial",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestError {
    #[error("malformed {kind} test: both predicate and command are empty")]
    Malformed { kind: TestKind },
}

/// Content hash of a test (hex SHA-256 over predicate and command).
///
/// The kind is deliberately excluded: the same witness reported once as
/// trusted and once as untrusted is still the same constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TestHash(String);

impl TestHash {
    pub fn of(predicate: &str, command: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(predicate.trim().as_bytes());
        hasher.update([0u8]);
        hasher.update(command.trim().as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            out.push_str(&format!("{byte:02x}"));
        }
        TestHash(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..12.min(self.0.len())])
    }
}

/// A concrete test: a predicate body plus the run/check command exercising it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyTest {
    kind: TestKind,
    predicate: String,
    command: String,
    hash: TestHash,
}

impl PropertyTest {
    pub fn new(
        kind: TestKind,
        predicate: impl Into<String>,
        command: impl Into<String>,
    ) -> Result<Self, TestError> {
        let predicate = predicate.into();
        let command = command.into();
        if predicate.trim().is_empty() && command.trim().is_empty() {
            return Err(TestError::Malformed { kind });
        }
        let hash = TestHash::of(&predicate, &command);
        Ok(Self {
            kind,
            predicate,
            command,
            hash,
        })
    }

    pub fn kind(&self) -> TestKind {
        self.kind
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn hash(&self) -> &TestHash {
        &self.hash
    }

    /// Re-tag a trusted test as an untrusted counterexample.
    ///
    /// Tests produced under relaxed facts never keep trusted status.
    pub fn demoted(mut self) -> Self {
        if self.kind.is_trusted() {
            self.kind = TestKind::CounterexampleUntrusted;
        }
        self
    }

    /// Render the test the way it is appended to the tests file.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.predicate.trim().is_empty() {
            out.push_str(self.predicate.trim_end());
            out.push('\n');
        }
        if !self.command.trim().is_empty() {
            out.push_str(self.command.trim_end());
            out.push('\n');
        }
        out
    }
}

/// One logical choice reported by the verification oracle.
///
/// Multi-branch tests and predicate pairs expand into several child
/// candidates; they are never merged into a single pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchingTest {
    Single(PropertyTest),
    /// Mutually exclusive alternatives; each alternative may hold several tests.
    MultiBranch(Vec<Vec<PropertyTest>>),
    PredicatePair {
        positive: Vec<PropertyTest>,
        negative: Vec<PropertyTest>,
    },
}

impl BranchingTest {
    /// The alternatives a branching step must choose between.
    ///
    /// A predicate pair always yields exactly two alternatives, even when one
    /// side is empty; empty alternatives are dropped later, per combination.
    pub fn alternatives(&self) -> Vec<Vec<PropertyTest>> {
        match self {
            BranchingTest::Single(test) => vec![vec![test.clone()]],
            BranchingTest::MultiBranch(alternatives) => alternatives.clone(),
            BranchingTest::PredicatePair { positive, negative } => {
                vec![positive.clone(), negative.clone()]
            }
        }
    }

    /// True when the test claims to branch but carries fewer than two usable
    /// alternatives (for example after duplicate filtering upstream).
    pub fn is_degenerate(&self) -> bool {
        match self {
            BranchingTest::Single(_) => false,
            BranchingTest::MultiBranch(alternatives) => {
                alternatives.iter().filter(|alt| !alt.is_empty()).count() < 2
            }
            BranchingTest::PredicatePair { positive, negative } => {
                positive.is_empty() || negative.is_empty()
            }
        }
    }

    pub fn tests(&self) -> impl Iterator<Item = &PropertyTest> + '_ {
        let tests: Vec<&PropertyTest> = match self {
            BranchingTest::Single(test) => vec![test],
            BranchingTest::MultiBranch(alternatives) => alternatives.iter().flatten().collect(),
            BranchingTest::PredicatePair { positive, negative } => {
                positive.iter().chain(negative.iter()).collect()
            }
        };
        tests.into_iter()
    }

    /// Apply `f` to every contained test, keeping the branching shape.
    pub fn map_tests(self, f: impl Fn(PropertyTest) -> PropertyTest) -> Self {
        match self {
            BranchingTest::Single(test) => BranchingTest::Single(f(test)),
            BranchingTest::MultiBranch(alternatives) => BranchingTest::MultiBranch(
                alternatives
                    .into_iter()
                    .map(|alt| alt.into_iter().map(&f).collect())
                    .collect(),
            ),
            BranchingTest::PredicatePair { positive, negative } => BranchingTest::PredicatePair {
                positive: positive.into_iter().map(&f).collect(),
                negative: negative.into_iter().map(&f).collect(),
            },
        }
    }
}

/// Insertion-ordered, hash-deduplicated set of tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestPool {
    tests: IndexMap<TestHash, PropertyTest>,
}

impl TestPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a test; returns false if a test with the same hash was present.
    pub fn insert(&mut self, test: PropertyTest) -> bool {
        if self.tests.contains_key(test.hash()) {
            return false;
        }
        self.tests.insert(test.hash().clone(), test);
        true
    }

    pub fn contains(&self, hash: &TestHash) -> bool {
        self.tests.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyTest> + '_ {
        self.tests.values()
    }

    pub fn into_vec(self) -> Vec<PropertyTest> {
        self.tests.into_values().collect()
    }
}

impl FromIterator<PropertyTest> for TestPool {
    fn from_iter<I: IntoIterator<Item = PropertyTest>>(iter: I) -> Self {
        let mut pool = TestPool::new();
        for test in iter {
            pool.insert(test);
        }
        pool
    }
}

impl Extend<PropertyTest> for TestPool {
    fn extend<I: IntoIterator<Item = PropertyTest>>(&mut self, iter: I) {
        for test in iter {
            self.insert(test);
        }
    }
}
