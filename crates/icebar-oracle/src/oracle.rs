//! Oracle traits and the verdicts they return.

use icebar_ir::model::ModelVariant;
use icebar_ir::test_case::{BranchingTest, PropertyTest, TestError};
use thiserror::Error;

use crate::workspace::ArtifactError;

/// Outcome of a successful repair-oracle call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairVerdict {
    /// All tests pass on the repaired model.
    Repaired {
        model: ModelVariant,
        used_tests: usize,
    },
    /// The oracle produced a model that passes only part of the tests.
    PartialRepair {
        model: ModelVariant,
        used_tests: usize,
    },
    NotRepaired,
    /// Nothing to repair against; the process was not invoked.
    NoTests,
}

impl RepairVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairVerdict::Repaired { .. } => "repaired",
            RepairVerdict::PartialRepair { .. } => "partial_repair",
            RepairVerdict::NotRepaired => "not_repaired",
            RepairVerdict::NoTests => "no_tests",
        }
    }
}

#[derive(Debug, Error)]
pub enum RepairOracleError {
    #[error("repair oracle I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("repair oracle not found: {0}")]
    NotFound(String),
    /// A named external failure mode that may be downgraded to not-repaired.
    #[error("repair oracle crashed with tolerated failure `{marker}`: {message}")]
    ToleratedCrash { marker: String, message: String },
    #[error("repair oracle failed (exit code {code:?}): {message}")]
    Failed { code: Option<i32>, message: String },
    #[error("repair oracle artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

impl RepairOracleError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RepairOracleError::ToleratedCrash { .. })
    }
}

/// Outcome of a check-mode verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckVerdict {
    Pass { passing_properties: usize },
    Fail { passing_properties: usize },
}

impl CheckVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, CheckVerdict::Pass { .. })
    }

    pub fn passing_properties(&self) -> usize {
        match self {
            CheckVerdict::Pass { passing_properties }
            | CheckVerdict::Fail { passing_properties } => *passing_properties,
        }
    }
}

/// Flags for a generate-mode verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerateRequest {
    /// First index available for naming generated tests.
    pub from_index: usize,
    pub relaxed_facts: bool,
    pub force_assertion_tests: bool,
    pub instance_tests: bool,
}

/// Classified tests produced by a generate-mode verification call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedTests {
    pub trusted: Vec<PropertyTest>,
    pub untrusted: Vec<BranchingTest>,
    pub predicates: Vec<BranchingTest>,
    /// Highest test index used while naming the generated tests.
    pub highest_index: usize,
}

impl GeneratedTests {
    pub fn is_empty(&self) -> bool {
        self.trusted.is_empty() && self.untrusted.is_empty() && self.predicates.is_empty()
    }

    /// Every concrete test, across categories and alternatives.
    pub fn all_tests(&self) -> impl Iterator<Item = &PropertyTest> + '_ {
        self.trusted.iter().chain(
            self.untrusted
                .iter()
                .chain(self.predicates.iter())
                .flat_map(|t| t.tests()),
        )
    }
}

#[derive(Debug, Error)]
pub enum VerifyOracleError {
    #[error("verification oracle I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("verification oracle not found: {0}")]
    NotFound(String),
    #[error("verification oracle failed (exit code {code:?}): {message}")]
    Failed { code: Option<i32>, message: String },
    #[error("failed to parse verification oracle output: {0}")]
    ParseError(String),
    #[error("verification oracle produced a malformed test: {0}")]
    MalformedTest(#[from] TestError),
    #[error("verification oracle artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Synthesizes a candidate fix from a pool of tests.
pub trait RepairOracle {
    fn repair(
        &mut self,
        model: &ModelVariant,
        tests: &[PropertyTest],
    ) -> Result<RepairVerdict, RepairOracleError>;
}

/// Checks a model against the full property oracle and derives tests from
/// its counterexamples.
pub trait VerifyOracle {
    fn check(&mut self, model: &ModelVariant) -> Result<CheckVerdict, VerifyOracleError>;

    fn generate(
        &mut self,
        model: &ModelVariant,
        request: &GenerateRequest,
    ) -> Result<GeneratedTests, VerifyOracleError>;
}

impl<T: RepairOracle + ?Sized> RepairOracle for &mut T {
    fn repair(
        &mut self,
        model: &ModelVariant,
        tests: &[PropertyTest],
    ) -> Result<RepairVerdict, RepairOracleError> {
        (**self).repair(model, tests)
    }
}

impl<T: VerifyOracle + ?Sized> VerifyOracle for &mut T {
    fn check(&mut self, model: &ModelVariant) -> Result<CheckVerdict, VerifyOracleError> {
        (**self).check(model)
    }

    fn generate(
        &mut self,
        model: &ModelVariant,
        request: &GenerateRequest,
    ) -> Result<GeneratedTests, VerifyOracleError> {
        (**self).generate(model, request)
    }
}
