#![allow(dead_code)]

use std::collections::VecDeque;

use icebar_engine::SearchOptions;
use icebar_ir::model::ModelVariant;
use icebar_ir::test_case::{BranchingTest, PropertyTest, TestKind};
use icebar_oracle::{
    CheckVerdict, GenerateRequest, GeneratedTests, RepairOracle, RepairOracleError, RepairVerdict,
    VerifyOracle, VerifyOracleError,
};

pub fn model() -> ModelVariant {
    ModelVariant::new("models/bank.als", "oracles/bank_oracle.als")
}

pub fn fixed(n: usize) -> ModelVariant {
    model().repaired(format!("work/fixes/bank_fix_{n}.als"))
}

fn test(kind: TestKind, name: &str) -> PropertyTest {
    PropertyTest::new(
        kind,
        format!("pred {name} {{ some Account }}"),
        format!("run {name} expect 1"),
    )
    .unwrap_or_else(|e| panic!("bad test {name}: {e}"))
}

pub fn trusted(name: &str) -> PropertyTest {
    test(TestKind::CounterexampleTrusted, name)
}

pub fn untrusted(name: &str) -> PropertyTest {
    test(TestKind::CounterexampleUntrusted, name)
}

pub fn initial(name: &str) -> PropertyTest {
    test(TestKind::Initial, name)
}

/// A multi-branch test whose alternatives are single tests.
pub fn multi(names: &[&str]) -> BranchingTest {
    BranchingTest::MultiBranch(names.iter().map(|n| vec![untrusted(n)]).collect())
}

pub fn pair(name: &str) -> BranchingTest {
    BranchingTest::PredicatePair {
        positive: vec![test(TestKind::Predicate, &format!("{name}_pos"))],
        negative: vec![test(TestKind::Predicate, &format!("{name}_neg"))],
    }
}

pub fn with_trusted(tests: Vec<PropertyTest>) -> GeneratedTests {
    GeneratedTests {
        trusted: tests,
        ..GeneratedTests::default()
    }
}

pub fn with_untrusted(tests: Vec<BranchingTest>) -> GeneratedTests {
    GeneratedTests {
        untrusted: tests,
        ..GeneratedTests::default()
    }
}

pub fn with_predicates(tests: Vec<BranchingTest>) -> GeneratedTests {
    GeneratedTests {
        predicates: tests,
        ..GeneratedTests::default()
    }
}

pub fn repaired(n: usize) -> Result<RepairVerdict, RepairOracleError> {
    Ok(RepairVerdict::Repaired {
        model: fixed(n),
        used_tests: 0,
    })
}

pub fn fail(passing_properties: usize) -> Result<CheckVerdict, VerifyOracleError> {
    Ok(CheckVerdict::Fail { passing_properties })
}

pub fn pass() -> Result<CheckVerdict, VerifyOracleError> {
    Ok(CheckVerdict::Pass {
        passing_properties: 10,
    })
}

/// Answers repair calls from a script, in call order; `NotRepaired` once the
/// script runs out. Every pool handed to it is recorded.
#[derive(Default)]
pub struct ScriptedRepair {
    script: VecDeque<Result<RepairVerdict, RepairOracleError>>,
    pub calls: Vec<(ModelVariant, Vec<PropertyTest>)>,
}

impl ScriptedRepair {
    pub fn new(script: impl IntoIterator<Item = Result<RepairVerdict, RepairOracleError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            calls: Vec::new(),
        }
    }

    pub fn pool_names(&self, call: usize) -> Vec<String> {
        self.calls[call]
            .1
            .iter()
            .map(|t| {
                t.command()
                    .trim_start_matches("run ")
                    .trim_end_matches(" expect 1")
                    .to_string()
            })
            .collect()
    }
}

impl RepairOracle for ScriptedRepair {
    fn repair(
        &mut self,
        model: &ModelVariant,
        tests: &[PropertyTest],
    ) -> Result<RepairVerdict, RepairOracleError> {
        self.calls.push((model.clone(), tests.to_vec()));
        self.script
            .pop_front()
            .unwrap_or(Ok(RepairVerdict::NotRepaired))
    }
}

/// Answers check and generate calls from two independent scripts. Checks
/// fail with zero passing properties and generation yields nothing once the
/// scripts run out.
#[derive(Default)]
pub struct ScriptedVerify {
    checks: VecDeque<Result<CheckVerdict, VerifyOracleError>>,
    generated: VecDeque<Result<GeneratedTests, VerifyOracleError>>,
    pub checked: Vec<ModelVariant>,
    pub requests: Vec<(ModelVariant, GenerateRequest)>,
    highest_index: Option<usize>,
}

impl ScriptedVerify {
    pub fn new(
        checks: impl IntoIterator<Item = Result<CheckVerdict, VerifyOracleError>>,
        generated: impl IntoIterator<Item = GeneratedTests>,
    ) -> Self {
        Self {
            checks: checks.into_iter().collect(),
            generated: generated.into_iter().map(Ok).collect(),
            checked: Vec::new(),
            requests: Vec::new(),
            highest_index: None,
        }
    }

    /// Report `index` as the highest index used by every generate call.
    pub fn reporting_highest_index(mut self, index: usize) -> Self {
        self.highest_index = Some(index);
        self
    }

    pub fn then_generate_error(mut self, message: &str) -> Self {
        self.generated.push_back(Err(VerifyOracleError::Failed {
            code: Some(1),
            message: message.to_string(),
        }));
        self
    }
}

impl VerifyOracle for ScriptedVerify {
    fn check(&mut self, model: &ModelVariant) -> Result<CheckVerdict, VerifyOracleError> {
        self.checked.push(model.clone());
        self.checks.pop_front().unwrap_or(fail(0))
    }

    fn generate(
        &mut self,
        model: &ModelVariant,
        request: &GenerateRequest,
    ) -> Result<GeneratedTests, VerifyOracleError> {
        self.requests.push((model.clone(), *request));
        let mut generated = self
            .generated
            .pop_front()
            .unwrap_or_else(|| Ok(GeneratedTests::default()))?;
        generated.highest_index = self
            .highest_index
            .unwrap_or(request.from_index + generated.all_tests().count());
        Ok(generated)
    }
}

pub fn options(laps: usize) -> SearchOptions {
    SearchOptions {
        laps,
        ..SearchOptions::default()
    }
}
