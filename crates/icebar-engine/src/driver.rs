//! The CEGAR search loop.
//!
//! One iteration pops a candidate, repairs it against its test pool, checks
//! the repair against the full property oracle and, when the check fails and
//! the candidate may still be expanded, branches on freshly generated
//! counterexample tests. Generated tests are used in strict precedence:
//! trusted counterexamples, then untrusted counterexamples, then predicate
//! pairs, then a regeneration pass with relaxed facts or forced assertion
//! tests. Only the first non-empty bucket branches.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use icebar_ir::candidate::{CandidateArena, CandidateId, ChildSpec};
use icebar_ir::model::ModelVariant;
use icebar_ir::space::CandidateSpace;
use icebar_ir::test_case::{BranchingTest, PropertyTest, TestHash, TestPool};
use icebar_oracle::{
    CheckVerdict, GenerateRequest, GeneratedTests, RepairOracle, RepairVerdict, VerifyOracle,
};
use tracing::{debug, error, info, warn};

use crate::branching::bucket_combinations;
use crate::options::SearchOptions;
use crate::result::{SearchOutcome, SearchReport};
use crate::timeout::{deadline_exceeded, deadline_from, elapsed_ms};

/// What happened to a candidate that did not stop the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// The repair oracle produced nothing worth verifying.
    NoFix,
    /// A repair was produced but failed verification.
    Spurious,
    /// The candidate's own model was verified (no repair attempted) and failed.
    Unrepaired,
}

impl Disposition {
    fn zero_lap_outcome(self) -> SearchOutcome {
        match self {
            Disposition::Spurious => SearchOutcome::SpuriousFix,
            Disposition::NoFix | Disposition::Unrepaired => SearchOutcome::NoFixFound,
        }
    }
}

enum Step {
    Done(Disposition),
    Stop(SearchOutcome),
}

#[derive(Debug, Default)]
struct SearchStats {
    tests_used: usize,
    repair_oracle_calls: usize,
    evaluated: usize,
    no_fix: usize,
    spurious: usize,
    repair_time: Duration,
    verify_time: Duration,
    received: HashSet<TestHash>,
    trusted_received: usize,
    untrusted_received: usize,
}

impl SearchStats {
    fn record_generated<'a>(&mut self, tests: impl Iterator<Item = &'a PropertyTest>) {
        for test in tests {
            if self.received.insert(test.hash().clone()) {
                if test.kind().is_trusted() {
                    self.trusted_received += 1;
                } else {
                    self.untrusted_received += 1;
                }
            }
        }
    }
}

/// Mutable state of one run, owned by the driver for the run's duration.
struct SearchState {
    arena: CandidateArena,
    space: CandidateSpace,
    global_trusted: TestPool,
    next_test_index: usize,
    deadline: Option<Instant>,
    fix: Option<ModelVariant>,
    stats: SearchStats,
}

impl SearchState {
    fn new(options: &SearchOptions, start: Instant, spent: Duration) -> Self {
        Self {
            arena: CandidateArena::new(options.dedup_tests),
            space: CandidateSpace::new(options.strategy, options.prioritize),
            global_trusted: TestPool::new(),
            next_test_index: 0,
            deadline: deadline_from(start, options.timeout_secs, spent),
            fix: None,
            stats: SearchStats::default(),
        }
    }
}

/// Sequential search driver over a repair and a verification oracle.
pub struct SearchDriver<R, V> {
    repair: R,
    verify: V,
    options: SearchOptions,
    spent: Duration,
}

impl<R: RepairOracle, V: VerifyOracle> SearchDriver<R, V> {
    pub fn new(repair: R, verify: V, options: SearchOptions) -> Self {
        Self {
            repair,
            verify,
            options,
            spent: Duration::ZERO,
        }
    }

    /// Charge `spent` against the timeout budget, for time already used
    /// before the run (for example by an earlier attempt on the same model).
    pub fn with_time_spent(mut self, spent: Duration) -> Self {
        self.spent = spent;
        self
    }

    /// Search for a repair of `model`.
    ///
    /// `initial_tests` are externally seeded tests; they join the global
    /// trusted pool before the root candidate is built.
    pub fn run(&mut self, model: ModelVariant, initial_tests: Vec<PropertyTest>) -> SearchReport {
        let mut state = SearchState::new(&self.options, Instant::now(), self.spent);
        state.global_trusted.extend(initial_tests);

        let root = state.arena.root(model, state.global_trusted.iter());
        state.space.push(&state.arena[root]);
        info!(
            model = %state.arena[root].model().name(),
            laps = self.options.laps,
            strategy = %self.options.strategy,
            prioritize = self.options.prioritize,
            initial_tests = state.global_trusted.len(),
            "starting repair search"
        );

        let mut active: Option<CandidateId> = None;
        let outcome = loop {
            if state.space.is_empty() {
                break SearchOutcome::Exhausted;
            }
            let id = state.space.pop();
            active = Some(id);
            state.stats.evaluated += 1;
            match self.step(&mut state, id) {
                Step::Stop(outcome) => break outcome,
                Step::Done(disposition) if self.options.laps == 0 => {
                    break disposition.zero_lap_outcome()
                }
                Step::Done(_) => {}
            }
        };

        let lap = match active {
            Some(id) if outcome != SearchOutcome::Exhausted => state.arena[id].depth(),
            _ => state.arena.max_depth(),
        };
        info!(
            outcome = %outcome,
            lap,
            evaluated = state.stats.evaluated,
            candidates = state.arena.len(),
            "repair search finished"
        );
        let stats = state.stats;
        SearchReport {
            outcome,
            lap,
            tests_used: stats.tests_used,
            verify_oracle_ms: elapsed_ms(stats.verify_time),
            repair_oracle_ms: elapsed_ms(stats.repair_time),
            repair_oracle_calls: stats.repair_oracle_calls,
            total_tests: stats.received.len(),
            trusted_tests: stats.trusted_received,
            untrusted_tests: stats.untrusted_received,
            evaluated_candidates: stats.evaluated,
            no_fix_candidates: stats.no_fix,
            spurious_candidates: stats.spurious,
            fix: state.fix,
        }
    }

    fn step(&mut self, state: &mut SearchState, id: CandidateId) -> Step {
        let candidate = &state.arena[id];
        let model = candidate.model().clone();
        let depth = candidate.depth();
        info!(
            candidate = %id,
            depth,
            priority = candidate.repaired_properties(),
            trusted = candidate.trusted().len(),
            untrusted = candidate.untrusted().len(),
            global = state.global_trusted.len(),
            "picked candidate"
        );
        let pool: TestPool = state
            .global_trusted
            .iter()
            .chain(candidate.trusted().iter())
            .chain(candidate.untrusted().iter())
            .cloned()
            .collect();
        let pool = pool.into_vec();

        let (to_verify, repaired) = if pool.is_empty() {
            debug!(candidate = %id, "no tests to repair against; verifying the current model");
            (model, false)
        } else {
            state.stats.tests_used = pool.len();
            state.stats.repair_oracle_calls += 1;
            let started = Instant::now();
            let verdict = self.repair.repair(&model, &pool);
            state.stats.repair_time += started.elapsed();
            match verdict {
                Ok(RepairVerdict::Repaired { model: fixed, .. }) => (fixed, true),
                Ok(RepairVerdict::PartialRepair { model: fixed, .. })
                    if self.options.partial_repair_as_fix =>
                {
                    (fixed, true)
                }
                Ok(RepairVerdict::NoTests) => (model, false),
                Ok(verdict @ (RepairVerdict::PartialRepair { .. } | RepairVerdict::NotRepaired)) =>
                {
                    info!(
                        candidate = %id,
                        verdict = verdict.as_str(),
                        tests = pool.len(),
                        "no repair"
                    );
                    state.stats.no_fix += 1;
                    return Step::Done(Disposition::NoFix);
                }
                Err(e) if e.is_recoverable() && self.options.keep_going_on_tolerated_failure => {
                    warn!(
                        candidate = %id,
                        error = %e,
                        "treating tolerated repair oracle failure as no repair"
                    );
                    state.stats.no_fix += 1;
                    return Step::Done(Disposition::NoFix);
                }
                Err(e) => {
                    return Step::Stop(SearchOutcome::RepairOracleFailed {
                        message: e.to_string(),
                    })
                }
            }
        };

        let started = Instant::now();
        let verdict = self.verify.check(&to_verify);
        state.stats.verify_time += started.elapsed();
        let passing = match verdict {
            Err(e) => {
                return Step::Stop(SearchOutcome::VerifyOracleFailed {
                    message: e.to_string(),
                })
            }
            Ok(CheckVerdict::Pass { passing_properties }) => {
                info!(
                    candidate = %id,
                    passing_properties,
                    model = %to_verify.path().display(),
                    "repair verified"
                );
                state.fix = Some(to_verify);
                return Step::Stop(SearchOutcome::RepairFound);
            }
            Ok(CheckVerdict::Fail { passing_properties }) => passing_properties,
        };

        let disposition = if repaired {
            state.stats.spurious += 1;
            Disposition::Spurious
        } else {
            Disposition::Unrepaired
        };
        state.arena.set_repaired_properties(id, passing);
        debug!(candidate = %id, passing_properties = passing, "verification failed");

        if deadline_exceeded(state.deadline) {
            return Step::Stop(SearchOutcome::Timeout);
        }
        if depth >= self.options.laps {
            debug!(candidate = %id, depth, "lap bound reached; not expanding");
            return Step::Done(disposition);
        }
        match self.expand(state, id, &to_verify, passing) {
            Ok(()) => Step::Done(disposition),
            Err(outcome) => Step::Stop(outcome),
        }
    }

    fn generate(
        &mut self,
        state: &mut SearchState,
        model: &ModelVariant,
        request: &GenerateRequest,
    ) -> Result<GeneratedTests, SearchOutcome> {
        let started = Instant::now();
        let result = self.verify.generate(model, request);
        state.stats.verify_time += started.elapsed();
        let generated = result.map_err(|e| SearchOutcome::VerifyOracleFailed {
            message: e.to_string(),
        })?;
        state.next_test_index = state
            .next_test_index
            .max(generated.highest_index.saturating_add(1));
        debug!(
            trusted = generated.trusted.len(),
            untrusted = generated.untrusted.len(),
            predicates = generated.predicates.len(),
            next_index = state.next_test_index,
            "generated counterexample tests"
        );
        Ok(generated)
    }

    fn expand(
        &mut self,
        state: &mut SearchState,
        id: CandidateId,
        model: &ModelVariant,
        passing: usize,
    ) -> Result<(), SearchOutcome> {
        let request = GenerateRequest {
            from_index: state.next_test_index,
            instance_tests: self.options.instance_tests,
            ..GenerateRequest::default()
        };
        let generated = self.generate(state, model, &request)?;
        state.stats.record_generated(generated.all_tests());
        if !generated.trusted.is_empty() {
            self.branch_trusted(state, id, generated.trusted, passing);
            return Ok(());
        }

        let bucket = if !generated.untrusted.is_empty() {
            generated.untrusted
        } else if !generated.predicates.is_empty() {
            generated.predicates
        } else if self.options.regenerates() {
            let request = GenerateRequest {
                from_index: state.next_test_index,
                relaxed_facts: self.options.allow_relaxed_facts,
                force_assertion_tests: self.options.force_assertion_tests,
                instance_tests: self.options.instance_tests,
            };
            let bucket = regeneration_bucket(self.generate(state, model, &request)?);
            state
                .stats
                .record_generated(bucket.iter().flat_map(|b| b.tests()));
            bucket
        } else {
            Vec::new()
        };

        if bucket.is_empty() {
            warn!(
                candidate = %id,
                "failed check produced no counterexample tests; dropping candidate"
            );
            return Ok(());
        }
        self.branch_on(state, id, &bucket, passing);
        Ok(())
    }

    /// One child carrying the new trusted tests.
    fn branch_trusted(
        &self,
        state: &mut SearchState,
        id: CandidateId,
        trusted: Vec<PropertyTest>,
        passing: usize,
    ) {
        let parent = &state.arena[id];
        let global = self.options.global_trusted_tests || !parent.has_local_tests();
        let spec = ChildSpec::from_parent(parent).with_repaired_properties(passing);
        let fresh = trusted
            .into_iter()
            .filter(|t| !state.global_trusted.contains(t.hash()));
        let spec = if global {
            spec.with_new_global(fresh)
        } else {
            spec.with_new_trusted(fresh)
        };

        match state.arena.branch(id, spec) {
            Ok(Some(branch)) => {
                if global {
                    state.global_trusted.extend(branch.accepted.iter().cloned());
                }
                info!(
                    parent = %id,
                    child = %branch.id,
                    new_tests = branch.accepted.len(),
                    filtered = branch.dropped,
                    global,
                    "branched on trusted counterexamples"
                );
                state.space.push(&state.arena[branch.id]);
            }
            Ok(None) => {
                warn!(candidate = %id, "trusted counterexamples add no new test; discarding branch")
            }
            Err(e) => error!(candidate = %id, error = %e, "rejected child candidate"),
        }
    }

    /// One child per combination of alternatives across the bucket.
    fn branch_on(
        &self,
        state: &mut SearchState,
        id: CandidateId,
        bucket: &[BranchingTest],
        passing: usize,
    ) {
        let combinations = bucket_combinations(bucket);
        let total = combinations.len();
        let mut pushed = 0usize;
        for combination in combinations {
            // Tests another lineage already made global add nothing here.
            let fresh = combination
                .into_iter()
                .filter(|t| !state.global_trusted.contains(t.hash()))
                .map(PropertyTest::demoted);
            let spec = ChildSpec::from_parent(&state.arena[id])
                .with_new_untrusted(fresh)
                .with_repaired_properties(passing);
            match state.arena.branch(id, spec) {
                Ok(Some(branch)) => {
                    debug!(
                        parent = %id,
                        child = %branch.id,
                        new_tests = branch.accepted.len(),
                        "pushed child"
                    );
                    state.space.push(&state.arena[branch.id]);
                    pushed += 1;
                }
                Ok(None) => debug!(parent = %id, "combination adds no new test; skipping"),
                Err(e) => error!(candidate = %id, error = %e, "rejected child candidate"),
            }
        }
        if pushed == 0 {
            warn!(
                candidate = %id,
                combinations = total,
                "no combination adds a new test; discarding branches"
            );
        } else {
            info!(
                parent = %id,
                children = pushed,
                combinations = total,
                "branched on untrusted tests"
            );
        }
    }
}

/// Tests from a regeneration pass form a single untrusted bucket: weakened
/// facts or forced assertions never yield trusted evidence.
fn regeneration_bucket(generated: GeneratedTests) -> Vec<BranchingTest> {
    let GeneratedTests {
        trusted,
        untrusted,
        predicates,
        ..
    } = generated;
    trusted
        .into_iter()
        .map(|t| BranchingTest::Single(t.demoted()))
        .chain(untrusted.into_iter().map(|b| b.map_tests(PropertyTest::demoted)))
        .chain(predicates)
        .collect()
}
