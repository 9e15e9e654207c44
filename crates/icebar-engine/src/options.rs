use icebar_ir::space::SearchStrategy;
use serde::Serialize;

/// Immutable configuration of one search run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOptions {
    /// Depth bound. A candidate at depth `laps` is verified but never expanded.
    pub laps: usize,
    /// Wall-clock budget in seconds; 0 disables the timeout.
    pub timeout_secs: u64,
    pub strategy: SearchStrategy,
    /// Pop candidates with the most passing properties first.
    pub prioritize: bool,
    /// Share trusted counterexamples between all lineages.
    pub global_trusted_tests: bool,
    /// Filter new tests already introduced by an ancestor.
    pub dedup_tests: bool,
    pub partial_repair_as_fix: bool,
    /// Downgrade tolerated repair-oracle crashes to not-repaired.
    pub keep_going_on_tolerated_failure: bool,
    /// Regenerate with relaxed facts when a failed check yields no tests.
    pub allow_relaxed_facts: bool,
    /// Regenerate forcing assertion-derived tests when a failed check yields
    /// no tests.
    pub force_assertion_tests: bool,
    pub instance_tests: bool,
}

impl SearchOptions {
    pub(crate) fn regenerates(&self) -> bool {
        self.allow_relaxed_facts || self.force_assertion_tests
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            laps: 4,
            timeout_secs: 0,
            strategy: SearchStrategy::DepthFirst,
            prioritize: false,
            global_trusted_tests: true,
            dedup_tests: true,
            partial_repair_as_fix: false,
            keep_going_on_tolerated_failure: true,
            allow_relaxed_facts: false,
            force_assertion_tests: false,
            instance_tests: false,
        }
    }
}
