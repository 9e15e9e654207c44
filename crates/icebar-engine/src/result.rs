use std::fmt;

use icebar_ir::model::ModelVariant;
use serde::Serialize;

/// How a search run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// A repair passed the full property oracle.
    RepairFound,
    /// The repair oracle failed in a way that is not tolerated.
    RepairOracleFailed { message: String },
    /// The verification oracle failed; never tolerated.
    VerifyOracleFailed { message: String },
    /// The wall-clock budget ran out after a failed verification.
    Timeout,
    /// No candidate is left to explore.
    Exhausted,
    /// Zero-lap run: the only repair failed verification.
    SpuriousFix,
    /// Zero-lap run: the repair oracle found nothing to verify.
    NoFixFound,
}

impl SearchOutcome {
    /// Status tag written to the report line.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchOutcome::RepairFound => "REPAIR_FOUND",
            SearchOutcome::RepairOracleFailed { .. } => "REPAIR_ORACLE_FAILED",
            SearchOutcome::VerifyOracleFailed { .. } => "VERIFY_ORACLE_FAILED",
            SearchOutcome::Timeout => "TIMEOUT",
            SearchOutcome::Exhausted => "EXHAUSTED",
            SearchOutcome::SpuriousFix => "SPURIOUS_FIX",
            SearchOutcome::NoFixFound => "NO_FIX_FOUND",
        }
    }

    pub fn is_fix(&self) -> bool {
        matches!(self, SearchOutcome::RepairFound)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            SearchOutcome::RepairOracleFailed { message }
            | SearchOutcome::VerifyOracleFailed { message } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{} ({message})", self.as_str()),
            None => f.write_str(self.as_str()),
        }
    }
}

/// Summary of a finished run. Built once, when the driver stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    /// Depth of the candidate active at termination, or the deepest candidate
    /// created when the space was exhausted.
    pub lap: usize,
    /// Size of the last test pool handed to the repair oracle.
    pub tests_used: usize,
    pub verify_oracle_ms: u64,
    pub repair_oracle_ms: u64,
    pub repair_oracle_calls: usize,
    /// Distinct tests received from the verification oracle.
    pub total_tests: usize,
    pub trusted_tests: usize,
    pub untrusted_tests: usize,
    pub evaluated_candidates: usize,
    pub no_fix_candidates: usize,
    pub spurious_candidates: usize,
    /// The verified fix, for [`SearchOutcome::RepairFound`].
    pub fix: Option<ModelVariant>,
}

impl SearchReport {
    /// The delimited one-line summary, fields in order: status, lap,
    /// testsUsed, verifyOracleMs, repairOracleMs, repairOracleCalls,
    /// totalTests, trustedTests, untrustedTests, evaluatedCandidates,
    /// noFixCandidates, spuriousCandidates; joined by `;`.
    pub fn to_line(&self) -> String {
        format!(
            "{};{};{};{};{};{};{};{};{};{};{};{}",
            self.outcome.as_str(),
            self.lap,
            self.tests_used,
            self.verify_oracle_ms,
            self.repair_oracle_ms,
            self.repair_oracle_calls,
            self.total_tests,
            self.trusted_tests,
            self.untrusted_tests,
            self.evaluated_candidates,
            self.no_fix_candidates,
            self.spurious_candidates,
        )
    }
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RESULT: {}", self.outcome)?;
        if let Some(fix) = &self.fix {
            writeln!(f, "  Fix: {}", fix.path().display())?;
        }
        writeln!(
            f,
            "  Lap: {}, candidates evaluated: {} (no fix: {}, spurious: {})",
            self.lap, self.evaluated_candidates, self.no_fix_candidates, self.spurious_candidates
        )?;
        writeln!(
            f,
            "  Tests: {} used, {} generated ({} trusted, {} untrusted)",
            self.tests_used, self.total_tests, self.trusted_tests, self.untrusted_tests
        )?;
        write!(
            f,
            "  Oracles: repair {} calls / {} ms, verification {} ms",
            self.repair_oracle_calls, self.repair_oracle_ms, self.verify_oracle_ms
        )
    }
}
