//! JSON wire format for tests exchanged with oracle processes.
//!
//! A generate-mode call writes one file per category into its output
//! directory. Each file is an array of entries tagged by `shape`:
//!
//! ```json
//! [
//!   {"shape": "single", "test": {"predicate": "pred t1 {..}", "command": "run t1 expect 1"}},
//!   {"shape": "multi_branch", "alternatives": [[{"predicate": "..", "command": ".."}], [..]]},
//!   {"shape": "predicate_pair", "positive": [..], "negative": [..]}
//! ]
//! ```
//!
//! A missing category file means the oracle produced no tests of that kind.

use std::fs;
use std::path::Path;

use icebar_ir::test_case::{BranchingTest, PropertyTest, TestError, TestKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::oracle::GeneratedTests;
use crate::workspace::{read_text, ArtifactError};

pub const TRUSTED_FILE: &str = "trusted.json";
pub const UNTRUSTED_FILE: &str = "untrusted.json";
pub const PREDICATES_FILE: &str = "predicates.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireTest {
    #[serde(default)]
    pub predicate: String,
    #[serde(default)]
    pub command: String,
}

impl WireTest {
    pub fn into_test(self, kind: TestKind) -> Result<PropertyTest, TestError> {
        PropertyTest::new(kind, self.predicate, self.command)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum WireEntry {
    Single {
        test: WireTest,
    },
    MultiBranch {
        alternatives: Vec<Vec<WireTest>>,
    },
    PredicatePair {
        positive: Vec<WireTest>,
        negative: Vec<WireTest>,
    },
}

impl WireEntry {
    pub fn into_branching(self, kind: TestKind) -> Result<BranchingTest, TestError> {
        let convert = |tests: Vec<WireTest>| {
            tests
                .into_iter()
                .map(|t| t.into_test(kind))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(match self {
            WireEntry::Single { test } => BranchingTest::Single(test.into_test(kind)?),
            WireEntry::MultiBranch { alternatives } => BranchingTest::MultiBranch(
                alternatives
                    .into_iter()
                    .map(convert)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            WireEntry::PredicatePair { positive, negative } => BranchingTest::PredicatePair {
                positive: convert(positive)?,
                negative: convert(negative)?,
            },
        })
    }
}

/// Trailing status line printed by a generate-mode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateSummary {
    pub highest_index: usize,
}

/// Decode a category file's contents into branching tests of `kind`.
pub fn parse_entries(raw: &str, kind: TestKind) -> Result<Vec<BranchingTest>, WireParseError> {
    let entries: Vec<WireEntry> = serde_json::from_str(raw).map_err(WireParseError::Decode)?;
    entries
        .into_iter()
        .map(|e| e.into_branching(kind).map_err(WireParseError::Malformed))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum WireParseError {
    #[error("{0}")]
    Decode(serde_json::Error),
    #[error("{0}")]
    Malformed(TestError),
}

fn read_category(
    dir: &Path,
    file: &str,
    kind: TestKind,
) -> Result<Vec<BranchingTest>, ArtifactError> {
    let path = dir.join(file);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = read_text(&path)?;
    parse_entries(&raw, kind).map_err(|e| match e {
        WireParseError::Decode(source) => ArtifactError::Decode { path, source },
        WireParseError::Malformed(source) => ArtifactError::MalformedTest { path, source },
    })
}

/// Read every category file in a generate output directory.
///
/// Entries of the trusted file that branch are ambiguous by definition; they
/// are moved to the untrusted category with their tests demoted.
pub fn read_generated(
    dir: &Path,
    from_index: usize,
    stdout: &str,
) -> Result<GeneratedTests, ArtifactError> {
    let mut trusted = Vec::new();
    let mut untrusted = read_category(dir, UNTRUSTED_FILE, TestKind::CounterexampleUntrusted)?;
    for entry in read_category(dir, TRUSTED_FILE, TestKind::CounterexampleTrusted)? {
        match entry {
            BranchingTest::Single(test) => trusted.push(test),
            branching => {
                warn!("branching entry in {TRUSTED_FILE}; treating it as untrusted");
                untrusted.push(branching.map_tests(PropertyTest::demoted));
            }
        }
    }
    let predicates = read_category(dir, PREDICATES_FILE, TestKind::Predicate)?;

    let mut generated = GeneratedTests {
        trusted,
        untrusted,
        predicates,
        highest_index: 0,
    };
    generated.highest_index = match last_json_line::<GenerateSummary>(stdout) {
        Some(summary) => summary.highest_index,
        None => from_index.saturating_add(generated.all_tests().count()),
    };
    Ok(generated)
}

/// Load a JSON array of tests (for example externally seeded initial tests).
pub fn load_tests_file(path: &Path, kind: TestKind) -> Result<Vec<PropertyTest>, ArtifactError> {
    let raw = fs::read_to_string(path).map_err(|e| ArtifactError::io("reading", path, e))?;
    let wire: Vec<WireTest> = serde_json::from_str(&raw).map_err(|source| ArtifactError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    wire.into_iter()
        .map(|t| {
            t.into_test(kind).map_err(|source| ArtifactError::MalformedTest {
                path: path.to_path_buf(),
                source,
            })
        })
        .collect()
}

/// The last stdout line that decodes as `T`. Oracle processes may log
/// freely before their final status line.
pub fn last_json_line<T: DeserializeOwned>(stdout: &str) -> Option<T> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|l| l.starts_with('{'))
        .find_map(|l| serde_json::from_str(l).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_shapes() {
        let raw = r#"[
            {"shape": "single", "test": {"predicate": "pred a {}", "command": "run a expect 1"}},
            {"shape": "multi_branch", "alternatives": [
                [{"predicate": "pred b1 {}", "command": "run b1 expect 1"}],
                [{"predicate": "pred b2 {}", "command": "run b2 expect 1"}]
            ]},
            {"shape": "predicate_pair",
             "positive": [{"predicate": "pred c {}", "command": "run c expect 1"}],
             "negative": [{"predicate": "pred c {}", "command": "run c expect 0"}]}
        ]"#;
        let entries = parse_entries(raw, TestKind::Predicate).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(matches!(entries[0], BranchingTest::Single(_)));
        assert_eq!(entries[1].alternatives().len(), 2);
        assert_eq!(entries[2].alternatives().len(), 2);
        assert!(entries
            .iter()
            .flat_map(|e| e.tests())
            .all(|t| t.kind() == TestKind::Predicate));
    }

    #[test]
    fn empty_test_record_is_malformed() {
        let raw = r#"[{"shape": "single", "test": {}}]"#;
        assert!(matches!(
            parse_entries(raw, TestKind::CounterexampleTrusted),
            Err(WireParseError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = r#"[{"shape": "single", "test": {"predicate": "p", "cmd": "x"}}]"#;
        assert!(matches!(
            parse_entries(raw, TestKind::Predicate),
            Err(WireParseError::Decode(_))
        ));
    }

    #[test]
    fn missing_files_mean_no_tests() {
        let dir = tempfile::tempdir().unwrap();
        let generated = read_generated(dir.path(), 7, "").unwrap();
        assert!(generated.is_empty());
        assert_eq!(generated.highest_index, 7);
    }

    #[test]
    fn branching_trusted_entries_are_demoted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(TRUSTED_FILE),
            r#"[
                {"shape": "single", "test": {"predicate": "pred a {}", "command": "run a"}},
                {"shape": "multi_branch", "alternatives": [
                    [{"predicate": "pred b {}", "command": "run b"}],
                    [{"predicate": "pred c {}", "command": "run c"}]
                ]}
            ]"#,
        )
        .unwrap();
        let generated = read_generated(dir.path(), 0, "noise\n{\"highest_index\": 12}\n").unwrap();
        assert_eq!(generated.trusted.len(), 1);
        assert_eq!(generated.untrusted.len(), 1);
        assert!(generated.untrusted[0]
            .tests()
            .all(|t| t.kind() == TestKind::CounterexampleUntrusted));
        assert_eq!(generated.highest_index, 12);
    }

    #[test]
    fn highest_index_defaults_to_tests_read() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(UNTRUSTED_FILE),
            r#"[{"shape": "multi_branch", "alternatives": [
                [{"predicate": "pred b {}"}], [{"predicate": "pred c {}"}]
            ]}]"#,
        )
        .unwrap();
        let generated = read_generated(dir.path(), 4, "not json").unwrap();
        assert_eq!(generated.highest_index, 6);
    }

    #[test]
    fn fallback_highest_index_saturates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(UNTRUSTED_FILE),
            r#"[{"shape": "single", "test": {"predicate": "pred b {}"}}]"#,
        )
        .unwrap();
        let generated = read_generated(dir.path(), usize::MAX, "").unwrap();
        assert_eq!(generated.highest_index, usize::MAX);
    }

    #[test]
    fn load_tests_file_tags_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("initial.json");
        fs::write(&path, r#"[{"predicate": "pred i {}", "command": "run i expect 1"}]"#).unwrap();
        let tests = load_tests_file(&path, TestKind::Initial).unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].kind(), TestKind::Initial);
    }

    #[test]
    fn last_json_line_skips_trailing_noise() {
        let out = "{\"highest_index\": 1}\n{\"highest_index\": 2}\nDone.\n";
        let s: GenerateSummary = last_json_line(out).unwrap();
        assert_eq!(s.highest_index, 2);
    }
}
