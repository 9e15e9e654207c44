//! End-to-end runs of the `icebar` binary with shell scripts standing in for
//! both oracles.
#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

// Appends a marker the checker accepts. Args: --model M --tests T --out O.
const FIXING_REPAIR: &str = r#"{ cat "$2"; echo "// FIXED"; } > "$6/bank.als""#;
const FRUITLESS_REPAIR: &str = "echo 'no fix within scope'";

// check --model M | generate --model M --out O --from-index N [flags..]
const VERIFY: &str = r#"case "$1" in
  check)
    if grep -q FIXED "$3"; then
      echo '{"passed": true, "passing_properties": 3}'
    else
      echo '{"passed": false, "passing_properties": 1}'
    fi ;;
  generate)
    echo '[{"shape": "single",
      "test": {"predicate": "pred t1 { some Account }", "command": "run t1 expect 0"}}]' \
      > "$5/trusted.json"
    echo '{"highest_index": 1}' ;;
  *) exit 9 ;;
esac"#;

fn setup(dir: &Path, repair: &str) {
    fs::create_dir_all(dir.join("models")).unwrap();
    fs::write(dir.join("models/bank.als"), "sig Account { balance: one Int }\n").unwrap();
    fs::write(
        dir.join("models/bank_oracle.als"),
        "assert NonNegative { all a: Account | a.balance >= 0 }\n",
    )
    .unwrap();
    fs::write(dir.join("repair.sh"), repair).unwrap();
    fs::write(dir.join("verify.sh"), VERIFY).unwrap();
}

fn icebar(dir: &Path, args: &[&str]) -> Output {
    let repair_cmd = format!("sh {}", dir.join("repair.sh").display());
    let verify_cmd = format!("sh {}", dir.join("verify.sh").display());
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_icebar"));
    cmd.args(args)
        .env("ICEBAR_REPAIR_CMD", repair_cmd)
        .env("ICEBAR_VERIFY_CMD", verify_cmd)
        .env("RUST_LOG", "warn")
        .current_dir(dir);
    cmd.output().expect("failed to execute icebar")
}

fn report_fields(output: &Output) -> Vec<String> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().last().unwrap_or_else(|| {
        panic!(
            "no report line (stderr={})",
            String::from_utf8_lossy(&output.stderr)
        )
    });
    line.split(';').map(str::to_string).collect()
}

#[test]
fn repair_found_after_one_counterexample() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), FIXING_REPAIR);

    let output = icebar(
        dir.path(),
        &[
            "repair",
            "models/bank.als",
            "models/bank_oracle.als",
            "--work-dir",
            "work",
            "--report-out",
            "results.csv",
            "--json-report",
            "report.json",
        ],
    );
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let fields = report_fields(&output);
    assert_eq!(fields.len(), 12);
    assert_eq!(fields[0], "REPAIR_FOUND");
    assert_eq!(fields[1], "1", "fix found one lap below the root");
    assert_eq!(fields[2], "1", "one test handed to the repair oracle");
    assert_eq!(fields[5], "1", "bootstrap verification needs no repair call");
    assert_eq!(fields[6], "1");
    assert_eq!(fields[7], "1");
    assert_eq!(fields[9], "2");

    let appended = fs::read_to_string(dir.path().join("results.csv")).unwrap();
    assert_eq!(appended.trim_end(), fields.join(";"));

    let json: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(json["outcome"]["status"], "repair_found");
    let fix = json["fix"]["path"].as_str().unwrap();
    assert!(fs::read_to_string(dir.path().join(fix))
        .unwrap()
        .contains("// FIXED"));
}

#[test]
fn exhausted_search_exits_with_no_fix_status() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), FRUITLESS_REPAIR);

    let output = icebar(
        dir.path(),
        &[
            "repair",
            "models/bank.als",
            "models/bank_oracle.als",
            "--work-dir",
            "work",
            "--laps",
            "1",
        ],
    );
    assert_eq!(output.status.code(), Some(2));
    let fields = report_fields(&output);
    assert_eq!(fields[0], "EXHAUSTED");
    assert_eq!(fields[10], "1", "the only child was not repaired");
}

#[test]
fn missing_oracle_command_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), FIXING_REPAIR);

    let output = Command::new(env!("CARGO_BIN_EXE_icebar"))
        .args(["repair", "models/bank.als", "models/bank_oracle.als"])
        .env_remove("ICEBAR_REPAIR_CMD")
        .env_remove("ICEBAR_VERIFY_CMD")
        .current_dir(dir.path())
        .output()
        .expect("failed to execute icebar");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ICEBAR_REPAIR_CMD"));
}

#[test]
fn check_prints_single_verdict() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), FRUITLESS_REPAIR);

    let output = icebar(
        dir.path(),
        &[
            "check",
            "models/bank.als",
            "models/bank_oracle.als",
            "--work-dir",
            "work",
        ],
    );
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "FAIL;1");
}
