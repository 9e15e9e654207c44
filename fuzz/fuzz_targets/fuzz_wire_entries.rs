#![no_main]
use icebar_ir::test_case::TestKind;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Generated-test files come from an external process; decoding must
        // reject bad input without panicking.
        let _ = icebar_oracle::wire::parse_entries(s, TestKind::CounterexampleUntrusted);
        let _ = icebar_oracle::wire::parse_entries(s, TestKind::Predicate);
    }
});
