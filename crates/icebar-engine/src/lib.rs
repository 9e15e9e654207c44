//! ICEBAR search engine.
//!
//! Drives the counterexample-guided repair loop: candidates are popped from
//! the candidate space, repaired by the repair oracle, checked by the
//! verification oracle, and expanded into children from the counterexample
//! tests the verification oracle generates.

pub mod branching;
pub mod driver;
pub mod options;
pub mod result;
mod timeout;

pub use driver::SearchDriver;
pub use options::SearchOptions;
pub use result::{SearchOutcome, SearchReport};
