//! ICEBAR search-tree intermediate representation.
//!
//! This crate defines the tests exchanged with the repair and verification
//! oracles, the model variants being repaired, the fix-candidate arena with
//! its lineage-based test ledger, and the candidate space that schedules
//! pending candidates.

pub mod candidate;
pub mod model;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;
pub mod space;
pub mod test_case;
