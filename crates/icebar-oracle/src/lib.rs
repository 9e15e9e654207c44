//! ICEBAR oracle boundary.
//!
//! The search driver talks to two synchronous oracles through the
//! [`oracle::RepairOracle`] and [`oracle::VerifyOracle`] traits. This crate
//! defines those traits and their immutable verdict types, the working
//! artifacts handed to oracle processes, the JSON wire format of generated
//! tests, and process-backed implementations of both oracles.

pub mod backends;
pub mod oracle;
pub mod wire;
pub mod workspace;

pub use oracle::{
    CheckVerdict, GenerateRequest, GeneratedTests, RepairOracle, RepairOracleError,
    RepairVerdict, VerifyOracle, VerifyOracleError,
};
pub use workspace::{ArtifactError, OracleWorkspace};
