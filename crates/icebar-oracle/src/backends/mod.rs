pub mod process;
pub mod repair_process;
pub mod verify_process;

pub use process::{CommandLineError, ProcessCommand};
pub use repair_process::{ProcessRepairOracle, RepairProcessConfig};
pub use verify_process::{ProcessVerifyOracle, VerifyProcessConfig};
