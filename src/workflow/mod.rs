mod stage;
mod verify;

pub use stage::{Stage, StageFailure, VerificationOutcome, VerificationStatus};
pub use verify::{COMPARE_MISMATCH, FolderMapping, VerificationWorkflow};
