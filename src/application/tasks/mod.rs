//! Task generation and the per-state lifecycle stages

pub mod claim;
pub mod context;
pub mod download;
pub mod generator;
pub mod poller;
pub mod proof;
pub mod registration;

pub use claim::RewardClaimStage;
pub use context::TaskContext;
pub use download::{ChildProgressStage, ChildRequestStage, HeaderProgressStage, HeaderRequestStage};
pub use generator::TaskGenerator;
pub use poller::{PollOutcome, StagePoller, TaskStage};
pub use proof::{ProofAckStage, ProofSubmissionStage};
pub use registration::RegistrationStage;
