pub mod answer_ledger;
pub mod assessment_service;
pub mod attempt_policy;
pub mod clock;
pub mod context;
pub mod enrollment;
pub mod error;
pub mod grading;
pub mod override_resolver;
pub mod randomizer;
pub mod submission_service;
pub mod window;

pub use context::EngineContext;
pub use error::EngineError;
