pub mod config;
pub mod debounce;
pub mod error;
pub mod evaluator;
pub mod report;
pub mod session;
pub mod verdict;

pub use config::{InspectionConfig, Rule, RuleKind, Severity};
pub use error::EngineError;
pub use evaluator::{CloseSnapshot, EvaluationSnapshot, OrientationCoverage, RuleEvaluator, RuleOutcome};
pub use report::VerdictAggregator;
pub use session::{FlawEvent, InspectionSession};
pub use verdict::{OverrideAudit, SupervisorId, Verdict, VerdictStatus};
