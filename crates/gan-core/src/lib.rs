pub mod error;
pub mod fingerprint;
pub mod types;

pub use error::GanError;
pub use types::{
    CompletionReason, Decision, Dimension, HistoryEntry, InlineComment, Iteration, JudgeCard,
    ProgressTrend, Review, Scope, SessionConfig, SessionConfigUpdate, TerminationReason, Thought,
    Verdict,
};

/// Convenience alias used throughout the `gan-*` crates.
pub type Result<T> = std::result::Result<T, GanError>;
