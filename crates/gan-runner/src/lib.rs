//! C1 Judge Runner: subprocess execution and review parsing for the judge
//! executable's `exec`/`context` command surface (§4.1, §6.4).

pub mod judge;
pub mod process;
pub mod review_parse;

pub use judge::JudgeRunner;
pub use process::{ExecutionResult, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_STDIN_WRITE_TIMEOUT_SECS};
