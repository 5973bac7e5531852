//! C5 Session Store + C6 Memory-Efficient History (§4.5, §4.6): persistence,
//! validation/repair, id generation, and compression/trimming/eviction of
//! the in-memory iteration list.

pub mod history;
pub mod manager;
pub mod state;

pub use history::{HistoryStats, MemoryHistory};
pub use manager::{generate_id, LoadResult, SessionStore};
pub use state::{CompressedIteration, FailureLogEntry, SessionState, StagnationInfo};
