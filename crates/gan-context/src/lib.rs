//! C2 Context-Window Manager: `none → active → terminated` lifecycle for the
//! judge's persistent context, keyed by caller-supplied loop id (§4.2).

pub mod manager;
pub mod phase;

pub use manager::ContextManager;
pub use phase::{ContextPhase, PhaseEvent};
