//! C8 Synchronous Engine (§4.8): the end-to-end orchestrator tying C1–C7
//! together behind a single `process(ToolRequest) -> ToolResponse` call per
//! tool invocation, following `cli-sub-agent`'s long-lived-dispatch pattern.

pub mod context_pack;
mod detect;
mod engine;
mod inline_config;
mod prompt;
pub mod wire;

pub use context_pack::{ContextPackBuilder, DiskContextPackBuilder};
pub use engine::{EngineConfig, GanEngine};
pub use wire::{ReviewBlock, ToolRequest, ToolResponse};
