//! Process-wide configuration loading and validation (§6.6): built-in
//! defaults, a project-level `.gan-audit.toml`, and `GAN_`-prefixed
//! environment overrides, following the teacher's `config.rs` /
//! `config_merge.rs` / `validate.rs` layering without its multi-provider
//! breadth.

mod config;
mod config_merge;
mod validate;

pub use config::{GanConfig, TierConfig};
pub use config_merge::load;
pub use validate::validate_config;
