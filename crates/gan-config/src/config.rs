//! Process-wide configuration knobs (§6.6), loaded once at startup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A single `{score, maxLoops}` completion tier (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierConfig {
    pub score: f64,
    pub max_loops: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GanConfig {
    pub enable_audit: bool,
    pub audit_timeout_millis: u64,
    pub max_concurrent_audits: usize,
    pub max_session_age_millis: u64,
    pub sweep_interval_millis: u64,
    pub stagnation_similarity_threshold: f64,
    pub stagnation_start_loop: u32,
    pub completion_tiers: Vec<TierConfig>,
    pub hard_stop_loops: u32,
    pub max_memory_usage_bytes: u64,
    pub max_iterations_in_memory: usize,
    pub compression_age_millis: u64,
    pub compression_threshold_bytes: u64,
    pub state_directory: PathBuf,
    pub judge_executable: PathBuf,
}

impl Default for GanConfig {
    fn default() -> Self {
        Self {
            enable_audit: true,
            audit_timeout_millis: 30_000,
            max_concurrent_audits: 5,
            max_session_age_millis: 24 * 60 * 60 * 1000,
            sweep_interval_millis: 60 * 60 * 1000,
            stagnation_similarity_threshold: 0.95,
            stagnation_start_loop: 10,
            completion_tiers: vec![
                TierConfig {
                    score: 95.0,
                    max_loops: 10,
                },
                TierConfig {
                    score: 90.0,
                    max_loops: 15,
                },
                TierConfig {
                    score: 85.0,
                    max_loops: 20,
                },
            ],
            hard_stop_loops: 25,
            max_memory_usage_bytes: 256 * 1024 * 1024,
            max_iterations_in_memory: 50,
            compression_age_millis: 10 * 60 * 1000,
            compression_threshold_bytes: 4096,
            state_directory: PathBuf::from(".mcp-gan-state"),
            judge_executable: PathBuf::from("gan-judge"),
        }
    }
}

impl GanConfig {
    /// Load `.gan-audit.toml` relative to `project_root`. Returns `None` if
    /// the file doesn't exist (caller falls back to defaults).
    pub fn load_file(project_root: &Path) -> Result<Option<toml::Value>> {
        let config_path = Self::config_path(project_root);
        if !config_path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let value: toml::Value = toml::from_str(&content)
            .with_context(|| format!("parsing {}", config_path.display()))?;
        Ok(Some(value))
    }

    pub fn save(&self, project_root: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::config_path(project_root), content)?;
        Ok(())
    }

    pub fn config_path(project_root: &Path) -> PathBuf {
        project_root.join(".gan-audit.toml")
    }
}
