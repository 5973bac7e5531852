//! Layering: built-in defaults → `.gan-audit.toml` → `GAN_`-prefixed env vars
//! (§6.6). Each layer is merged as a `toml::Value` before the final
//! deserialization into [`crate::config::GanConfig`].

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::GanConfig;

/// Deep merge two TOML values. `overlay` wins for non-table values; tables
/// are merged recursively.
pub(crate) fn merge_toml_values(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_map), toml::Value::Table(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged_val = match base_map.remove(&key) {
                    Some(base_val) => merge_toml_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged_val);
            }
            toml::Value::Table(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Converts `GAN_MAX_CONCURRENT_AUDITS=8` style env vars into a camelCase
/// TOML table that can be merged over the file layer. Values are parsed as
/// integer, float, or bool before falling back to a plain string.
pub(crate) fn env_overrides() -> toml::Value {
    let mut table = toml::map::Map::new();
    for (key, raw) in std::env::vars() {
        let Some(suffix) = key.strip_prefix("GAN_") else {
            continue;
        };
        let camel = screaming_snake_to_camel(suffix);
        table.insert(camel, parse_scalar(&raw));
    }
    toml::Value::Table(table)
}

fn screaming_snake_to_camel(name: &str) -> String {
    let mut out = String::new();
    let mut upper_next = false;
    for (i, word) in name.split('_').enumerate() {
        let word = word.to_ascii_lowercase();
        if i == 0 {
            out.push_str(&word);
        } else {
            upper_next = true;
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                if upper_next {
                    out.extend(first.to_uppercase());
                } else {
                    out.push(first);
                }
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

fn parse_scalar(raw: &str) -> toml::Value {
    if let Ok(v) = raw.parse::<i64>() {
        return toml::Value::Integer(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        return toml::Value::Float(v);
    }
    if let Ok(v) = raw.parse::<bool>() {
        return toml::Value::Boolean(v);
    }
    toml::Value::String(raw.to_string())
}

/// Loads the layered configuration for `project_root`: defaults, then the
/// project's `.gan-audit.toml` if present, then `GAN_`-prefixed environment
/// overrides.
pub fn load(project_root: &std::path::Path) -> Result<GanConfig> {
    let defaults = toml::Value::try_from(GanConfig::default())
        .context("serializing built-in GanConfig defaults")?;
    let with_file = match GanConfig::load_file(project_root)? {
        Some(file) => merge_toml_values(defaults, file),
        None => defaults,
    };
    let merged = merge_toml_values(with_file, env_overrides());
    GanConfig::deserialize(merged).context("deserializing merged GanConfig")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn no_file_no_env_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load(dir.path()).unwrap();
        assert_eq!(config, GanConfig::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(".gan-audit.toml"),
            "hardStopLoops = 40\n",
        )
        .unwrap();
        let config = load(dir.path()).unwrap();
        assert_eq!(config.hard_stop_loops, 40);
        assert_eq!(config.stagnation_start_loop, 10);
    }

    #[test]
    fn screaming_snake_to_camel_converts_correctly() {
        assert_eq!(screaming_snake_to_camel("MAX_CONCURRENT_AUDITS"), "maxConcurrentAudits");
        assert_eq!(screaming_snake_to_camel("ENABLE_AUDIT"), "enableAudit");
    }

    #[test]
    fn env_override_wins_over_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".gan-audit.toml"), "hardStopLoops = 40\n").unwrap();
        // SAFETY: test runs single-threaded within this process for this var.
        unsafe { std::env::set_var("GAN_HARD_STOP_LOOPS", "12") };
        let config = load(dir.path()).unwrap();
        unsafe { std::env::remove_var("GAN_HARD_STOP_LOOPS") };
        assert_eq!(config.hard_stop_loops, 12);
    }
}
