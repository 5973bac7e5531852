//! Inline configuration block (§6.2): a fenced ` ```gan-config ` block inside
//! the thought text carrying a JSON partial-[`SessionConfig`] object.
//! Unrecognized fields are ignored; fields the block omits deserialize to
//! `None` rather than a default value, so merging over existing config (§3)
//! never resets a scalar the caller didn't re-supply. Malformed JSON silently
//! falls back to the prior configuration.

use std::sync::LazyLock;

use regex::Regex;

use gan_core::SessionConfigUpdate;

static CONFIG_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```gan-config\s*\n(.*?)```").unwrap());

pub fn extract(text: &str) -> Option<SessionConfigUpdate> {
    let body = CONFIG_BLOCK.captures(text)?.get(1)?.as_str();
    serde_json::from_str(body).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_well_formed_block() {
        let text = "before\n```gan-config\n{\"threshold\": 90}\n```\nafter";
        let cfg = extract(text).unwrap();
        assert_eq!(cfg.threshold, Some(90));
    }

    #[test]
    fn absent_block_returns_none() {
        assert!(extract("no config here").is_none());
    }

    #[test]
    fn malformed_json_is_ignored() {
        let text = "```gan-config\n{not json\n```";
        assert!(extract(text).is_none());
    }

    #[test]
    fn unrecognized_fields_are_dropped_not_rejected() {
        let text = "```gan-config\n{\"threshold\": 80, \"madeUpField\": 1}\n```";
        let cfg = extract(text).unwrap();
        assert_eq!(cfg.threshold, Some(80));
    }

    #[test]
    fn camel_case_field_names_are_recognized() {
        let text = "```gan-config\n{\"maxCycles\": 12, \"applyFixes\": true}\n```";
        let cfg = extract(text).unwrap();
        assert_eq!(cfg.max_cycles, Some(12));
        // applyFixes round-trips but is never honored by the engine.
        assert_eq!(cfg.apply_fixes, Some(true));
    }

    #[test]
    fn omitted_fields_deserialize_to_none_not_defaults() {
        let text = "```gan-config\n{\"task\": \"x\"}\n```";
        let cfg = extract(text).unwrap();
        assert_eq!(cfg.task, Some("x".to_string()));
        assert!(cfg.threshold.is_none());
        assert!(cfg.max_cycles.is_none());
        assert!(cfg.candidates.is_none());
        assert!(cfg.scope.is_none());
        assert!(cfg.paths.is_none());
        assert!(cfg.judges.is_none());
    }
}
