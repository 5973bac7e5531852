//! Audit-required test (§4.8 step 5): a thought is treated as carrying code
//! when its text contains a fenced code block or a unified-diff marker
//! sequence. Configuration opt-in (`SessionConfig`) is handled by the
//! caller; this module only covers the text-shape heuristic.

use regex::Regex;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```").unwrap());
static DIFF_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(diff --git |@@ |\+\+\+ |--- )").unwrap());

pub fn looks_like_code(text: &str) -> bool {
    CODE_FENCE.is_match(text) || DIFF_MARKER.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_prose_is_not_code() {
        assert!(!looks_like_code("just thinking out loud about the plan"));
    }

    #[test]
    fn fenced_block_is_code() {
        assert!(looks_like_code("here:\n```rust\nfn main() {}\n```\n"));
    }

    #[test]
    fn unified_diff_markers_are_code() {
        let diff = "diff --git a/x.rs b/x.rs\n--- a/x.rs\n+++ b/x.rs\n@@ -1 +1 @@\n-old\n+new\n";
        assert!(looks_like_code(diff));
    }
}
