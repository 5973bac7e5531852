//! Normalized text similarity for stagnation detection (§4.7, §9).
//!
//! The source computed raw Levenshtein over full submitted text, which is
//! O(n²) on large bodies (§9's open question). `similar::TextDiff::ratio()`
//! gives an equivalent normalized similarity (a Ratcliff/Obershelp-style
//! match ratio rather than edit distance) in roughly linear time, grounded
//! on `ConaryLabs-Mira/backend/src/operations/engine/artifacts.rs`'s use of
//! the same crate. The compared text is capped to a bounded prefix so a
//! single very large candidate can't make stagnation checks expensive.

use similar::TextDiff;

/// Above this many bytes, only the leading prefix participates in the
/// similarity comparison (§9's open question, resolved here rather than
/// left unaddressed; see DESIGN.md).
const MAX_COMPARED_BYTES: usize = 8192;

/// `1 − levenshtein(a,b) / max(|a|,|b|)` in spirit: a 0..=1 similarity
/// score where `sim(a,a) = 1` and `sim(a,"") = 0` for `a ≠ ""`.
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    let a = cap(a);
    let b = cap(b);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    TextDiff::from_chars(a, b).ratio() as f64
}

fn cap(s: &str) -> &str {
    if s.len() <= MAX_COMPARED_BYTES {
        return s;
    }
    let mut end = MAX_COMPARED_BYTES;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_have_similarity_one() {
        assert_eq!(normalized_similarity("fn main() {}", "fn main() {}"), 1.0);
    }

    #[test]
    fn one_empty_nonempty_has_similarity_zero() {
        assert_eq!(normalized_similarity("fn main() {}", ""), 0.0);
    }

    #[test]
    fn both_empty_has_similarity_one() {
        assert_eq!(normalized_similarity("", ""), 1.0);
    }

    #[test]
    fn wildly_different_strings_are_dissimilar() {
        let sim = normalized_similarity("abcdefghij", "zyxwvutsrq");
        assert!(sim < 0.5);
    }

    #[test]
    fn near_identical_strings_are_highly_similar() {
        let sim = normalized_similarity("function f(){return 1}", "function f(){return 1;}");
        assert!(sim > 0.9);
    }

    #[test]
    fn comparison_is_capped_on_very_large_inputs() {
        let a = "x".repeat(50_000);
        let mut b = "x".repeat(50_000);
        b.push('y');
        // Both huge inputs agree within the capped prefix, so this must not
        // hang and must report high similarity despite differing overall.
        let sim = normalized_similarity(&a, &b);
        assert!(sim > 0.9);
    }
}
