//! Parsing the judge's stdout into a [`Review`] record (§4.1's "Parsing").

use gan_core::{GanError, Review};

/// Parse `stdout` as a single Review-shaped JSON object.
///
/// Tries a strict whole-string parse first; on failure, performs a greedy
/// trailing-object extraction (find the last `{` that balances through EOF)
/// and retries. Returns `JudgeUnparseable` if no object can be extracted,
/// or `JudgeSchemaInvalid` if an object parses but doesn't fit the schema.
pub fn parse(stdout: &str) -> Result<Review, GanError> {
    if let Ok(review) = serde_json::from_str::<Review>(stdout.trim()) {
        return Ok(review.normalize());
    }

    let candidate = extract_trailing_object(stdout).ok_or(GanError::JudgeUnparseable)?;
    serde_json::from_str::<Review>(&candidate)
        .map(Review::normalize)
        .map_err(|e| GanError::JudgeSchemaInvalid {
            reason: e.to_string(),
        })
}

/// Find the last `{` in `text` whose braces balance through to the end of
/// the string (ignoring braces inside string literals), and return that
/// substring. This tolerates a judge that prints diagnostic text or partial
/// streaming output before its final JSON object.
fn extract_trailing_object(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let open_positions: Vec<usize> = text
        .char_indices()
        .filter(|&(_, c)| c == '{')
        .map(|(i, _)| i)
        .collect();

    for &start in open_positions.iter().rev() {
        if let Some(end) = find_balanced_end(bytes, start) {
            let candidate = &text[start..=end];
            if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
                return Some(candidate.to_string());
            }
        }
    }
    None
}

/// Starting at `bytes[start] == '{'`, scan forward tracking brace depth
/// (skipping over string literals and their escapes) and return the index
/// of the matching closing `}`, or `None` if it never balances.
fn find_balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else {
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_parse_succeeds_on_clean_output() {
        let stdout = r#"{"overall": 88, "verdict": "pass", "summary": "looks good"}"#;
        let review = parse(stdout).unwrap();
        assert_eq!(review.overall, 88);
        assert_eq!(review.verdict.as_str(), "pass");
    }

    #[test]
    fn greedy_extraction_skips_leading_diagnostic_text() {
        let stdout = "warming up...\nanalyzing repository\n{\"overall\": 72, \"verdict\": \"revise\"}";
        let review = parse(stdout).unwrap();
        assert_eq!(review.overall, 72);
    }

    #[test]
    fn greedy_extraction_handles_braces_inside_strings() {
        let stdout = r#"{"overall": 60, "verdict": "revise", "summary": "contains a { brace }"}"#;
        let review = parse(stdout).unwrap();
        assert_eq!(review.overall, 60);
        assert_eq!(review.summary, "contains a { brace }");
    }

    #[test]
    fn unparseable_when_no_object_present() {
        let err = parse("no json here at all").unwrap_err();
        assert!(matches!(err, GanError::JudgeUnparseable));
    }

    #[test]
    fn unparseable_on_truncated_object() {
        let err = parse(r#"{"overall": 72, "verd"#).unwrap_err();
        assert!(matches!(err, GanError::JudgeUnparseable));
    }

    #[test]
    fn overall_is_clamped_to_one_hundred() {
        let stdout = r#"{"overall": 250, "verdict": "pass"}"#;
        let review = parse(stdout).unwrap();
        assert_eq!(review.overall, 100);
    }

    #[test]
    fn missing_fields_default_per_review_invariants() {
        let stdout = r#"{"overall": 50}"#;
        let review = parse(stdout).unwrap();
        assert_eq!(review.verdict.as_str(), "revise");
        assert!(review.dimensions.is_empty());
        assert!(review.inline_comments.is_empty());
        assert!(review.citations.is_empty());
    }
}
