use crate::types::SessionConfig;
use sha2::{Digest, Sha256};

/// A stable hash over `{normalized(code), relevant(config), contextPack}`,
/// used as the [`crate::AuditFingerprint`] key for C3.
///
/// `relevant(config)` excludes free-form descriptive fields (`task`);
/// `normalized(code)` strips trailing whitespace from each line.
pub fn compute(code: &str, config: &SessionConfig, context_pack: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_code(code).as_bytes());
    hasher.update(b"\0");
    hasher.update(relevant_config_bytes(config));
    hasher.update(b"\0");
    hasher.update(context_pack.as_bytes());
    let digest = hasher.finalize();
    hex_encode(&digest)
}

fn normalize_code(code: &str) -> String {
    code.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

fn relevant_config_bytes(config: &SessionConfig) -> Vec<u8> {
    // `task` is free-form and descriptive; everything else participates in
    // the fingerprint because it can change what the judge is asked to do.
    format!(
        "{}|{}|{}|{}|{}|{}",
        config.scope,
        config.paths.join(","),
        config.threshold,
        config.max_cycles,
        config.candidates,
        config.judges.join(",")
    )
    .into_bytes()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SessionConfig {
        SessionConfig {
            task: "irrelevant".into(),
            ..Default::default()
        }
    }

    #[test]
    fn same_inputs_produce_same_fingerprint() {
        let a = compute("fn main() {}", &cfg(), "pack");
        let b = compute("fn main() {}", &cfg(), "pack");
        assert_eq!(a, b);
    }

    #[test]
    fn task_field_does_not_affect_fingerprint() {
        let mut other = cfg();
        other.task = "completely different task".into();
        let a = compute("fn main() {}", &cfg(), "pack");
        let b = compute("fn main() {}", &other, "pack");
        assert_eq!(a, b);
    }

    #[test]
    fn trailing_whitespace_does_not_affect_fingerprint() {
        let a = compute("fn main() {}  \n", &cfg(), "pack");
        let b = compute("fn main() {}\n", &cfg(), "pack");
        assert_eq!(a, b);
    }

    #[test]
    fn different_code_produces_different_fingerprint() {
        let a = compute("fn main() {}", &cfg(), "pack");
        let b = compute("fn main() { println!(); }", &cfg(), "pack");
        assert_ne!(a, b);
    }

    #[test]
    fn different_threshold_produces_different_fingerprint() {
        let mut other = cfg();
        other.threshold = 99;
        let a = compute("fn main() {}", &cfg(), "pack");
        let b = compute("fn main() {}", &other, "pack");
        assert_ne!(a, b);
    }
}
