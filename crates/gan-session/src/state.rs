//! [`SessionState`] (§3): the persistent record owned by C5/C6. One file per
//! session id, round-tripped through plain `serde_json` per §6.5.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use gan_core::{CompletionReason, HistoryEntry, Iteration, SessionConfig};

/// A compressed hot-iteration blob, owned by C6 (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedIteration {
    pub original_size: u64,
    pub compressed_size: u64,
    pub compressed_at: DateTime<Utc>,
    pub blob_base64: String,
}

/// Outcome of C7's similarity-based stagnation check, mirrored onto the
/// session for observability (`loopInfo.stagnationDetected`, §6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagnationInfo {
    pub average_similarity: f64,
    pub pairs_over_threshold: u32,
}

/// One entry in the failure log (§3, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureLogEntry {
    pub timestamp: DateTime<Utc>,
    pub thought_number: u32,
    pub error_kind: String,
    pub message: String,
    #[serde(default)]
    pub context: String,
}

/// The persistent, per-session state owned by C5 and mutated only through
/// C5/C6 (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub id: String,
    #[serde(default)]
    pub loop_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub config: SessionConfig,

    /// Legacy history, retained for audit trail only (§3).
    #[serde(default)]
    pub history: Vec<HistoryEntry>,

    /// Hot iteration set, trimmed by C6.
    #[serde(default)]
    pub iterations: Vec<Iteration>,

    /// Cold (compressed) iterations, keyed by `thoughtNumber`.
    #[serde(default)]
    pub cold: HashMap<u32, CompressedIteration>,

    #[serde(default)]
    pub current_loop: u32,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub completion_reason: Option<CompletionReason>,
    #[serde(default)]
    pub stagnation_info: Option<StagnationInfo>,

    #[serde(default)]
    pub judge_context_id: Option<String>,
    #[serde(default)]
    pub judge_context_active: bool,

    #[serde(default)]
    pub failures: Vec<FailureLogEntry>,
}

impl SessionState {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            loop_id: None,
            created_at: now,
            updated_at: now,
            config: SessionConfig::default(),
            history: Vec::new(),
            iterations: Vec::new(),
            cold: HashMap::new(),
            current_loop: 0,
            is_complete: false,
            completion_reason: None,
            stagnation_info: None,
            judge_context_id: None,
            judge_context_active: false,
            failures: Vec::new(),
        }
    }

    /// Invariant 1 (§8): `currentLoop = max(thoughtNumber)` across hot ∪ cold.
    pub fn recompute_current_loop(&mut self) {
        let hot_max = self.iterations.iter().map(|it| it.thought_number).max();
        let cold_max = self.cold.keys().copied().max();
        self.current_loop = hot_max.into_iter().chain(cold_max).max().unwrap_or(0);
    }

    /// Invariant 2 (§8): `judgeContextActive ⇔ judgeContextId is set`.
    pub fn set_judge_context(&mut self, context_id: Option<String>) {
        self.judge_context_active = context_id.is_some();
        self.judge_context_id = context_id;
    }

    pub fn clear_judge_context(&mut self) {
        self.judge_context_id = None;
        self.judge_context_active = false;
    }

    /// The most recently recorded review, if any (hot set only; cold tail is
    /// never the most recent since it is compressed only after it ages out).
    pub fn latest_iteration(&self) -> Option<&Iteration> {
        self.iterations.iter().max_by_key(|it| it.thought_number)
    }

    pub fn record_failure(&mut self, thought_number: u32, kind: &str, message: impl Into<String>) {
        self.failures.push(FailureLogEntry {
            timestamp: Utc::now(),
            thought_number,
            error_kind: kind.to_string(),
            message: message.into(),
            context: String::new(),
        });
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recompute_current_loop_uses_max_of_hot_and_cold() {
        let mut state = SessionState::new("s1");
        state.iterations.push(sample_iteration(3));
        state.cold.insert(
            7,
            CompressedIteration {
                original_size: 10,
                compressed_size: 5,
                compressed_at: Utc::now(),
                blob_base64: String::new(),
            },
        );
        state.recompute_current_loop();
        assert_eq!(state.current_loop, 7);
    }

    #[test]
    fn recompute_current_loop_defaults_to_zero() {
        let mut state = SessionState::new("s1");
        state.recompute_current_loop();
        assert_eq!(state.current_loop, 0);
    }

    #[test]
    fn judge_context_invariant_holds_through_set_and_clear() {
        let mut state = SessionState::new("s1");
        state.set_judge_context(Some("ctx-1".into()));
        assert!(state.judge_context_active);
        state.clear_judge_context();
        assert!(!state.judge_context_active);
        assert!(state.judge_context_id.is_none());
    }

    fn sample_iteration(thought_number: u32) -> Iteration {
        Iteration {
            thought_number,
            code: "fn main() {}".into(),
            review: gan_core::Review::fallback("x"),
            timestamp: Utc::now(),
        }
    }
}
