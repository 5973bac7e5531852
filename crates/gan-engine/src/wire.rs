//! Tool-call request/response records (§6.1, §6.3): camelCase wire shapes
//! distinct from `gan_core::Thought`, which uses Rust-idiomatic field names
//! internally. This module only translates between the two.

use serde::{Deserialize, Serialize};

use gan_core::{CompletionReason, Dimension, InlineComment, JudgeCard, ProgressTrend, Review, Thought, Verdict};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRequest {
    pub thought: String,
    pub thought_number: u32,
    pub total_thoughts: u32,
    pub next_thought_needed: bool,
    #[serde(default)]
    pub is_revision: bool,
    #[serde(default)]
    pub revises_thought: Option<u32>,
    #[serde(default)]
    pub branch_from_thought: Option<u32>,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub loop_id: Option<String>,
    #[serde(default)]
    pub needs_more_thoughts: Option<bool>,
}

impl ToolRequest {
    /// `needsMore` on the internal [`Thought`] is the caller's advisory
    /// intent, folded from either of the two wire fields that can express it.
    pub fn into_thought(self) -> Thought {
        let needs_more = self.next_thought_needed || self.needs_more_thoughts.unwrap_or(false);
        Thought {
            text: self.thought,
            number: self.thought_number,
            total_estimate: self.total_thoughts,
            needs_more,
            is_revision: self.is_revision,
            revises_number: self.revises_thought,
            branch_from_number: self.branch_from_thought,
            branch_id: self.branch_id,
            loop_id: self.loop_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStatus {
    pub is_complete: bool,
    pub reason: CompletionReason,
    pub current_loop: u32,
    pub score: u32,
    pub threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopInfo {
    pub current_loop: u32,
    pub max_loops: u32,
    pub progress_trend: ProgressTrend,
    pub stagnation_detected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminationInfo {
    pub reason: String,
    pub failure_rate: f64,
    pub critical_issues: Vec<InlineComment>,
    pub final_assessment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBlock {
    pub overall: u32,
    pub verdict: Verdict,
    pub dimensions: Vec<Dimension>,
    pub summary: String,
    pub inline_comments: Vec<InlineComment>,
    pub citations: Vec<String>,
    pub proposed_diff: Option<String>,
    pub iterations: u32,
    pub judge_cards: Vec<JudgeCard>,
    pub completion_status: CompletionStatus,
    pub loop_info: LoopInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_info: Option<TerminationInfo>,
}

impl ReviewBlock {
    pub fn from_review(review: &Review) -> Self {
        Self {
            overall: review.overall,
            verdict: review.verdict,
            dimensions: review.dimensions.clone(),
            summary: review.summary.clone(),
            inline_comments: review.inline_comments.clone(),
            citations: review.citations.clone(),
            proposed_diff: review.proposed_diff.clone(),
            iterations: review.iterations,
            judge_cards: review.judge_cards.clone(),
            completion_status: CompletionStatus {
                is_complete: false,
                reason: CompletionReason::InProgressOrPass,
                current_loop: 0,
                score: review.overall,
                threshold: 0,
            },
            loop_info: LoopInfo {
                current_loop: 0,
                max_loops: 0,
                progress_trend: ProgressTrend::Improving,
                stagnation_detected: false,
            },
            termination_info: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub thought_number: u32,
    pub total_thoughts: u32,
    pub next_thought_needed: bool,
    pub branches: Vec<String>,
    pub thought_history_length: u32,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_more_folds_either_wire_field() {
        let req = ToolRequest {
            thought: "x".into(),
            thought_number: 1,
            total_thoughts: 1,
            next_thought_needed: false,
            is_revision: false,
            revises_thought: None,
            branch_from_thought: None,
            branch_id: None,
            loop_id: None,
            needs_more_thoughts: Some(true),
        };
        assert!(req.into_thought().needs_more);
    }

    #[test]
    fn request_deserializes_from_camel_case_json() {
        let json = r#"{"thought":"do it","thoughtNumber":1,"totalThoughts":3,"nextThoughtNeeded":true,"branchId":"s1"}"#;
        let req: ToolRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.branch_id.as_deref(), Some("s1"));
        assert_eq!(req.total_thoughts, 3);
    }

    #[test]
    fn response_serializes_thought_history_length_as_camel_case() {
        let resp = ToolResponse {
            thought_number: 1,
            total_thoughts: 1,
            next_thought_needed: false,
            branches: vec![],
            thought_history_length: 4,
            session_id: "s1".into(),
            review: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["thoughtHistoryLength"], 4);
        assert!(json.get("review").is_none());
    }
}
