use serde::{Deserialize, Serialize};

/// A single tool-call payload: a candidate artifact under review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thought {
    pub text: String,
    pub number: u32,
    pub total_estimate: u32,
    #[serde(default)]
    pub needs_more: bool,
    #[serde(default)]
    pub is_revision: bool,
    #[serde(default)]
    pub revises_number: Option<u32>,
    #[serde(default)]
    pub branch_from_number: Option<u32>,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub loop_id: Option<String>,
}

impl Thought {
    /// `totalEstimate`, bumped upward if `number` exceeds it.
    pub fn effective_total_estimate(&self) -> u32 {
        self.total_estimate.max(self.number)
    }
}

/// Scope of the repository context pack fed to the judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Diff,
    Paths,
    Workspace,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Diff => write!(f, "diff"),
            Self::Paths => write!(f, "paths"),
            Self::Workspace => write!(f, "workspace"),
        }
    }
}

fn default_threshold() -> u32 {
    85
}

fn default_max_cycles() -> u32 {
    25
}

fn default_candidates() -> u32 {
    1
}

/// Per-session audit configuration, extracted from an inline `gan-config` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default)]
    pub task: String,
    #[serde(default = "default_scope")]
    pub scope: Scope,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default = "default_threshold")]
    pub threshold: u32,
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,
    #[serde(default = "default_candidates")]
    pub candidates: u32,
    #[serde(default)]
    pub judges: Vec<String>,
    /// Always false for the core; field exists so a caller-supplied value round-trips
    /// without being rejected, but the engine never honors it.
    #[serde(default)]
    pub apply_fixes: bool,
}

fn default_scope() -> Scope {
    Scope::Workspace
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            task: String::new(),
            scope: default_scope(),
            paths: Vec::new(),
            threshold: default_threshold(),
            max_cycles: default_max_cycles(),
            candidates: default_candidates(),
            judges: Vec::new(),
            apply_fixes: false,
        }
    }
}

impl SessionConfig {
    /// Merge `update` over `self`: only fields `update` actually specified
    /// overwrite the corresponding field here; everything else is left as-is.
    /// `applyFixes` is never honored.
    pub fn merge_over(&mut self, update: SessionConfigUpdate) {
        if let Some(task) = update.task {
            self.task = task;
        }
        if let Some(scope) = update.scope {
            self.scope = scope;
        }
        if let Some(paths) = update.paths {
            self.paths = paths;
        }
        if let Some(threshold) = update.threshold {
            self.threshold = threshold;
        }
        if let Some(max_cycles) = update.max_cycles {
            self.max_cycles = max_cycles;
        }
        if let Some(candidates) = update.candidates {
            self.candidates = candidates;
        }
        if let Some(judges) = update.judges {
            self.judges = judges;
        }
        // apply_fixes deliberately not merged: always false for the core.
    }

    /// `scope = paths` requires a non-empty `paths` vector.
    pub fn is_valid(&self) -> bool {
        !(self.scope == Scope::Paths && self.paths.is_empty())
    }
}

/// A partial [`SessionConfig`], as deserialized from an inline `gan-config`
/// block (§3, §6.2): every field is `Option`-typed so a block that sets only
/// `threshold` doesn't reset the other scalars back to their defaults when
/// merged over an existing config. Unrecognized fields are ignored by serde;
/// `applyFixes` round-trips but [`SessionConfig::merge_over`] never honors it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfigUpdate {
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub paths: Option<Vec<String>>,
    #[serde(default)]
    pub threshold: Option<u32>,
    #[serde(default)]
    pub max_cycles: Option<u32>,
    #[serde(default)]
    pub candidates: Option<u32>,
    #[serde(default)]
    pub judges: Option<Vec<String>>,
    #[serde(default)]
    pub apply_fixes: Option<bool>,
}

/// One dimension score within a [`Review`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub score: u32,
}

/// A verdict on a single candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Revise,
    Reject,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Revise => "revise",
            Self::Reject => "reject",
        }
    }
}

impl Default for Verdict {
    fn default() -> Self {
        Self::Revise
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An inline review comment anchored to a location in the candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineComment {
    pub path: String,
    pub line: u32,
    pub comment: String,
    /// Not part of the wire schema; set by C7 when classifying critical issues.
    #[serde(skip)]
    pub critical: bool,
}

/// One judge's scorecard, when multiple judges are consulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeCard {
    pub model: String,
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The judge's structured verdict on a single candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub overall: u32,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub verdict: Verdict,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub inline_comments: Vec<InlineComment>,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub proposed_diff: Option<String>,
    #[serde(default)]
    pub iterations: u32,
    #[serde(default)]
    pub judge_cards: Vec<JudgeCard>,
}

impl Review {
    /// A minimal, clearly-marked fallback review for judge failures that are
    /// recoverable at the C8 level (§7).
    pub fn fallback(summary: impl Into<String>) -> Self {
        Self {
            overall: 0,
            dimensions: Vec::new(),
            verdict: Verdict::Revise,
            summary: summary.into(),
            inline_comments: Vec::new(),
            citations: Vec::new(),
            proposed_diff: None,
            iterations: 0,
            judge_cards: Vec::new(),
        }
    }

    /// Clamp `overall` into 0..=100 and default an out-of-range verdict. Called
    /// on every judge-sourced review before it enters session state.
    pub fn normalize(mut self) -> Self {
        self.overall = self.overall.min(100);
        for d in &mut self.dimensions {
            d.score = d.score.min(100);
        }
        self
    }
}

/// The tuple of (candidate, review, timestamp) for one thought inside a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iteration {
    pub thought_number: u32,
    pub code: String,
    pub review: Review,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// A legacy history entry, retained for audit trail only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub thought_number: u32,
    pub review: Review,
    pub config: SessionConfig,
}

/// Reason a session reached a terminal decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    Score95At10,
    Score90At15,
    Score85At20,
    MaxLoopsReached,
    StagnationDetected,
    InProgressOrPass,
}

impl CompletionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Score95At10 => "score_95_at_10",
            Self::Score90At15 => "score_90_at_15",
            Self::Score85At20 => "score_85_at_20",
            Self::MaxLoopsReached => "max_loops_reached",
            Self::StagnationDetected => "stagnation_detected",
            Self::InProgressOrPass => "in_progress_or_pass",
        }
    }

    /// Terminal reasons set `isComplete = true` and trigger C2 termination.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgressOrPass)
    }
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trend of scores across the most recent iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressTrend {
    Improving,
    Stagnant,
    Declining,
}

/// Reason a judge context was torn down (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationReason {
    Completion,
    Timeout,
    Failure,
    Manual,
    Stagnation,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completion => "completion",
            Self::Timeout => "timeout",
            Self::Failure => "failure",
            Self::Manual => "manual",
            Self::Stagnation => "stagnation",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The outcome of C7's evaluation of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub complete: bool,
    pub reason: CompletionReason,
    pub needs_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    pub current_loop: u32,
    pub score: u32,
    pub threshold: u32,
    pub max_loops: u32,
    pub stagnation_detected: bool,
    pub progress_trend: ProgressTrend,
    pub failure_rate: f64,
    pub critical_issues: Vec<InlineComment>,
}

impl Decision {
    pub fn termination_reason(&self) -> TerminationReason {
        match self.reason {
            CompletionReason::StagnationDetected => TerminationReason::Stagnation,
            CompletionReason::MaxLoopsReached => TerminationReason::Failure,
            _ => TerminationReason::Completion,
        }
    }
}
