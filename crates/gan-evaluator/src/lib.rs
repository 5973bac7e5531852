//! C7 Completion & Stagnation Evaluator (§4.7): a pure function over a
//! session's iteration scores and codes, returning a [`Decision`].
//!
//! The `Verdict`-style small-behavior-enum idiom for `reason` is already
//! established in `gan_core::CompletionReason`; this crate only adds the
//! pure evaluation logic on top, grounded on the teacher's
//! `csa-session/src/adjudication.rs` verdict-record shape. Similarity is
//! `similar::TextDiff::ratio()`, grounded on `ConaryLabs-Mira`'s use of the
//! same crate in `backend/src/operations/engine/artifacts.rs`.

mod similarity;

use gan_core::{CompletionReason, Decision, InlineComment, ProgressTrend, Verdict};
use gan_session::SessionState;

pub use similarity::normalized_similarity;

/// One (score, max-loop) tier at which completion fires early (§4.7).
#[derive(Debug, Clone, Copy)]
pub struct CompletionTier {
    pub score: u32,
    pub max_loops: u32,
    pub reason: CompletionReason,
}

/// Knobs for C7, sourced from §6.6's `completionTiers`, `hardStopLoops`,
/// `stagnationSimilarityThreshold`, `stagnationStartLoop`.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub tiers: [CompletionTier; 3],
    pub hard_stop_loops: u32,
    pub stagnation_start_loop: u32,
    pub stagnation_similarity_threshold: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            tiers: [
                CompletionTier {
                    score: 95,
                    max_loops: 10,
                    reason: CompletionReason::Score95At10,
                },
                CompletionTier {
                    score: 90,
                    max_loops: 15,
                    reason: CompletionReason::Score90At15,
                },
                CompletionTier {
                    score: 85,
                    max_loops: 20,
                    reason: CompletionReason::Score85At20,
                },
            ],
            hard_stop_loops: 25,
            stagnation_start_loop: 10,
            stagnation_similarity_threshold: 0.95,
        }
    }
}

/// Keywords a judge comment is classified as critical on, case-insensitively.
/// The judge's JSON schema carries no severity field (§3), so criticality is
/// inferred from comment text — the same gap `InlineComment::critical`'s doc
/// comment in `gan-core` flags as "set by C7 when classifying".
const CRITICAL_KEYWORDS: &[&str] = &[
    "critical",
    "security",
    "vulnerability",
    "exploit",
    "injection",
    "crash",
    "data loss",
    "panic",
    "unsafe",
];

fn is_critical(comment: &str) -> bool {
    let lower = comment.to_lowercase();
    CRITICAL_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// `evaluate(session) → Decision` (§4.7). Pure: depends only on `session`'s
/// iteration history and `config`, never on wall-clock time beyond what is
/// already recorded on the iterations.
pub fn evaluate(session: &SessionState, config: &EvaluatorConfig) -> Decision {
    let current_loop = session.current_loop;
    let latest = session.latest_iteration();
    let score = latest.map(|it| it.review.overall).unwrap_or(0);

    let critical_issues: Vec<InlineComment> = latest
        .map(|it| {
            it.review
                .inline_comments
                .iter()
                .cloned()
                .map(|mut c| {
                    c.critical = is_critical(&c.comment);
                    c
                })
                .filter(|c| c.critical)
                .collect()
        })
        .unwrap_or_default();

    let failure_rate = 1.0 - (score as f64 / 100.0);
    let progress_trend = compute_progress_trend(session);

    let stagnation = if current_loop >= config.stagnation_start_loop {
        stagnation_details(session, config)
    } else {
        None
    };

    if let Some(tier) = config
        .tiers
        .iter()
        .find(|t| score >= t.score && current_loop <= t.max_loops)
    {
        return Decision {
            complete: true,
            reason: tier.reason,
            needs_more: false,
            recommendation: None,
            current_loop,
            score,
            threshold: tier.score,
            max_loops: config.hard_stop_loops,
            stagnation_detected: stagnation.is_some(),
            progress_trend,
            failure_rate,
            critical_issues,
        };
    }

    if current_loop >= config.hard_stop_loops {
        return Decision {
            complete: true,
            reason: CompletionReason::MaxLoopsReached,
            needs_more: false,
            recommendation: None,
            current_loop,
            score,
            threshold: session.config.threshold,
            max_loops: config.hard_stop_loops,
            stagnation_detected: stagnation.is_some(),
            progress_trend,
            failure_rate,
            critical_issues,
        };
    }

    if stagnation.is_some() {
        return Decision {
            complete: true,
            reason: CompletionReason::StagnationDetected,
            needs_more: false,
            recommendation: Some("alternative approach".to_string()),
            current_loop,
            score,
            threshold: session.config.threshold,
            max_loops: config.hard_stop_loops,
            stagnation_detected: true,
            progress_trend,
            failure_rate,
            critical_issues,
        };
    }

    let verdict_passes = latest.is_some_and(|it| it.review.verdict == Verdict::Pass);
    let complete = verdict_passes && score >= session.config.threshold;
    Decision {
        complete,
        reason: CompletionReason::InProgressOrPass,
        needs_more: !complete,
        recommendation: None,
        current_loop,
        score,
        threshold: session.config.threshold,
        max_loops: config.hard_stop_loops,
        stagnation_detected: false,
        progress_trend,
        failure_rate,
        critical_issues,
    }
}

/// Compute pairwise similarity between the last 3 submitted code strings;
/// classify as stagnant iff the average ≥ threshold *and* at least
/// ⌈pairs/2⌉ individual pairs exceed 0.90 (§4.7). Returns the
/// `(averageSimilarity, pairsOverThreshold)` detail pair when stagnant, so
/// a caller that needs to persist `StagnationInfo` doesn't have to
/// recompute the similarity pass itself.
pub fn stagnation_details(session: &SessionState, config: &EvaluatorConfig) -> Option<(f64, u32)> {
    let mut recent: Vec<&str> = session
        .iterations
        .iter()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .take(3)
        .map(|it| it.code.as_str())
        .collect();
    recent.reverse();
    if recent.len() < 3 {
        return None;
    }

    let pairs = [(recent[0], recent[1]), (recent[0], recent[2]), (recent[1], recent[2])];
    let sims: Vec<f64> = pairs
        .iter()
        .map(|(a, b)| normalized_similarity(a, b))
        .collect();
    let average = sims.iter().sum::<f64>() / sims.len() as f64;
    let over_90 = sims.iter().filter(|&&s| s > 0.90).count() as u32;
    let needed = (pairs.len() as u32).div_ceil(2);

    if average >= config.stagnation_similarity_threshold && over_90 >= needed {
        Some((average, over_90))
    } else {
        None
    }
}

/// A lightweight trend signal over the last up-to-3 recorded scores: no
/// prior signal defaults to `improving` (an empty or single-iteration
/// session has nothing to regress from).
fn compute_progress_trend(session: &SessionState) -> ProgressTrend {
    let mut recent: Vec<u32> = session
        .iterations
        .iter()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .take(3)
        .map(|it| it.review.overall)
        .collect();
    recent.reverse();
    match (recent.first(), recent.last()) {
        (Some(first), Some(last)) if recent.len() >= 2 => {
            if last > first {
                ProgressTrend::Improving
            } else if last < first {
                ProgressTrend::Declining
            } else {
                ProgressTrend::Stagnant
            }
        }
        _ => ProgressTrend::Improving,
    }
}
