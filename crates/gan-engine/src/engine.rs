//! C8 Synchronous Engine (§4.8): the end-to-end orchestrator composing
//! C1–C7 behind one `process` call per tool invocation.
//!
//! `GanEngine` owns `Arc` handles to each collaborator, cloned cheaply per
//! call — the same pattern `cli-sub-agent`'s dispatch uses to hold its
//! collaborators across concurrent invocations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use gan_cache::AuditCache;
use gan_context::ContextManager;
use gan_core::{fingerprint, GanError, Iteration, Review};
use gan_evaluator::{self, EvaluatorConfig};
use gan_queue::AuditQueue;
use gan_runner::JudgeRunner;
use gan_session::history::HistoryConfig;
use gan_session::{MemoryHistory, SessionState, SessionStore};

use crate::context_pack::ContextPackBuilder;
use crate::wire::{CompletionStatus, LoopInfo, ReviewBlock, TerminationInfo, ToolRequest, ToolResponse};
use crate::{detect, inline_config, prompt};

/// Ambient knobs for C8, independent of `gan-config`'s on-disk layer — the
/// binary crate is responsible for translating a loaded `GanConfig` into
/// this struct.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub enable_audit: bool,
    pub audit_timeout: Duration,
    pub state_directory: PathBuf,
    pub judge_executable: PathBuf,
    pub max_concurrent_audits: usize,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub context_call_timeout: Duration,
    pub history: HistoryConfig,
    pub evaluator: EvaluatorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_audit: true,
            audit_timeout: Duration::from_secs(30),
            state_directory: PathBuf::from(".mcp-gan-state"),
            judge_executable: PathBuf::from("gan-judge"),
            max_concurrent_audits: 5,
            cache_capacity: 256,
            cache_ttl: Duration::from_secs(3600),
            context_call_timeout: Duration::from_secs(10),
            history: HistoryConfig::default(),
            evaluator: EvaluatorConfig::default(),
        }
    }
}

pub struct GanEngine {
    store: Arc<SessionStore>,
    history: Arc<MemoryHistory>,
    cache: Arc<AuditCache>,
    queue: Arc<AuditQueue>,
    context: Arc<ContextManager>,
    judge: Arc<JudgeRunner>,
    context_pack_builder: Arc<dyn ContextPackBuilder>,
    evaluator_config: EvaluatorConfig,
    enable_audit: bool,
    audit_timeout: Duration,
    default_session_id: String,
}

impl GanEngine {
    pub fn new(
        config: EngineConfig,
        context_pack_builder: Arc<dyn ContextPackBuilder>,
    ) -> Result<Self, GanError> {
        let store = Arc::new(SessionStore::new(&config.state_directory)?);
        let history = Arc::new(MemoryHistory::new(config.history));
        let cache = Arc::new(AuditCache::new(config.cache_capacity, config.cache_ttl));
        let queue = Arc::new(AuditQueue::new(config.max_concurrent_audits));
        let judge = Arc::new(JudgeRunner::new(config.judge_executable));
        let context = Arc::new(ContextManager::new(judge.clone(), config.context_call_timeout));

        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_default();
        let default_session_id = gan_session::generate_id(&cwd, &user, 0);

        Ok(Self {
            store,
            history,
            cache,
            queue,
            context,
            judge,
            context_pack_builder,
            evaluator_config: config.evaluator,
            enable_audit: config.enable_audit,
            audit_timeout: config.audit_timeout,
            default_session_id,
        })
    }

    pub async fn process(&self, request: ToolRequest) -> Result<ToolResponse, GanError> {
        if request.thought.trim().is_empty() {
            return Err(GanError::InvalidRequest("thought must not be empty".into()));
        }
        if request.thought_number < 1 {
            return Err(GanError::InvalidRequest("thoughtNumber must be >= 1".into()));
        }
        if request.total_thoughts < 1 {
            return Err(GanError::InvalidRequest("totalThoughts must be >= 1".into()));
        }

        let thought = request.into_thought();
        let total_thoughts = thought.effective_total_estimate();

        // 2. Resolve session.
        let session_id = thought
            .branch_id
            .clone()
            .unwrap_or_else(|| self.default_session_id.clone());
        let loop_id = thought.loop_id.clone();

        let load = self.store.load(&session_id)?;
        let mut state = load.state;
        state.id = session_id.clone();
        if let Some(lid) = &loop_id {
            state.loop_id = Some(lid.clone());
        }
        if let Some(update) = inline_config::extract(&thought.text) {
            state.config.merge_over(update);
        }

        let known_branches = self.store.list_all()?;

        // 3. Guard-rail: terminal sessions short-circuit without mutation.
        if state.is_complete {
            let materialized = self.history.materialize(&state);
            let decision = gan_evaluator::evaluate(&materialized, &self.evaluator_config);
            let review = materialized
                .latest_iteration()
                .map(|it| it.review.clone())
                .unwrap_or_else(|| Review::fallback("session already complete; no review recorded"));
            return Ok(self.build_response(
                &state,
                thought.number,
                total_thoughts,
                known_branches,
                Some(review),
                Some(decision),
            ));
        }

        if !self.enable_audit {
            return Ok(self.build_response(
                &state,
                thought.number,
                total_thoughts,
                known_branches,
                None,
                None,
            ));
        }

        // 4. Build context pack.
        let builder = self.context_pack_builder.clone();
        let pack_config = state.config.clone();
        let context_pack = tokio::task::spawn_blocking(move || builder.build(&pack_config))
            .await
            .map_err(|e| GanError::Io(e.to_string()))??;

        // 5. Audit-required test.
        let code = thought.text.clone();
        let needs_audit = detect::looks_like_code(&code);

        let review = if needs_audit {
            self.audit(&mut state, thought.number, &loop_id, &code, &context_pack)
                .await
        } else {
            Review::fallback("no audit performed: thought does not carry code")
        };

        // 9. Record iteration.
        let iteration = Iteration {
            thought_number: thought.number,
            code: code.clone(),
            review: review.clone(),
            timestamp: Utc::now(),
        };
        self.history.append(&mut state, iteration.clone()).await;
        state.history.push(gan_core::HistoryEntry {
            timestamp: iteration.timestamp,
            thought_number: thought.number,
            review: review.clone(),
            config: state.config.clone(),
        });
        state.touch();

        // 10. Decide.
        let eval_view = self.history.materialize(&state);
        let decision = gan_evaluator::evaluate(&eval_view, &self.evaluator_config);

        // 11. Terminal cleanup.
        if decision.complete {
            if let Some(lid) = &loop_id {
                self.context.terminate(lid, decision.termination_reason()).await;
            }
            state.is_complete = true;
            state.completion_reason = Some(decision.reason);
            if decision.stagnation_detected {
                if let Some((average_similarity, pairs_over_threshold)) =
                    gan_evaluator::stagnation_details(&eval_view, &self.evaluator_config)
                {
                    state.stagnation_info = Some(gan_session::StagnationInfo {
                        average_similarity,
                        pairs_over_threshold,
                    });
                }
            }
            state.clear_judge_context();
        }

        self.store.save(&state)?;

        // 12. Compose response.
        Ok(self.build_response(
            &state,
            thought.number,
            total_thoughts,
            known_branches,
            Some(review),
            Some(decision),
        ))
    }

    /// Background maintenance: sweeps session files older than
    /// `max_session_age` off disk (C5) and releases judge contexts that have
    /// gone stale (C2). Intended to be called periodically from a
    /// `tokio::spawn`ed task held by the binary's `main`.
    pub async fn sweep(&self, max_session_age: Duration) -> Result<usize, GanError> {
        self.context.sweep_stale().await;
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.sweep(max_session_age))
            .await
            .map_err(|e| GanError::Io(e.to_string()))?
    }

    /// Steps 6–8: cache probe, context start, queue submission, cache store.
    async fn audit(
        &self,
        state: &mut SessionState,
        thought_number: u32,
        loop_id: &Option<String>,
        code: &str,
        context_pack: &str,
    ) -> Review {
        let key = fingerprint::compute(code, &state.config, context_pack);
        if let Some(cached) = self.cache.lookup(&key).await {
            return cached;
        }

        if let Some(lid) = loop_id {
            match self.context.start(lid).await {
                Ok(context_id) => state.set_judge_context(Some(context_id)),
                Err(e) => warn!(loop_id = %lid, error = %e, "judge context unavailable; continuing without it"),
            }
        }

        let prompt = prompt::build(&state.config, code, context_pack);
        let judge = self.judge.clone();
        let timeout = self.audit_timeout;
        let result = self
            .queue
            .submit(state.id.clone(), None, move || async move { judge.run(&prompt, timeout).await })
            .await;

        let review = match result {
            Ok(review) => review.normalize(),
            Err(err) => {
                state.record_failure(thought_number, error_kind(&err), err.to_string());
                fallback_for(&err)
            }
        };

        self.cache.store(key, review.clone()).await;
        review
    }

    fn build_response(
        &self,
        state: &SessionState,
        thought_number: u32,
        total_thoughts: u32,
        mut branches: Vec<String>,
        review: Option<Review>,
        decision: Option<gan_core::Decision>,
    ) -> ToolResponse {
        branches.sort();
        let thought_history_length = (state.iterations.len() + state.cold.len()) as u32;
        let next_thought_needed = !decision.as_ref().is_some_and(|d| d.complete);

        let review_block = review.map(|r| {
            let mut block = ReviewBlock::from_review(&r);
            if let Some(d) = &decision {
                block.completion_status = CompletionStatus {
                    is_complete: d.complete,
                    reason: d.reason,
                    current_loop: d.current_loop,
                    score: d.score,
                    threshold: d.threshold,
                };
                let max_loops = state.config.max_cycles.min(d.max_loops);
                block.loop_info = LoopInfo {
                    current_loop: d.current_loop,
                    max_loops,
                    progress_trend: d.progress_trend,
                    stagnation_detected: d.stagnation_detected,
                };
                if d.complete {
                    block.termination_info = Some(TerminationInfo {
                        reason: d.termination_reason().as_str().to_string(),
                        failure_rate: d.failure_rate,
                        critical_issues: d.critical_issues.clone(),
                        final_assessment: r.summary.clone(),
                    });
                }
            }
            block
        });

        ToolResponse {
            thought_number,
            total_thoughts,
            next_thought_needed,
            branches,
            thought_history_length,
            session_id: state.id.clone(),
            review: review_block,
        }
    }
}

fn error_kind(err: &GanError) -> &'static str {
    match err {
        GanError::JudgeUnavailable { .. } => "judgeUnavailable",
        GanError::JudgeTimeout { .. } => "judgeTimeout",
        GanError::JudgeUnparseable => "judgeUnparseable",
        GanError::JudgeSchemaInvalid { .. } => "judgeSchemaInvalid",
        GanError::JudgeNonzeroExit { .. } => "judgeNonzeroExit",
        GanError::Cancelled { .. } => "cancelled",
        GanError::ContextStartFailed { .. } => "contextStartFailed",
        _ => "unknown",
    }
}

/// Recoverable-at-C8 judge/queue failures are converted to a fallback review
/// rather than propagated (§7).
fn fallback_for(err: &GanError) -> Review {
    match err {
        GanError::JudgeTimeout { millis } => Review::fallback(format!(
            "judge timed out after {millis}ms; guidance: shrink scope and resubmit"
        )),
        other => Review::fallback(format!("audit failed: {other}")),
    }
}
