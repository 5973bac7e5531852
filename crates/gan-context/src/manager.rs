//! In-memory `loopId → contextId` mapping with judge-backed lifecycle (§4.2).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use gan_core::{GanError, TerminationReason};
use gan_runner::JudgeRunner;

use crate::phase::{ContextPhase, PhaseEvent};

#[derive(Debug, Clone)]
struct ContextEntry {
    context_id: String,
    phase: ContextPhase,
}

/// Owns the judge-context lifecycle for every known `loopId`.
pub struct ContextManager {
    judge: Arc<JudgeRunner>,
    entries: RwLock<HashMap<String, ContextEntry>>,
    call_timeout: Duration,
}

impl ContextManager {
    pub fn new(judge: Arc<JudgeRunner>, call_timeout: Duration) -> Self {
        Self {
            judge,
            entries: RwLock::new(HashMap::new()),
            call_timeout,
        }
    }

    /// `start(loopId) → contextId`; idempotent.
    pub async fn start(&self, loop_id: &str) -> Result<String, GanError> {
        if let Some(entry) = self.entries.read().await.get(loop_id) {
            if entry.phase == ContextPhase::Active {
                return Ok(entry.context_id.clone());
            }
        }

        let context_id = self.judge.context_start(loop_id, self.call_timeout).await?;
        let mut entries = self.entries.write().await;
        entries.insert(
            loop_id.to_string(),
            ContextEntry {
                context_id: context_id.clone(),
                phase: ContextPhase::None.transition(PhaseEvent::Started).expect("valid"),
            },
        );
        Ok(context_id)
    }

    /// Best-effort keep-alive; mismatched or missing mappings are logged and
    /// ignored rather than surfaced as errors.
    pub async fn keep_alive(&self, loop_id: &str, context_id: &str) {
        let known = {
            let entries = self.entries.read().await;
            entries.get(loop_id).map(|e| e.context_id.clone())
        };
        let Some(known) = known else {
            debug!(loop_id, "keepAlive for unknown context; ignoring");
            return;
        };
        if known != context_id {
            warn!(loop_id, %context_id, %known, "keepAlive contextId mismatch; ignoring");
            return;
        }
        if self
            .judge
            .context_maintain(context_id, loop_id, self.call_timeout)
            .await
            .is_err()
        {
            debug!(loop_id, "keepAlive failed; dropping stale mapping");
            self.entries.write().await.remove(loop_id);
        }
    }

    /// Idempotent terminate: always clears the mapping even on subcommand
    /// failure, to prevent leaks (§4.2's redundancy guarantee).
    pub async fn terminate(&self, loop_id: &str, reason: TerminationReason) {
        let context_id = {
            let mut entries = self.entries.write().await;
            entries.remove(loop_id).map(|e| e.context_id)
        };
        let Some(context_id) = context_id else {
            return;
        };
        if let Err(e) = self
            .judge
            .context_terminate(&context_id, reason.as_str(), self.call_timeout)
            .await
        {
            warn!(loop_id, %context_id, error = %e, "context termination subcommand failed");
        }
    }

    /// Terminate every known context, ignoring individual errors. The known
    /// set is small (one entry per live loop), so this runs sequentially
    /// rather than pulling in a join-all dependency the teacher doesn't have.
    pub async fn terminate_all(&self, reason: TerminationReason) {
        let loop_ids: Vec<String> = self.entries.read().await.keys().cloned().collect();
        for loop_id in loop_ids {
            self.terminate(&loop_id, reason).await;
        }
    }

    /// Probe each known context; drop mappings whose probe fails.
    pub async fn sweep_stale(&self) {
        let snapshot: Vec<(String, String)> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(loop_id, entry)| (loop_id.clone(), entry.context_id.clone()))
            .collect();

        for (loop_id, context_id) in snapshot {
            let live = self
                .judge
                .context_status(&context_id, self.call_timeout)
                .await;
            if !live {
                debug!(loop_id, context_id, "dropping stale context mapping");
                self.entries.write().await.remove(&loop_id);
            }
        }
    }

    pub async fn is_active(&self, loop_id: &str) -> bool {
        self.entries
            .read()
            .await
            .get(loop_id)
            .is_some_and(|e| e.phase == ContextPhase::Active)
    }
}
