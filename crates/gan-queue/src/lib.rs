//! C4 Audit Queue: bounds judge concurrency and serializes submissions per
//! session (§4.4).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{watch, Mutex, Semaphore};
use tracing::debug;

use gan_core::GanError;

/// State transitions a submission passes through, reported to an optional
/// progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    Queued,
    Running,
    Complete,
    Failed,
    Cancelled,
}

/// A best-effort, monotonic progress report.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub state: ProgressState,
    pub progress_percent: u8,
}

pub type ProgressCallback = Box<dyn Fn(Progress) + Send + Sync>;

/// Bounds total in-flight audits to `N` and serializes per-session submissions.
///
/// A submission registers a cancellation sender keyed by session id for the
/// duration of its run; [`AuditQueue::cancel`] (called from a concurrent
/// request, e.g. a cancel-audit RPC) flips that sender and the in-flight
/// submission observes it cooperatively — either before it acquires a permit
/// (discarded without running) or during execution (the task is raced against
/// the cancel signal and dropped, which also drops any subprocess it owns).
pub struct AuditQueue {
    semaphore: Arc<Semaphore>,
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    cancellations: Mutex<HashMap<String, watch::Sender<bool>>>,
}

impl AuditQueue {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            session_locks: Mutex::new(HashMap::new()),
            cancellations: Mutex::new(HashMap::new()),
        }
    }

    async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Request cancellation of a session's in-flight (or not-yet-dispatched)
    /// submission. A no-op if no submission is currently registered.
    pub async fn cancel(&self, session_id: &str) {
        if let Some(tx) = self.cancellations.lock().await.get(session_id) {
            let _ = tx.send(true);
        }
    }

    /// Submit `task` for `session_id`. At most one submission per session id
    /// runs at a time; submissions beyond the global `N` permits queue in
    /// FIFO order.
    pub async fn submit<F, Fut>(
        &self,
        session_id: impl Into<String>,
        progress: Option<ProgressCallback>,
        task: F,
    ) -> Result<gan_core::Review, GanError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<gan_core::Review, GanError>>,
    {
        let session_id = session_id.into();
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        self.cancellations
            .lock()
            .await
            .insert(session_id.clone(), cancel_tx);

        let result = self
            .run_submission(&session_id, &progress, &mut cancel_rx, task)
            .await;

        self.cancellations.lock().await.remove(&session_id);
        result
    }

    async fn run_submission<F, Fut>(
        &self,
        session_id: &str,
        progress: &Option<ProgressCallback>,
        cancel_rx: &mut watch::Receiver<bool>,
        task: F,
    ) -> Result<gan_core::Review, GanError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<gan_core::Review, GanError>>,
    {
        report(progress, ProgressState::Queued, 0);

        if *cancel_rx.borrow() {
            report(progress, ProgressState::Cancelled, 0);
            return Err(GanError::Cancelled {
                session_id: session_id.to_string(),
            });
        }

        let session_guard = self.session_lock(session_id).await;
        let _session_permit = session_guard.lock().await;
        let _global_permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore is never closed");

        if *cancel_rx.borrow() {
            report(progress, ProgressState::Cancelled, 0);
            return Err(GanError::Cancelled {
                session_id: session_id.to_string(),
            });
        }

        report(progress, ProgressState::Running, 10);

        let result = tokio::select! {
            biased;
            _ = cancel_rx.changed() => {
                debug!(session_id, "audit cancelled mid-flight");
                Err(GanError::Cancelled { session_id: session_id.to_string() })
            }
            result = task() => result,
        };

        match &result {
            Ok(_) => report(progress, ProgressState::Complete, 100),
            Err(GanError::Cancelled { .. }) => report(progress, ProgressState::Cancelled, 100),
            Err(_) => report(progress, ProgressState::Failed, 100),
        }

        result
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

fn report(progress: &Option<ProgressCallback>, state: ProgressState, progress_percent: u8) {
    if let Some(cb) = progress {
        cb(Progress {
            state,
            progress_percent,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gan_core::Verdict;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn review(overall: u32) -> gan_core::Review {
        gan_core::Review {
            overall,
            dimensions: vec![],
            verdict: Verdict::Pass,
            summary: "ok".into(),
            inline_comments: vec![],
            citations: vec![],
            proposed_diff: None,
            iterations: 0,
            judge_cards: vec![],
        }
    }

    #[tokio::test]
    async fn submit_runs_task_and_reports_progress() {
        let queue = AuditQueue::new(2);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let cb: ProgressCallback = Box::new(move |p| {
            seen_cb.try_lock().unwrap().push(p.state);
        });

        let result = queue
            .submit("sess-1", Some(cb), || async { Ok(review(80)) })
            .await
            .unwrap();
        assert_eq!(result.overall, 80);

        let states = seen.lock().await.clone();
        assert_eq!(
            states,
            vec![
                ProgressState::Queued,
                ProgressState::Running,
                ProgressState::Complete
            ]
        );
    }

    #[tokio::test]
    async fn global_bound_serializes_beyond_n_permits() {
        let queue = Arc::new(AuditQueue::new(1));
        let counter = Arc::new(AtomicUsize::new(0));
        let max_concurrent = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..3 {
            let queue = queue.clone();
            let counter = counter.clone();
            let max_concurrent = max_concurrent.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .submit(format!("sess-{i}"), None, || async move {
                        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        max_concurrent.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        counter.fetch_sub(1, Ordering::SeqCst);
                        Ok(review(50))
                    })
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_mid_flight_yields_cancelled_error() {
        let queue = Arc::new(AuditQueue::new(1));
        let queue2 = queue.clone();
        let runner = tokio::spawn(async move {
            queue2
                .submit("sess-cancel", None, || async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(review(10))
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.cancel("sess-cancel").await;

        let result = runner.await.unwrap();
        assert!(matches!(result, Err(GanError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn cancel_of_unknown_session_is_a_no_op() {
        let queue = AuditQueue::new(1);
        queue.cancel("no-such-session").await;
        let result = queue
            .submit("sess-1", None, || async { Ok(review(10)) })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn per_session_serialization_keeps_same_session_sequential() {
        let queue = Arc::new(AuditQueue::new(4));
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..3 {
            let queue = queue.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .submit("same-session", None, || async move {
                        order.lock().await.push(i);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Ok(review(i as u32))
                    })
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(order.lock().await.len(), 3);
    }
}
