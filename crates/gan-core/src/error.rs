/// Classifications from §7. Each variant carries enough context to build a
/// human-actionable suggestion without the caller needing to inspect a
/// nested cause chain.
#[derive(thiserror::Error, Debug)]
pub enum GanError {
    #[error("judge unavailable: failed to spawn '{command}': {reason}")]
    JudgeUnavailable { command: String, reason: String },

    #[error("judge timed out after {millis}ms")]
    JudgeTimeout { millis: u64 },

    #[error("judge produced no parseable JSON object in its output")]
    JudgeUnparseable,

    #[error("judge output failed schema validation: {reason}")]
    JudgeSchemaInvalid { reason: String },

    #[error("judge exited with status {code}: {stderr}")]
    JudgeNonzeroExit { code: i32, stderr: String },

    #[error("submitted candidate is not recognizable as code: {reason}")]
    InvalidCodeFormat { reason: String },

    #[error("session '{id}' state is corrupted ({kind})")]
    SessionCorruption { id: String, kind: String },

    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("audit queue is full (max {max} waiters)")]
    QueueFull { max: usize },

    #[error("failed to start judge context for loop '{loop_id}': {reason}")]
    ContextStartFailed { loop_id: String, reason: String },

    #[error("audit for session '{session_id}' was cancelled")]
    Cancelled { session_id: String },

    #[error("request record is invalid: {0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serde(String),
}

impl GanError {
    /// Errors that C8 converts into a structured response rather than a hard
    /// transport-level failure (§7's propagation policy).
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidRequest(_) | Self::Io(_) | Self::Serde(_)
        )
    }
}

impl From<std::io::Error> for GanError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for GanError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_judge_unavailable() {
        let err = GanError::JudgeUnavailable {
            command: "gan-judge".into(),
            reason: "No such file or directory".into(),
        };
        assert_eq!(
            err.to_string(),
            "judge unavailable: failed to spawn 'gan-judge': No such file or directory"
        );
    }

    #[test]
    fn test_display_judge_timeout() {
        let err = GanError::JudgeTimeout { millis: 30000 };
        assert_eq!(err.to_string(), "judge timed out after 30000ms");
    }

    #[test]
    fn test_display_judge_unparseable() {
        assert_eq!(
            GanError::JudgeUnparseable.to_string(),
            "judge produced no parseable JSON object in its output"
        );
    }

    #[test]
    fn test_display_judge_nonzero_exit() {
        let err = GanError::JudgeNonzeroExit {
            code: 1,
            stderr: "boom".into(),
        };
        assert_eq!(err.to_string(), "judge exited with status 1: boom");
    }

    #[test]
    fn test_display_session_corruption() {
        let err = GanError::SessionCorruption {
            id: "abc123".into(),
            kind: "formatMismatch".into(),
        };
        assert_eq!(
            err.to_string(),
            "session 'abc123' state is corrupted (formatMismatch)"
        );
    }

    #[test]
    fn test_display_session_not_found() {
        let err = GanError::SessionNotFound("abc123".into());
        assert_eq!(err.to_string(), "session 'abc123' not found");
    }

    #[test]
    fn test_display_queue_full() {
        let err = GanError::QueueFull { max: 5 };
        assert_eq!(err.to_string(), "audit queue is full (max 5 waiters)");
    }

    #[test]
    fn test_display_cancelled() {
        let err = GanError::Cancelled {
            session_id: "sess-1".into(),
        };
        assert_eq!(err.to_string(), "audit for session 'sess-1' was cancelled");
    }

    #[test]
    fn test_display_context_start_failed() {
        let err = GanError::ContextStartFailed {
            loop_id: "loop-1".into(),
            reason: "empty context id".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to start judge context for loop 'loop-1': empty context id"
        );
    }

    #[test]
    fn test_recoverability() {
        assert!(
            GanError::JudgeUnavailable {
                command: "x".into(),
                reason: "y".into()
            }
            .is_recoverable()
        );
        assert!(
            GanError::SessionCorruption {
                id: "x".into(),
                kind: "y".into()
            }
            .is_recoverable()
        );
        assert!(!GanError::InvalidRequest("bad type".into()).is_recoverable());
        assert!(!GanError::Io("disk full".into()).is_recoverable());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GanError>();
    }

    #[test]
    fn test_display_boundary_values() {
        let err = GanError::QueueFull { max: 0 };
        assert_eq!(err.to_string(), "audit queue is full (max 0 waiters)");

        let err = GanError::JudgeTimeout { millis: u64::MAX };
        assert!(err.to_string().contains(&u64::MAX.to_string()));

        let err = GanError::InvalidRequest(String::new());
        assert_eq!(err.to_string(), "request record is invalid: ");
    }
}
