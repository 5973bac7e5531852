//! C1 Judge Runner: invoke the external judge, enforce a timeout, parse its
//! review (§4.1).

use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

use gan_core::{GanError, Review};

use crate::process::{self, ExecutionResult};
use crate::review_parse;

/// Invokes a configured judge executable's `exec`/`context` subcommands.
#[derive(Debug, Clone)]
pub struct JudgeRunner {
    executable: PathBuf,
}

impl JudgeRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// `<judge> exec <prompt>` → parsed [`Review`] (§4.1, §6.4).
    pub async fn run(&self, prompt: &str, timeout: Duration) -> Result<Review, GanError> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("exec").arg(prompt);

        let child = process::spawn(cmd).await?;
        let result = match tokio::time::timeout(
            timeout,
            process::wait_with_idle_timeout(child, timeout, None),
        )
        .await
        {
            Ok(inner) => inner?,
            Err(_) => {
                return Err(GanError::JudgeTimeout {
                    millis: timeout.as_millis() as u64,
                });
            }
        };

        self.review_from_result(result)
    }

    fn review_from_result(&self, result: ExecutionResult) -> Result<Review, GanError> {
        if result.idle_timed_out {
            // Partial stdout may still carry a complete trailing object; try it
            // before giving up, per §7's "partial review (if any)" guidance.
            return review_parse::parse(&result.stdout).or(Err(GanError::JudgeTimeout {
                millis: 0,
            }));
        }
        if result.exit_code != 0 {
            return Err(GanError::JudgeNonzeroExit {
                code: result.exit_code,
                stderr: result.stderr,
            });
        }
        review_parse::parse(&result.stdout)
    }

    /// `<judge> context start --loop-id <loopId>` → non-empty context id.
    pub async fn context_start(
        &self,
        loop_id: &str,
        timeout: Duration,
    ) -> Result<String, GanError> {
        let mut cmd = Command::new(&self.executable);
        cmd.args(["context", "start", "--loop-id", loop_id]);
        let result = process::run_to_completion(cmd, timeout).await?;
        let id = result.stdout.trim().to_string();
        if result.exit_code != 0 || id.is_empty() {
            return Err(GanError::ContextStartFailed {
                loop_id: loop_id.to_string(),
                reason: if id.is_empty() {
                    "empty context id".to_string()
                } else {
                    result.stderr
                },
            });
        }
        Ok(id)
    }

    /// `<judge> context maintain --context-id <id> --loop-id <loopId>`.
    pub async fn context_maintain(
        &self,
        context_id: &str,
        loop_id: &str,
        timeout: Duration,
    ) -> Result<(), GanError> {
        let mut cmd = Command::new(&self.executable);
        cmd.args([
            "context",
            "maintain",
            "--context-id",
            context_id,
            "--loop-id",
            loop_id,
        ]);
        let result = process::run_to_completion(cmd, timeout).await?;
        if result.exit_code != 0 {
            return Err(GanError::JudgeNonzeroExit {
                code: result.exit_code,
                stderr: result.stderr,
            });
        }
        Ok(())
    }

    /// `<judge> context terminate --context-id <id> --reason <reason>`.
    pub async fn context_terminate(
        &self,
        context_id: &str,
        reason: &str,
        timeout: Duration,
    ) -> Result<(), GanError> {
        let mut cmd = Command::new(&self.executable);
        cmd.args([
            "context",
            "terminate",
            "--context-id",
            context_id,
            "--reason",
            reason,
        ]);
        let result = process::run_to_completion(cmd, timeout).await?;
        if result.exit_code != 0 {
            return Err(GanError::JudgeNonzeroExit {
                code: result.exit_code,
                stderr: result.stderr,
            });
        }
        Ok(())
    }

    /// `<judge> context status --context-id <id>`; non-zero exit ⇒ not live.
    pub async fn context_status(&self, context_id: &str, timeout: Duration) -> bool {
        let mut cmd = Command::new(&self.executable);
        cmd.args(["context", "status", "--context-id", context_id]);
        match process::run_to_completion(cmd, timeout).await {
            Ok(result) => result.exit_code == 0,
            Err(_) => false,
        }
    }
}
