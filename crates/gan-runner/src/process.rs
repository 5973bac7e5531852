//! Subprocess spawning and output capture, shared by the judge `exec` and
//! `context` command surfaces (§6.4).

use std::path::Path;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::warn;

use gan_core::GanError;

pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STDIN_WRITE_TIMEOUT_SECS: u64 = 10;
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(200);
const READ_BUF_SIZE: usize = 4096;

/// Result of running a subprocess to completion.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub idle_timed_out: bool,
}

/// Spawn `cmd` with stdin closed (the judge's `exec`/`context` commands are
/// never written to; the prompt travels as an argument), stdout/stderr piped,
/// in its own process group so a timeout kills every descendant atomically.
pub async fn spawn(mut cmd: Command) -> Result<tokio::process::Child, GanError> {
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.stdin(std::process::Stdio::null());
    cmd.kill_on_drop(true);

    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    let program = cmd.as_std().get_program().to_string_lossy().to_string();
    cmd.spawn().map_err(|e| GanError::JudgeUnavailable {
        command: program,
        reason: e.to_string(),
    })
}

/// Wait for `child`, enforcing an idle timeout measured from the last byte of
/// stdout/stderr activity rather than total wall-clock time, so a judge that
/// streams slowly but steadily is never killed early.
///
/// When `output_spool` is set, stdout bytes are additionally appended there
/// as they arrive so partial output survives an ungraceful kill.
pub async fn wait_with_idle_timeout(
    mut child: tokio::process::Child,
    idle_timeout: Duration,
    output_spool: Option<&Path>,
) -> Result<ExecutionResult, GanError> {
    let stdout = child.stdout.take().expect("stdout must be piped");
    let stderr = child.stderr.take().expect("stderr must be piped");

    let mut spool_file = output_spool.and_then(|path| {
        use std::fs::OpenOptions;
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => Some(f),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to open judge output spool");
                None
            }
        }
    });

    let mut stdout_reader = BufReader::new(stdout);
    let mut stderr_reader = BufReader::new(stderr);
    let mut stdout_buf = [0u8; READ_BUF_SIZE];
    let mut stderr_buf = [0u8; READ_BUF_SIZE];
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut stdout_done = false;
    let mut stderr_done = false;
    let mut last_activity = Instant::now();
    let mut idle_timed_out = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            result = stdout_reader.read(&mut stdout_buf), if !stdout_done => {
                match result {
                    Ok(0) => stdout_done = true,
                    Ok(n) => {
                        last_activity = Instant::now();
                        spool_chunk(&mut spool_file, &stdout_buf[..n]);
                        stdout.push_str(&String::from_utf8_lossy(&stdout_buf[..n]));
                    }
                    Err(_) => stdout_done = true,
                }
            }
            result = stderr_reader.read(&mut stderr_buf), if !stderr_done => {
                match result {
                    Ok(0) => stderr_done = true,
                    Ok(n) => {
                        last_activity = Instant::now();
                        stderr.push_str(&String::from_utf8_lossy(&stderr_buf[..n]));
                    }
                    Err(_) => stderr_done = true,
                }
            }
            _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => {
                if last_activity.elapsed() >= idle_timeout {
                    idle_timed_out = true;
                    warn!(timeout_secs = idle_timeout.as_secs(), "killing judge due to idle timeout");
                    kill_process_group(&mut child);
                    break;
                }
            }
        }
    }

    let status = child.wait().await.map_err(|e| GanError::Io(e.to_string()))?;
    let exit_code = if idle_timed_out {
        137
    } else {
        status.code().unwrap_or(1)
    };

    Ok(ExecutionResult {
        stdout,
        stderr,
        exit_code,
        idle_timed_out,
    })
}

fn spool_chunk(spool: &mut Option<std::fs::File>, bytes: &[u8]) {
    if let Some(f) = spool {
        use std::io::Write;
        let _ = f.write_all(bytes);
        let _ = f.flush();
    }
}

fn kill_process_group(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: kill() is async-signal-safe; a negative pid targets the group.
            unsafe {
                libc::kill(-(pid as i32), libc::SIGKILL);
            }
            return;
        }
    }
    let _ = child.start_kill();
}

/// Run `cmd` to completion under `timeout`, classifying the outcome. Used for
/// the context `maintain`/`terminate`/`status` subcommands, where only the
/// exit code matters.
pub async fn run_to_completion(
    cmd: Command,
    timeout: Duration,
) -> Result<ExecutionResult, GanError> {
    let child = spawn(cmd).await?;
    match tokio::time::timeout(timeout, wait_with_idle_timeout(child, timeout, None)).await {
        Ok(result) => result,
        Err(_) => Err(GanError::JudgeTimeout {
            millis: timeout.as_millis() as u64,
        }),
    }
}
