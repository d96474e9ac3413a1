//! Managed external encoder processes.
//!
//! Every ffmpeg invocation goes through [`run_managed`]: spawn with
//! piped stderr, drain stderr concurrently so the child never blocks on
//! a full pipe, wait under a wall-clock deadline, and kill the child on
//! every path that abandons it.

use std::path::Path;
use std::process::Stdio;

use reelcut_common::error::{ReelcutError, ReelcutResult};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Typed result of a finished external process.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,

    /// Captured stderr text.
    pub stderr: String,
}

impl ProcessOutcome {
    /// Whether the process exited zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Resolve the ffmpeg binary, honouring the `REELCUT_FFMPEG` override.
pub fn ffmpeg_program() -> String {
    std::env::var("REELCUT_FFMPEG").unwrap_or_else(|_| "ffmpeg".to_string())
}

/// Resolve the ffprobe binary, honouring the `REELCUT_FFPROBE` override.
pub fn ffprobe_program() -> String {
    std::env::var("REELCUT_FFPROBE").unwrap_or_else(|_| "ffprobe".to_string())
}

/// Run a command to completion under a wall-clock deadline.
///
/// The child is killed (not abandoned) when the deadline passes.
pub async fn run_managed(
    mut command: Command,
    label: &str,
    timeout_ms: u64,
) -> ReelcutResult<ProcessOutcome> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| ReelcutError::encode(format!("Failed to start {label}: {e}"), None, ""))?;

    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| ReelcutError::encode(format!("Failed to capture {label} stderr"), None, ""))?;
    let stderr_task = tokio::spawn(async move {
        let mut output = String::new();
        match stderr_pipe.read_to_string(&mut output).await {
            Ok(_) => output,
            Err(err) => format!("<failed to read stderr: {err}>"),
        }
    });

    let status = match tokio::time::timeout(
        std::time::Duration::from_millis(timeout_ms),
        child.wait(),
    )
    .await
    {
        Ok(waited) => waited
            .map_err(|e| ReelcutError::encode(format!("Failed to wait on {label}: {e}"), None, ""))?,
        Err(_) => {
            tracing::warn!(label, timeout_ms, "Process deadline exceeded, killing");
            child.start_kill().ok();
            child.wait().await.ok();
            return Err(ReelcutError::timeout(
                format!("{label} did not exit"),
                timeout_ms,
            ));
        }
    };

    let stderr = stderr_task
        .await
        .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

    Ok(ProcessOutcome {
        exit_code: status.code(),
        stderr,
    })
}

/// Check whether a binary is reachable on PATH.
pub fn command_exists(binary: &str) -> bool {
    std::process::Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Probe a video file's duration in milliseconds.
pub async fn probe_duration_ms(path: &Path) -> Option<f64> {
    let output = Command::new(ffprobe_program())
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8(output.stdout).ok()?;
    let secs = raw.lines().next()?.trim().parse::<f64>().ok()?;
    Some(secs * 1000.0)
}

/// Fail if an encoder output file is missing or zero bytes.
///
/// An empty file after a clean exit is a hard failure; there is no
/// partial-success path.
pub fn ensure_non_empty_output(path: &Path, label: &str) -> ReelcutResult<()> {
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(ReelcutError::encode(
            format!("{label} produced an empty output file: {}", path.display()),
            Some(0),
            "",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_managed_captures_exit_and_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo oops >&2; exit 3"]);
        let outcome = run_managed(cmd, "stub", 5_000).await.unwrap();
        assert_eq!(outcome.exit_code, Some(3));
        assert!(!outcome.success());
        assert_eq!(outcome.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_run_managed_kills_on_timeout() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 30"]);
        let err = run_managed(cmd, "stub", 200).await.unwrap_err();
        assert!(matches!(err, ReelcutError::Timeout { waited_ms: 200, .. }));
    }

    #[tokio::test]
    async fn test_ensure_non_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.mp4");
        std::fs::write(&empty, b"").unwrap();
        assert!(ensure_non_empty_output(&empty, "encoder").is_err());

        let missing = dir.path().join("missing.mp4");
        assert!(ensure_non_empty_output(&missing, "encoder").is_err());

        let full = dir.path().join("full.mp4");
        std::fs::write(&full, b"data").unwrap();
        assert!(ensure_non_empty_output(&full, "encoder").is_ok());
    }
}
