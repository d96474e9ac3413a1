//! Per-interaction clip extraction from the rendered full video.

use std::path::{Path, PathBuf};

use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_session_model::ClipWindow;
use tokio::process::Command;

use crate::process::{ensure_non_empty_output, ffmpeg_program, run_managed};

/// Trims time-bounded sub-clips out of a source video.
///
/// Each trim is one ffmpeg invocation; all invocations for an upload
/// run concurrently, bounded only by the surrounding execution pool.
#[derive(Debug, Clone)]
pub struct ClipSlicer {
    /// Wall-clock deadline for a single trim.
    timeout_ms: u64,
}

fn trim_args(source: &Path, window: &ClipWindow, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-ss".to_string(),
        format!("{:.3}", window.start_ms / 1000.0),
        "-to".to_string(),
        format!("{:.3}", window.end_ms / 1000.0),
        "-i".to_string(),
        source.display().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output.display().to_string(),
    ]
}

impl ClipSlicer {
    pub fn new(timeout_ms: u64) -> Self {
        Self { timeout_ms }
    }

    /// Trim `window` out of `source`, re-encoding into `output`.
    pub async fn slice(
        &self,
        source: &Path,
        window: &ClipWindow,
        output: &Path,
    ) -> ReelcutResult<PathBuf> {
        tracing::debug!(
            interaction_id = %window.interaction_id,
            start_ms = window.start_ms,
            end_ms = window.end_ms,
            output = %output.display(),
            "Slicing clip"
        );

        let mut command = Command::new(ffmpeg_program());
        command.args(trim_args(source, window, output));

        let outcome = run_managed(command, "clip trim", self.timeout_ms).await?;
        if !outcome.success() {
            return Err(ReelcutError::encode(
                format!(
                    "Clip trim failed for interaction {}",
                    window.interaction_id
                ),
                outcome.exit_code,
                outcome.stderr.trim().to_string(),
            ));
        }
        ensure_non_empty_output(output, "clip trim")?;
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_common::error::ReelcutError;
    use uuid::Uuid;

    fn window(start_ms: f64, end_ms: f64) -> ClipWindow {
        ClipWindow {
            interaction_id: Uuid::new_v4(),
            start_ms,
            end_ms,
        }
    }

    #[test]
    fn test_trim_args_use_seconds() {
        let args = trim_args(
            Path::new("/tmp/full.mp4"),
            &window(2_500.0, 10_000.0),
            Path::new("/tmp/clip.mp4"),
        );
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "2.500");
        let to = args.iter().position(|a| a == "-to").unwrap();
        assert_eq!(args[to + 1], "10.000");
        assert_eq!(args.last().unwrap(), "/tmp/clip.mp4");
    }

    /// Helper: point the slicer at a stub "ffmpeg" shell script.
    fn install_stub(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("ffmpeg-stub");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    // One test body: REELCUT_FFMPEG is process-global, so the stub
    // scenarios run sequentially.
    #[tokio::test]
    async fn test_slice_against_stub_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let slicer = ClipSlicer::new(5_000);

        let stub = install_stub(
            dir.path(),
            "for last; do :; done\nprintf clipdata > \"$last\"",
        );
        std::env::set_var("REELCUT_FFMPEG", &stub);
        let out = dir.path().join("clip.mp4");
        let produced = slicer
            .slice(Path::new("/tmp/full.mp4"), &window(0.0, 1_000.0), &out)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&produced).unwrap(), b"clipdata");

        // Empty output after a clean exit is a hard failure.
        let empty_stub = install_stub(dir.path(), "for last; do :; done\n: > \"$last\"");
        std::env::set_var("REELCUT_FFMPEG", &empty_stub);
        let out2 = dir.path().join("clip2.mp4");
        let err = slicer
            .slice(Path::new("/tmp/full.mp4"), &window(0.0, 1_000.0), &out2)
            .await
            .unwrap_err();
        assert!(matches!(err, ReelcutError::Encode { .. }));

        std::env::remove_var("REELCUT_FFMPEG");
    }
}
