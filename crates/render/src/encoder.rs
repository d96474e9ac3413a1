//! Streaming frame encoder.
//!
//! Captured frames arrive one by one and are piped to an ffmpeg process
//! reading an image stream on stdin. The encoder owns the subprocess
//! for its whole lifetime: spawn, stream, pad, close stdin, wait under
//! a deadline, verify the output.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use reelcut_common::error::{ReelcutError, ReelcutResult};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};

use crate::process::{ensure_non_empty_output, ffmpeg_program};

/// Cadence used when padding the tail of the video with duplicates of
/// the last captured frame. Fixed independently of the capture rate.
pub const PAD_FPS: u32 = 15;

/// How many duplicate frames are needed to stretch a capture out to the
/// target duration, at the fixed [`PAD_FPS`] cadence.
pub fn pad_frames_needed(captured_ms: f64, target_ms: f64) -> u64 {
    let deficit_ms = target_ms - captured_ms;
    if deficit_ms <= 0.0 {
        return 0;
    }
    (deficit_ms / (1000.0 / PAD_FPS as f64)).ceil() as u64
}

/// Summary of a finished encode.
#[derive(Debug, Clone)]
pub struct EncodeSummary {
    pub output_path: PathBuf,

    /// Frames captured from the page.
    pub captured_frames: u64,

    /// Duplicate frames appended to reach the target duration.
    pub padded_frames: u64,
}

/// An encoder subprocess consuming an ordered frame stream on stdin.
pub struct FrameEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: tokio::task::JoinHandle<String>,
    output_path: PathBuf,
    fps: u32,
    captured_frames: u64,
    padded_frames: u64,
    last_frame: Option<Vec<u8>>,
}

fn encoder_args(fps: u32, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "image2pipe".to_string(),
        "-framerate".to_string(),
        fps.to_string(),
        "-i".to_string(),
        "-".to_string(),
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

impl FrameEncoder {
    /// Spawn an encoder writing to `output_path`.
    pub fn spawn(fps: u32, output_path: &Path) -> ReelcutResult<Self> {
        let mut command = Command::new(ffmpeg_program());
        command.args(encoder_args(fps, output_path));
        tracing::debug!(fps, output = %output_path.display(), "Spawning frame encoder");
        Self::from_command(command, fps, output_path.to_path_buf())
    }

    fn from_command(mut command: Command, fps: u32, output_path: PathBuf) -> ReelcutResult<Self> {
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| ReelcutError::encode(format!("Failed to start encoder: {e}"), None, ""))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelcutError::encode("Failed to open encoder stdin", None, ""))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| ReelcutError::encode("Failed to capture encoder stderr", None, ""))?;
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr_pipe.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read encoder stderr: {err}>"),
            }
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_task,
            output_path,
            fps,
            captured_frames: 0,
            padded_frames: 0,
            last_frame: None,
        })
    }

    /// Frames captured so far (excluding padding).
    pub fn captured_frames(&self) -> u64 {
        self.captured_frames
    }

    /// Position on the video time axis after the frames written so far.
    pub fn video_time_ms(&self) -> f64 {
        self.captured_frames as f64 * 1000.0 / self.fps as f64
    }

    /// Write one captured frame, returning the video time after it.
    ///
    /// Frames must be written in capture order; the encoder consumes
    /// them as a strictly ordered stream.
    pub async fn write_frame(&mut self, bytes: &[u8]) -> ReelcutResult<f64> {
        self.write_bytes(bytes).await?;
        self.captured_frames += 1;
        self.last_frame = Some(bytes.to_vec());
        Ok(self.video_time_ms())
    }

    /// Pad the stream by duplicating the last captured frame until the
    /// encoded duration reaches `target_ms`.
    pub async fn pad_to(&mut self, target_ms: f64) -> ReelcutResult<u64> {
        let needed = pad_frames_needed(self.video_time_ms(), target_ms);
        if needed == 0 {
            return Ok(0);
        }
        let last = self
            .last_frame
            .clone()
            .ok_or_else(|| ReelcutError::encode("Cannot pad a capture with no frames", None, ""))?;

        tracing::debug!(
            frames = needed,
            captured_ms = self.video_time_ms(),
            target_ms,
            "Padding encode with duplicates of the last frame"
        );
        for _ in 0..needed {
            self.write_bytes(&last).await?;
        }
        self.padded_frames += needed;
        Ok(needed)
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> ReelcutResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ReelcutError::encode("Encoder stdin already closed", None, ""))?;
        stdin
            .write_all(bytes)
            .await
            .map_err(|e| ReelcutError::encode(format!("Failed writing frame to encoder: {e}"), None, ""))
    }

    /// Close stdin, await exit under a deadline, and verify the output.
    ///
    /// The subprocess is killed if it does not exit within
    /// `exit_timeout_ms` of stdin closing. A non-zero exit or an empty
    /// output file fails the encode.
    pub async fn finish(mut self, exit_timeout_ms: u64) -> ReelcutResult<EncodeSummary> {
        drop(self.stdin.take());

        let status = match tokio::time::timeout(
            std::time::Duration::from_millis(exit_timeout_ms),
            self.child.wait(),
        )
        .await
        {
            Ok(waited) => waited
                .map_err(|e| ReelcutError::encode(format!("Failed to wait on encoder: {e}"), None, ""))?,
            Err(_) => {
                tracing::warn!(exit_timeout_ms, "Encoder did not exit after stdin close, killing");
                self.child.start_kill().ok();
                self.child.wait().await.ok();
                return Err(ReelcutError::timeout(
                    "encoder did not exit after stdin close",
                    exit_timeout_ms,
                ));
            }
        };

        let stderr = self
            .stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join encoder stderr reader>".to_string());

        if !status.success() {
            return Err(ReelcutError::encode(
                "Encoder exited with failure",
                status.code(),
                stderr.trim().to_string(),
            ));
        }

        ensure_non_empty_output(&self.output_path, "encoder")?;

        tracing::info!(
            output = %self.output_path.display(),
            captured_frames = self.captured_frames,
            padded_frames = self.padded_frames,
            "Encode finished"
        );

        Ok(EncodeSummary {
            output_path: self.output_path,
            captured_frames: self.captured_frames,
            padded_frames: self.padded_frames,
        })
    }
}
