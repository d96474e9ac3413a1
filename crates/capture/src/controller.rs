//! Frame capture controller.
//!
//! Replays one session end-to-end on a pooled page, captures exactly
//! one encoded frame per `ShouldScreenshot` signal, and streams the
//! frames in signal order to the encoder subprocess. Metadata raised
//! between frames is buffered and stamped with the video time of the
//! next frame boundary, so every timestamp refers to a frame that was
//! actually captured.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_render::encoder::FrameEncoder;
use reelcut_render::process::probe_duration_ms;
use reelcut_session_model::{
    session_viewport, CaptureManifest, FpsSample, InteractionMarker, MarkerPhase, ReplayMetadata,
    SessionEvent, SessionViewport,
};

use crate::page::{ReplayOptions, ReplayPage, ReplaySignal};
use crate::pool::PagePool;

/// One full-video render request.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Full recorded event log. The first event must carry the viewport.
    pub events: Vec<SessionEvent>,

    /// Target capture frame rate.
    pub fps: u32,

    /// Duration the encoded video must reach; the tail is padded with
    /// duplicates of the last frame if the capture falls short.
    pub target_duration_ms: f64,

    /// Where to write the encoded video.
    pub output_path: PathBuf,
}

/// Renders sessions to full videos using pooled pages.
pub struct FrameCaptureController {
    pool: Arc<PagePool>,
    encoder_exit_timeout_ms: u64,
}

impl FrameCaptureController {
    pub fn new(pool: Arc<PagePool>, encoder_exit_timeout_ms: u64) -> Self {
        Self {
            pool,
            encoder_exit_timeout_ms,
        }
    }

    /// Replay the session and encode one full video.
    pub async fn render_session(&self, request: &CaptureRequest) -> ReelcutResult<CaptureManifest> {
        let viewport = session_viewport(&request.events)
            .map_err(|e| ReelcutError::validation(e.to_string()))?;

        if request.fps == 0 {
            return Err(ReelcutError::validation("capture fps must be positive"));
        }

        tracing::info!(
            events = request.events.len(),
            fps = request.fps,
            target_duration_ms = request.target_duration_ms,
            output = %request.output_path.display(),
            "Rendering session to video"
        );

        let lease = self.pool.acquire().await?;
        let result = self
            .drive(lease.page(), viewport, request)
            .await;
        lease.release().await;

        if let Ok(manifest) = &result {
            tracing::info!(
                captured_frames = manifest.captured_frames,
                padded_frames = manifest.padded_frames,
                markers = manifest.markers.len(),
                fps_samples = manifest.fps_samples.len(),
                "Session rendered"
            );
        }
        result
    }

    async fn drive(
        &self,
        page: &dyn ReplayPage,
        viewport: SessionViewport,
        request: &CaptureRequest,
    ) -> ReelcutResult<CaptureManifest> {
        page.set_viewport(viewport).await?;

        let mut encoder = FrameEncoder::spawn(request.fps, &request.output_path)?;
        let mut rx = page.replay(&request.events, ReplayOptions::full()).await?;

        let mut pending: Vec<ReplayMetadata> = Vec::new();
        let mut markers: Vec<InteractionMarker> = Vec::new();
        let mut fps_samples: Vec<FpsSample> = Vec::new();

        // Single consumer loop: capture and stdin write happen in the
        // same continuation per signal, which is the ordering guarantee.
        while let Some(signal) = rx.recv().await {
            match signal {
                ReplaySignal::ShouldScreenshot => {
                    let bytes = page.screenshot().await?;
                    let video_time_ms = encoder.write_frame(&bytes).await?;
                    stamp_pending(&mut pending, video_time_ms, &mut markers, &mut fps_samples);
                }
                ReplaySignal::Metadata(metadata) => {
                    pending.push(metadata);
                }
                ReplaySignal::ElementRect(_) | ReplaySignal::RenderStats(_) => {
                    tracing::debug!("Ignoring element-pass signal during full-video replay");
                }
                ReplaySignal::Finished => break,
            }
        }

        if !pending.is_empty() {
            // Metadata after the last frame still needs a stamp; the
            // final frame boundary is the closest one that exists.
            tracing::warn!(
                count = pending.len(),
                "Metadata raised after the last captured frame, stamping with final video time"
            );
            let final_time = encoder.video_time_ms();
            stamp_pending(&mut pending, final_time, &mut markers, &mut fps_samples);
        }

        let captured_ms = encoder.video_time_ms();
        encoder.pad_to(request.target_duration_ms).await?;
        let summary = encoder.finish(self.encoder_exit_timeout_ms).await?;

        // The encoded file is the authority on duration; fall back to
        // the computed value when probing is unavailable.
        let video_duration_ms = probe_duration_ms(&request.output_path)
            .await
            .unwrap_or_else(|| request.target_duration_ms.max(captured_ms));

        Ok(CaptureManifest {
            video_path: request.output_path.clone(),
            fps: request.fps,
            captured_frames: summary.captured_frames,
            padded_frames: summary.padded_frames,
            video_duration_ms,
            markers,
            fps_samples,
        })
    }
}

/// Stamp buffered metadata with the current frame-boundary time and
/// file it into the marker or FPS stream.
fn stamp_pending(
    pending: &mut Vec<ReplayMetadata>,
    video_time_ms: f64,
    markers: &mut Vec<InteractionMarker>,
    fps_samples: &mut Vec<FpsSample>,
) {
    for metadata in pending.drain(..) {
        match metadata {
            ReplayMetadata::InteractionStart {
                interaction_id,
                wall_clock_ms,
            } => markers.push(InteractionMarker {
                interaction_id,
                phase: MarkerPhase::Start,
                wall_clock_ms,
                video_time_ms,
            }),
            ReplayMetadata::InteractionEnd {
                interaction_id,
                wall_clock_ms,
            } => markers.push(InteractionMarker {
                interaction_id,
                phase: MarkerPhase::End,
                wall_clock_ms,
                video_time_ms,
            }),
            ReplayMetadata::FpsUpdate { fps, wall_clock_ms } => {
                fps_samples.push(FpsSample {
                    fps,
                    wall_clock_ms,
                    video_time_ms,
                });
            }
        }
    }
}

/// Write a capture manifest next to the video it describes.
pub fn write_manifest(manifest: &CaptureManifest, dir: &Path) -> ReelcutResult<PathBuf> {
    let path = dir.join("manifest.json");
    std::fs::write(&path, manifest.to_json_string()?)?;
    Ok(path)
}
