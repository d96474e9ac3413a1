//! Reelcut Pipeline
//!
//! Orchestrates one upload end-to-end: validate the event log, render
//! the full video, slice per-interaction clips with thumbnails and
//! element screenshots concurrently, fold the metadata streams onto the
//! clip windows, and deliver the result to the caller's webhook.
//!
//! The callback contract is all-or-nothing: either every interaction
//! resolves to a complete [`ClipResult`] or the callback carries an
//! error and no clips.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use reelcut_capture::{
    write_manifest, CaptureRequest, ElementScreenshot, ElementScreenshotExtractor,
    FrameCaptureController, PageFactory, PagePool,
};
use reelcut_common::config::AppConfig;
use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_render::slicer::ClipSlicer;
use reelcut_render::thumbnail::extract_thumbnail;
use reelcut_session_model::{
    pair_markers, serialize_events, validate_events, CallbackPayload, ClipResult, ClipWindow,
    MarkerPhase, SessionUpload,
};
use reelcut_timeline::{correlate_fps, correlate_markers, ClipFps, ClipMarkers};
use uuid::Uuid;

pub mod webhook;

pub use webhook::CallbackSender;

/// The upload processing pipeline.
///
/// Holds the page pools and subprocess components; constructed once at
/// host startup with an injected [`PageFactory`] and shut down
/// explicitly via [`Pipeline::shutdown`].
pub struct Pipeline {
    config: AppConfig,
    render_pool: Arc<PagePool>,
    screenshot_pool: Arc<PagePool>,
    controller: FrameCaptureController,
    slicer: ClipSlicer,
    extractor: Arc<ElementScreenshotExtractor>,
    callbacks: CallbackSender,
}

impl Pipeline {
    pub fn new(config: AppConfig, factory: Arc<dyn PageFactory>) -> Self {
        let render_pool = Arc::new(PagePool::new(factory.clone(), config.render_pool_size()));
        let screenshot_pool = Arc::new(PagePool::new(
            factory,
            config.capture.screenshot_pool_size,
        ));
        let controller =
            FrameCaptureController::new(render_pool.clone(), config.timeouts.encoder_exit_ms);
        let slicer = ClipSlicer::new(config.timeouts.clip_trim_ms);
        let extractor = Arc::new(ElementScreenshotExtractor::new(
            screenshot_pool.clone(),
            config.timeouts.bounding_rect_ms,
        ));
        let callbacks = CallbackSender::new(config.delivery.request_timeout_ms);

        Self {
            config,
            render_pool,
            screenshot_pool,
            controller,
            slicer,
            extractor,
            callbacks,
        }
    }

    /// Close both page pools; in-flight work fails, new work is rejected.
    pub fn shutdown(&self) {
        self.render_pool.close();
        self.screenshot_pool.close();
    }

    /// Process one upload and return the assembled clip results.
    pub async fn process(
        &self,
        upload: &SessionUpload,
        job_dir: &Path,
    ) -> ReelcutResult<Vec<ClipResult>> {
        validate_events(&upload.events).map_err(|e| ReelcutError::validation(e.to_string()))?;
        std::fs::create_dir_all(job_dir)?;

        // Keep the raw log next to the artifacts it produced.
        std::fs::write(
            job_dir.join("events.jsonl"),
            serialize_events(&upload.events)?,
        )?;

        let video_path = job_dir.join("full.mp4");
        let manifest = self
            .controller
            .render_session(&CaptureRequest {
                events: upload.events.clone(),
                fps: self.config.capture.fps,
                target_duration_ms: upload.target_duration_ms(),
                output_path: video_path.clone(),
            })
            .await?;
        write_manifest(&manifest, job_dir)?;

        let pairs =
            pair_markers(&manifest.markers).map_err(|e| ReelcutError::validation(e.to_string()))?;
        let pair_by_id: HashMap<Uuid, _> = pairs
            .into_iter()
            .map(|pair| (pair.interaction_id(), pair))
            .collect();

        let mut windows = Vec::with_capacity(upload.interactions.len());
        for interaction in &upload.interactions {
            let pair = pair_by_id.get(&interaction.interaction_id).ok_or_else(|| {
                ReelcutError::validation(format!(
                    "no replay markers for interaction {}",
                    interaction.interaction_id
                ))
            })?;
            windows.push(ClipWindow::around(pair, manifest.video_duration_ms));
        }

        let artifacts = self
            .produce_artifacts(upload, &windows, &video_path, job_dir)
            .await?;

        let marker_records = correlate_markers(&windows, &manifest.markers);
        let fps_records = correlate_fps(&windows, &manifest.fps_samples);

        self.assemble(upload, &windows, artifacts, marker_records, fps_records)
    }

    /// Process one upload and always deliver the webhook: results on
    /// success, an error-shaped payload on failure. Returns the
    /// delivered payload.
    pub async fn process_and_notify(
        &self,
        upload: &SessionUpload,
        job_dir: &Path,
        callback_url: &str,
    ) -> CallbackPayload {
        let payload = match self.process(upload, job_dir).await {
            Ok(clips) => CallbackPayload::success(
                clips,
                upload.interactions.clone(),
                chrono::Utc::now().to_rfc3339(),
            ),
            Err(e) => {
                tracing::error!(error = %e, "Upload processing failed");
                CallbackPayload::failure(
                    e.to_string(),
                    upload.interactions.clone(),
                    chrono::Utc::now().to_rfc3339(),
                )
            }
        };

        if let Err(e) = self.callbacks.deliver(callback_url, &payload).await {
            tracing::error!(error = %e, callback_url, "Callback delivery failed");
        }
        payload
    }

    /// Slice, thumbnail, and element-screenshot every interaction
    /// concurrently. Slots in the page pools are the only bound.
    async fn produce_artifacts(
        &self,
        upload: &SessionUpload,
        windows: &[ClipWindow],
        video_path: &Path,
        job_dir: &Path,
    ) -> ReelcutResult<HashMap<Uuid, ElementScreenshot>> {
        let events = Arc::new(upload.events.clone());
        let mut tasks = tokio::task::JoinSet::new();

        for (interaction, window) in upload.interactions.iter().zip(windows.iter()) {
            let interaction = interaction.clone();
            let window = *window;
            let slicer = self.slicer.clone();
            let extractor = self.extractor.clone();
            let events = events.clone();
            let source = video_path.to_path_buf();
            let thumbnail_timeout_ms = self.config.timeouts.clip_trim_ms;
            let id = interaction.interaction_id;
            let clip_path = job_dir.join(format!("clip-{id}.mp4"));
            let thumbnail_path = job_dir.join(format!("thumb-{id}.jpg"));
            let element_path = job_dir.join(format!("element-{id}.png"));

            tasks.spawn(async move {
                let (clip, thumbnail, element) = tokio::join!(
                    slicer.slice(&source, &window, &clip_path),
                    extract_thumbnail(&source, window.start_ms, &thumbnail_path, thumbnail_timeout_ms),
                    extractor.extract(&events, &interaction, &element_path),
                );
                clip?;
                thumbnail?;
                Ok::<_, ReelcutError>((id, element?))
            });
        }

        let mut artifacts = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (id, set) = joined
                .map_err(|e| ReelcutError::capture(format!("artifact task failed: {e}")))??;
            artifacts.insert(id, set);
        }
        Ok(artifacts)
    }

    fn assemble(
        &self,
        upload: &SessionUpload,
        windows: &[ClipWindow],
        mut artifacts: HashMap<Uuid, ElementScreenshot>,
        marker_records: Vec<ClipMarkers>,
        fps_records: Vec<ClipFps>,
    ) -> ReelcutResult<Vec<ClipResult>> {
        let base = self.config.delivery.public_base_url.trim_end_matches('/');
        let markers_by_id: HashMap<Uuid, ClipMarkers> = marker_records
            .into_iter()
            .map(|record| (record.window.interaction_id, record))
            .collect();
        let fps_by_id: HashMap<Uuid, ClipFps> = fps_records
            .into_iter()
            .map(|record| (record.window.interaction_id, record))
            .collect();

        let mut results = Vec::with_capacity(upload.interactions.len());
        for (interaction, window) in upload.interactions.iter().zip(windows.iter()) {
            let id = interaction.interaction_id;
            let element = artifacts
                .remove(&id)
                .ok_or_else(|| ReelcutError::capture(format!("artifacts missing for {id}")))?;
            let record = markers_by_id.get(&id).ok_or_else(|| {
                ReelcutError::validation(format!("no correlated markers for {id}"))
            })?;

            let boundary = |phase: MarkerPhase| {
                record
                    .markers
                    .iter()
                    .find(|m| m.marker.interaction_id == id && m.marker.phase == phase)
                    .cloned()
                    .ok_or_else(|| {
                        ReelcutError::validation(format!(
                            "{phase} marker for {id} fell outside its own clip window"
                        ))
                    })
            };
            let start_marker = boundary(MarkerPhase::Start)?;
            let end_marker = boundary(MarkerPhase::End)?;

            let (fps_updates, entry_fps) = fps_by_id
                .get(&id)
                .map(|record| (record.updates.clone(), record.entry_fps))
                .unwrap_or_default();

            results.push(ClipResult {
                interaction_id: id,
                clip_url: format!("{base}/clips/{id}.mp4"),
                thumbnail_url: format!("{base}/thumbnails/{id}.jpg"),
                element_screenshot_url: format!("{base}/elements/{id}.png"),
                clip_start_ms: window.start_ms,
                clip_end_ms: window.end_ms,
                start_marker,
                end_marker,
                render_stats: element.stats,
                fps_updates,
                entry_fps,
            });
        }

        tracing::info!(clips = results.len(), "Upload assembled");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_capture::scripted::{ScriptedBehavior, ScriptedFactory};
    use reelcut_capture::ReplaySignal;
    use reelcut_session_model::{
        BoundingRect, Interaction, RenderStats, ReplayMetadata, SessionEvent,
    };
    use std::path::PathBuf;

    /// Point every ffmpeg spawn in this test binary at a shell sink.
    fn install_encoder_stub() {
        use std::os::unix::fs::PermissionsExt;
        static STUB: std::sync::OnceLock<PathBuf> = std::sync::OnceLock::new();
        let path = STUB.get_or_init(|| {
            let path =
                std::env::temp_dir().join(format!("reelcut-ffmpeg-stub-{}", std::process::id()));
            std::fs::write(
                &path,
                "#!/bin/sh\nfor last; do :; done\ncat - > \"$last\" 2>/dev/null\n[ -s \"$last\" ] || printf stub > \"$last\"\n",
            )
            .unwrap();
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path
        });
        std::env::set_var("REELCUT_FFMPEG", path);
        // Stub output is not probeable; force the duration fallback.
        std::env::set_var("REELCUT_FFPROBE", "/nonexistent/ffprobe");
    }

    fn rect() -> BoundingRect {
        BoundingRect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 50.0,
        }
    }

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.capture.fps = 10;
        config.capture.render_pool_size = 1;
        config.capture.screenshot_pool_size = 1;
        config.delivery.public_base_url = "http://media.test/".to_string();
        config
    }

    /// Two interactions with full marker coverage, both in the event
    /// log (for the element pass) and in the replay signals (for the
    /// capture pass).
    fn two_interaction_fixture() -> (SessionUpload, ScriptedBehavior) {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let events = vec![
            SessionEvent::meta(0, 1280, 720),
            SessionEvent::full_snapshot(1, serde_json::json!({"node": 1})),
            SessionEvent::interaction_plugin(
                200,
                &ReplayMetadata::marker(a, MarkerPhase::Start, 200),
            ),
            SessionEvent::interaction_plugin(300, &ReplayMetadata::marker(a, MarkerPhase::End, 300)),
            SessionEvent::interaction_plugin(
                400,
                &ReplayMetadata::marker(b, MarkerPhase::Start, 400),
            ),
            SessionEvent::interaction_plugin(500, &ReplayMetadata::marker(b, MarkerPhase::End, 500)),
        ];

        let upload = SessionUpload {
            events,
            interactions: vec![
                Interaction {
                    interaction_id: a,
                    target_node_id: 11,
                    screenshot_delay_ms: 50,
                },
                Interaction {
                    interaction_id: b,
                    target_node_id: 22,
                    screenshot_delay_ms: 50,
                },
            ],
            start_at_ms: 0,
            end_at_ms: 1_000,
            fps_observations: vec![],
        };

        let behavior = ScriptedBehavior {
            signals: vec![
                ReplaySignal::Metadata(ReplayMetadata::FpsUpdate {
                    fps: 60.0,
                    wall_clock_ms: 50,
                }),
                ReplaySignal::ShouldScreenshot,
                ReplaySignal::Metadata(ReplayMetadata::marker(a, MarkerPhase::Start, 200)),
                ReplaySignal::ShouldScreenshot,
                ReplaySignal::Metadata(ReplayMetadata::marker(a, MarkerPhase::End, 300)),
                ReplaySignal::ShouldScreenshot,
                ReplaySignal::Metadata(ReplayMetadata::marker(b, MarkerPhase::Start, 400)),
                ReplaySignal::ShouldScreenshot,
                ReplaySignal::Metadata(ReplayMetadata::marker(b, MarkerPhase::End, 500)),
                ReplaySignal::ShouldScreenshot,
                // Element-pass reports; ignored by the capture pass.
                ReplaySignal::RenderStats(RenderStats {
                    visible: true,
                    viewport_coverage: Some(1.0),
                    node_count: Some(10),
                }),
                ReplaySignal::ElementRect(rect()),
            ],
            ..Default::default()
        };

        (upload, behavior)
    }

    fn pipeline_with(behavior: ScriptedBehavior) -> Pipeline {
        Pipeline::new(test_config(), Arc::new(ScriptedFactory::new(behavior)))
    }

    #[tokio::test]
    async fn test_two_interactions_resolve_to_two_complete_clips() {
        install_encoder_stub();
        let (upload, behavior) = two_interaction_fixture();
        let pipeline = pipeline_with(behavior);
        let dir = tempfile::tempdir().unwrap();

        let clips = pipeline.process(&upload, dir.path()).await.unwrap();
        assert_eq!(clips.len(), 2);

        for (clip, interaction) in clips.iter().zip(&upload.interactions) {
            assert_eq!(clip.interaction_id, interaction.interaction_id);
            assert!(clip.clip_url.starts_with("http://media.test/clips/"));
            assert!(clip.thumbnail_url.contains("/thumbnails/"));
            assert!(clip.element_screenshot_url.contains("/elements/"));
            assert!(
                clip.start_marker.marker.video_time_ms < clip.end_marker.marker.video_time_ms
            );
            assert!(clip.start_marker.clip_relative_ms >= 0.0);
            assert!(clip.render_stats.as_ref().unwrap().visible);
            // The 60fps sample at 100ms falls inside both padded windows.
            assert_eq!(clip.fps_updates.len(), 1);
            assert_eq!(clip.fps_updates[0].fps, 60.0);
            assert_eq!(clip.entry_fps, None);
        }

        // URLs are distinct per interaction.
        assert_ne!(clips[0].clip_url, clips[1].clip_url);

        // Artifacts landed on disk next to the full video.
        assert!(dir.path().join("full.mp4").exists());
        assert!(dir.path().join("manifest.json").exists());
        assert!(dir.path().join("events.jsonl").exists());
        for clip in &clips {
            assert!(dir
                .path()
                .join(format!("clip-{}.mp4", clip.interaction_id))
                .exists());
            assert!(dir
                .path()
                .join(format!("thumb-{}.jpg", clip.interaction_id))
                .exists());
            assert!(dir
                .path()
                .join(format!("element-{}.png", clip.interaction_id))
                .exists());
        }
    }

    #[tokio::test]
    async fn test_missing_end_marker_fails_whole_upload() {
        install_encoder_stub();
        let (upload, mut behavior) = two_interaction_fixture();
        // Drop interaction B's end marker from the replay stream.
        behavior.signals.retain(|signal| {
            !matches!(
                signal,
                ReplaySignal::Metadata(ReplayMetadata::InteractionEnd { interaction_id, .. })
                    if *interaction_id == upload.interactions[1].interaction_id
            )
        });
        let pipeline = pipeline_with(behavior);
        let dir = tempfile::tempdir().unwrap();

        let err = pipeline.process(&upload, dir.path()).await.unwrap_err();
        assert!(matches!(err, ReelcutError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_failed_upload_delivers_error_shaped_payload() {
        install_encoder_stub();
        let (upload, mut behavior) = two_interaction_fixture();
        behavior.signals.retain(|signal| {
            !matches!(signal, ReplaySignal::Metadata(ReplayMetadata::InteractionEnd { .. }))
        });
        let pipeline = pipeline_with(behavior);
        let dir = tempfile::tempdir().unwrap();

        // Unroutable callback: delivery failure is logged, not raised.
        let payload = pipeline
            .process_and_notify(&upload, dir.path(), "http://127.0.0.1:1/callback")
            .await;
        assert!(payload.clips.is_none());
        assert!(payload.error.is_some());
        assert_eq!(payload.interactions.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_without_viewport_event_is_rejected() {
        install_encoder_stub();
        let (mut upload, behavior) = two_interaction_fixture();
        upload.events.remove(0);
        let pipeline = pipeline_with(behavior);
        let dir = tempfile::tempdir().unwrap();

        let err = pipeline.process(&upload, dir.path()).await.unwrap_err();
        assert!(matches!(err, ReelcutError::Validation { .. }));
    }
}
