//! Element screenshot extraction.
//!
//! Replays a session a second time in an isolated page, targeting a
//! single interaction: play up to the interaction start (plus the
//! interaction's own settle delay), wait for the page to report the
//! target node's bounding rect, and capture a cropped screenshot plus
//! render statistics.
//!
//! Two failure modes stay distinct: a bounding rect that never arrives
//! is fatal, while a failed crop capture falls back to exactly one
//! full-page attempt.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_session_model::{
    find_interaction_markers, session_viewport, BoundingRect, Interaction, RenderStats,
    SessionEvent, SessionViewport,
};

use crate::page::{ReplayOptions, ReplayPage, ReplaySignal};
use crate::pool::PagePool;

/// Result of one element screenshot pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementScreenshot {
    /// Where the image was written.
    pub path: PathBuf,

    /// False when the cropped capture failed and the full-page
    /// fallback was used instead.
    pub cropped: bool,

    /// Render statistics reported by the page, if any arrived.
    pub stats: Option<RenderStats>,
}

/// Extracts per-interaction element screenshots on pooled pages.
pub struct ElementScreenshotExtractor {
    pool: Arc<PagePool>,
    rect_timeout_ms: u64,
}

impl ElementScreenshotExtractor {
    pub fn new(pool: Arc<PagePool>, rect_timeout_ms: u64) -> Self {
        Self {
            pool,
            rect_timeout_ms,
        }
    }

    /// Capture the element screenshot for one interaction.
    pub async fn extract(
        &self,
        events: &[SessionEvent],
        interaction: &Interaction,
        output_path: &Path,
    ) -> ReelcutResult<ElementScreenshot> {
        let viewport =
            session_viewport(events).map_err(|e| ReelcutError::validation(e.to_string()))?;

        // Markers come from the original event log here, not the video.
        let (start, _end) = find_interaction_markers(events, interaction.interaction_id)
            .map_err(|e| ReelcutError::validation(e.to_string()))?;

        let first_ts = events.first().expect("viewport check implies events").timestamp;
        let replay_offset_ms = start.wall_clock_ms() - first_ts;
        let stop_at_ms = replay_offset_ms + interaction.screenshot_delay_ms;

        tracing::debug!(
            interaction_id = %interaction.interaction_id,
            target_node_id = interaction.target_node_id,
            stop_at_ms,
            "Extracting element screenshot"
        );

        let lease = self.pool.acquire().await?;
        let result = self
            .capture_on_page(lease.page(), viewport, events, interaction, stop_at_ms, output_path)
            .await;
        lease.release().await;
        result
    }

    async fn capture_on_page(
        &self,
        page: &dyn ReplayPage,
        viewport: SessionViewport,
        events: &[SessionEvent],
        interaction: &Interaction,
        stop_at_ms: i64,
        output_path: &Path,
    ) -> ReelcutResult<ElementScreenshot> {
        page.set_viewport(viewport).await?;
        let mut rx = page
            .replay(
                events,
                ReplayOptions::element(stop_at_ms, interaction.target_node_id),
            )
            .await?;

        let (rect, stats) = self.await_element_report(&mut rx).await?;

        let (bytes, cropped) = match page.screenshot_region(rect).await {
            Ok(bytes) => (bytes, true),
            Err(e) => {
                // One degraded retry: uncropped beats nothing.
                tracing::warn!(
                    interaction_id = %interaction.interaction_id,
                    error = %e,
                    "Cropped capture failed, retrying once as full page"
                );
                (page.screenshot_full_page().await?, false)
            }
        };

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output_path, &bytes)?;

        if stats.is_none() {
            tracing::debug!(
                interaction_id = %interaction.interaction_id,
                "Page reported no render statistics"
            );
        }

        Ok(ElementScreenshot {
            path: output_path.to_path_buf(),
            cropped,
            stats,
        })
    }

    /// Wait for the bounding rect (mandatory) and render statistics
    /// (best effort) under one deadline.
    async fn await_element_report(
        &self,
        rx: &mut tokio::sync::mpsc::Receiver<ReplaySignal>,
    ) -> ReelcutResult<(BoundingRect, Option<RenderStats>)> {
        let deadline =
            tokio::time::Instant::now() + std::time::Duration::from_millis(self.rect_timeout_ms);
        let mut rect: Option<BoundingRect> = None;
        let mut stats: Option<RenderStats> = None;

        loop {
            if rect.is_some() && stats.is_some() {
                break;
            }
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(ReplaySignal::ElementRect(reported))) => rect = Some(reported),
                Ok(Some(ReplaySignal::RenderStats(reported))) => stats = Some(reported),
                Ok(Some(ReplaySignal::Finished)) | Ok(None) => break,
                Ok(Some(_)) => continue,
                Err(_) => break,
            }
        }

        let rect = rect.ok_or_else(|| {
            ReelcutError::timeout(
                "page never reported the element bounding rect",
                self.rect_timeout_ms,
            )
        })?;
        Ok((rect, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{ScriptedBehavior, ScriptedFactory};
    use reelcut_session_model::{MarkerPhase, ReplayMetadata};
    use std::sync::atomic::Ordering;
    use uuid::Uuid;

    fn rect() -> BoundingRect {
        BoundingRect {
            x: 10.0,
            y: 20.0,
            width: 120.0,
            height: 40.0,
        }
    }

    fn stats() -> RenderStats {
        RenderStats {
            visible: true,
            viewport_coverage: Some(0.8),
            node_count: Some(420),
        }
    }

    fn session(interaction_id: Uuid) -> (Vec<SessionEvent>, Interaction) {
        let events = vec![
            SessionEvent::meta(1_000, 1280, 720),
            SessionEvent::interaction_plugin(
                1_500,
                &ReplayMetadata::marker(interaction_id, MarkerPhase::Start, 1_500),
            ),
            SessionEvent::interaction_plugin(
                2_500,
                &ReplayMetadata::marker(interaction_id, MarkerPhase::End, 2_500),
            ),
        ];
        let interaction = Interaction {
            interaction_id,
            target_node_id: 77,
            screenshot_delay_ms: 250,
        };
        (events, interaction)
    }

    fn extractor_with(behavior: ScriptedBehavior) -> (ElementScreenshotExtractor, Arc<ScriptedFactory>) {
        let factory = Arc::new(ScriptedFactory::new(behavior));
        let pool = Arc::new(PagePool::new(factory.clone(), 1));
        (ElementScreenshotExtractor::new(pool, 500), factory)
    }

    #[tokio::test]
    async fn test_extract_cropped_screenshot_with_stats() {
        let id = Uuid::new_v4();
        let (events, interaction) = session(id);
        let (extractor, factory) = extractor_with(ScriptedBehavior {
            signals: vec![
                ReplaySignal::RenderStats(stats()),
                ReplaySignal::ElementRect(rect()),
            ],
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("element.png");

        let shot = extractor.extract(&events, &interaction, &out).await.unwrap();
        assert!(shot.cropped);
        assert_eq!(shot.stats, Some(stats()));
        assert_eq!(std::fs::read(&out).unwrap(), b"cropped");
        assert_eq!(factory.region_captures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_extract_stops_replay_at_interaction_offset() {
        let id = Uuid::new_v4();
        let (events, interaction) = session(id);
        let factory = Arc::new(ScriptedFactory::new(ScriptedBehavior {
            signals: vec![ReplaySignal::ElementRect(rect())],
            ..Default::default()
        }));
        let pool = Arc::new(PagePool::new(factory.clone(), 1));
        let extractor = ElementScreenshotExtractor::new(pool, 500);
        let dir = tempfile::tempdir().unwrap();

        extractor
            .extract(&events, &interaction, &dir.path().join("element.png"))
            .await
            .unwrap();

        let options = factory.last_replay_options.lock().unwrap().clone().unwrap();
        assert_eq!(options.stop_at_ms, Some(750));
        assert_eq!(options.target_node_id, Some(77));
    }

    #[tokio::test]
    async fn test_crop_failure_falls_back_to_full_page_once() {
        let id = Uuid::new_v4();
        let (events, interaction) = session(id);
        let (extractor, factory) = extractor_with(ScriptedBehavior {
            signals: vec![ReplaySignal::ElementRect(rect())],
            region_capture_fails: true,
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("element.png");

        let shot = extractor.extract(&events, &interaction, &out).await.unwrap();
        assert!(!shot.cropped);
        assert_eq!(std::fs::read(&out).unwrap(), b"fullpage");
        // The cropped path was attempted exactly once before the fallback.
        assert_eq!(factory.region_captures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rect_timeout_is_fatal_not_retried() {
        let id = Uuid::new_v4();
        let (events, interaction) = session(id);
        let (extractor, factory) = extractor_with(ScriptedBehavior {
            hold_open: true,
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();

        let err = extractor
            .extract(&events, &interaction, &dir.path().join("element.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReelcutError::Timeout { .. }));
        // The timeout path never reaches any capture; no fallback.
        assert_eq!(factory.region_captures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_markers_fail_before_page_acquire() {
        let id = Uuid::new_v4();
        let events = vec![SessionEvent::meta(0, 1280, 720)];
        let interaction = Interaction {
            interaction_id: id,
            target_node_id: 1,
            screenshot_delay_ms: 0,
        };
        let (extractor, factory) = extractor_with(ScriptedBehavior::default());
        let dir = tempfile::tempdir().unwrap();

        let err = extractor
            .extract(&events, &interaction, &dir.path().join("element.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReelcutError::Validation { .. }));
        assert_eq!(factory.pages_opened.load(Ordering::SeqCst), 0);
    }
}
