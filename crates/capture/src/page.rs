//! The page protocol seam.
//!
//! A [`ReplayPage`] is one headless-browser page with the replay
//! instrumentation injected. Replay is driven by the page; the host
//! observes it through a single signal channel, which also serializes
//! screenshot requests: signals are consumed by one loop, so frame
//! order is the channel order regardless of how the in-page code
//! behaves.

use async_trait::async_trait;
use reelcut_common::error::ReelcutResult;
use reelcut_session_model::{BoundingRect, RenderStats, ReplayMetadata, SessionEvent, SessionViewport};
use tokio::sync::mpsc;

/// A signal raised by in-page instrumentation during replay.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplaySignal {
    /// Capture one frame now.
    ShouldScreenshot,

    /// Record an interaction marker or FPS measurement. Buffered by the
    /// controller and stamped at the next frame boundary.
    Metadata(ReplayMetadata),

    /// Bounding rectangle of the targeted DOM node (element pass only).
    ElementRect(BoundingRect),

    /// Visibility/render statistics (element pass only).
    RenderStats(RenderStats),

    /// Replay reached its end; no further signals follow.
    Finished,
}

/// Options controlling one replay run.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Stop the replay this many milliseconds after the first event
    /// instead of playing to the end (element pass).
    pub stop_at_ms: Option<i64>,

    /// Serialized-DOM node whose bounding rect should be reported
    /// (element pass).
    pub target_node_id: Option<i64>,
}

impl ReplayOptions {
    /// Full end-to-end replay for video capture.
    pub fn full() -> Self {
        Self::default()
    }

    /// Partial replay targeting one node for an element screenshot.
    pub fn element(stop_at_ms: i64, target_node_id: i64) -> Self {
        Self {
            stop_at_ms: Some(stop_at_ms),
            target_node_id: Some(target_node_id),
        }
    }
}

/// One pooled headless-browser page.
#[async_trait]
pub trait ReplayPage: Send + Sync {
    /// Apply viewport dimensions before any content loads.
    async fn set_viewport(&self, viewport: SessionViewport) -> ReelcutResult<()>;

    /// Start replaying the event log. Signals arrive on the returned
    /// channel in the order the page raised them, ending with
    /// [`ReplaySignal::Finished`].
    async fn replay(
        &self,
        events: &[SessionEvent],
        options: ReplayOptions,
    ) -> ReelcutResult<mpsc::Receiver<ReplaySignal>>;

    /// Capture the current viewport as an encoded image.
    async fn screenshot(&self) -> ReelcutResult<Vec<u8>>;

    /// Capture a cropped region of the page.
    async fn screenshot_region(&self, rect: BoundingRect) -> ReelcutResult<Vec<u8>>;

    /// Capture the full page, uncropped.
    async fn screenshot_full_page(&self) -> ReelcutResult<Vec<u8>>;

    /// Release the page's browser-side resources.
    async fn close(&self) -> ReelcutResult<()>;
}

/// Opens fresh pages; the browser/cluster mechanics live behind this.
#[async_trait]
pub trait PageFactory: Send + Sync {
    async fn open_page(&self) -> ReelcutResult<Box<dyn ReplayPage>>;
}
