//! Derived clip entities and the webhook callback payload.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interaction::{Interaction, InteractionMarker, MarkerPair};

/// Padding applied to each side of an interaction window when slicing.
pub const CLIP_PADDING_MS: f64 = 3000.0;

/// A time-bounded window of the full video, one per interaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipWindow {
    /// Interaction this window belongs to.
    pub interaction_id: Uuid,

    /// Window start, milliseconds into the full video.
    pub start_ms: f64,

    /// Window end, milliseconds into the full video.
    pub end_ms: f64,
}

impl ClipWindow {
    /// Derive the window for a marker pair: the interaction window
    /// padded by [`CLIP_PADDING_MS`] on each side, clamped to the
    /// video bounds.
    pub fn around(pair: &MarkerPair, video_duration_ms: f64) -> Self {
        Self {
            interaction_id: pair.interaction_id(),
            start_ms: (pair.start.video_time_ms - CLIP_PADDING_MS).max(0.0),
            end_ms: (pair.end.video_time_ms + CLIP_PADDING_MS).min(video_duration_ms),
        }
    }

    /// Window length in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        (self.end_ms - self.start_ms).max(0.0)
    }

    /// Whether a video-relative time falls inside this window.
    pub fn contains(&self, video_time_ms: f64) -> bool {
        video_time_ms >= self.start_ms && video_time_ms <= self.end_ms
    }
}

/// Bounding rectangle of a DOM node, reported by in-page
/// instrumentation in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Visibility and render statistics gathered while extracting an
/// element screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RenderStats {
    /// Whether the target node was visible at capture time.
    pub visible: bool,

    /// Fraction of the node within the viewport, if measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_coverage: Option<f64>,

    /// DOM node count at capture time, if measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_count: Option<u64>,
}

/// A marker re-expressed relative to the clip it falls inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelatedMarker {
    #[serde(flatten)]
    pub marker: InteractionMarker,

    /// Milliseconds from the clip start to this marker.
    pub clip_relative_ms: f64,
}

/// A clip-relative FPS measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FpsUpdate {
    pub fps: f64,
    pub clip_relative_ms: f64,
}

/// Everything the callback reports for one interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipResult {
    pub interaction_id: Uuid,

    /// URL of the sliced clip video.
    pub clip_url: String,

    /// URL of the clip thumbnail image.
    pub thumbnail_url: String,

    /// URL of the element screenshot.
    pub element_screenshot_url: String,

    /// Clip window within the full video.
    pub clip_start_ms: f64,
    pub clip_end_ms: f64,

    /// Interaction boundaries, clip-relative.
    pub start_marker: CorrelatedMarker,
    pub end_marker: CorrelatedMarker,

    /// Render statistics from the element screenshot pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_stats: Option<RenderStats>,

    /// FPS measurements falling inside the clip window.
    pub fps_updates: Vec<FpsUpdate>,

    /// FPS value of the sample immediately preceding the clip window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_fps: Option<f64>,
}

/// Final payload POSTed to the caller's webhook.
///
/// All-or-nothing: if any clip failed to resolve, `clips` is absent and
/// `error` describes the failure. Partial clip lists are never sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clips: Option<Vec<ClipResult>>,

    pub interactions: Vec<Interaction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the pipeline finished processing, RFC 3339.
    pub generated_at: String,
}

impl CallbackPayload {
    /// Successful payload carrying the full clip set.
    pub fn success(
        clips: Vec<ClipResult>,
        interactions: Vec<Interaction>,
        generated_at: String,
    ) -> Self {
        Self {
            clips: Some(clips),
            interactions,
            error: None,
            generated_at,
        }
    }

    /// Error-shaped payload; no partial results.
    pub fn failure(
        error: impl Into<String>,
        interactions: Vec<Interaction>,
        generated_at: String,
    ) -> Self {
        Self {
            clips: None,
            interactions,
            error: Some(error.into()),
            generated_at,
        }
    }
}
