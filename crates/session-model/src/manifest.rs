//! Capture manifest: what one full-video render produced.
//!
//! Written next to the rendered video so slicing and correlation can
//! run later (or from the CLI) without re-capturing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::interaction::{FpsSample, InteractionMarker};

/// Result of rendering one session to a full video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureManifest {
    /// Rendered full-video file.
    pub video_path: PathBuf,

    /// Capture frame rate.
    pub fps: u32,

    /// Frames captured from the page.
    pub captured_frames: u64,

    /// Duplicate tail frames appended to reach the target duration.
    pub padded_frames: u64,

    /// Duration of the rendered video used for clip clamping.
    pub video_duration_ms: f64,

    /// Interaction markers, stamped with video time.
    pub markers: Vec<InteractionMarker>,

    /// FPS samples, stamped with video time.
    pub fps_samples: Vec<FpsSample>,
}

impl CaptureManifest {
    /// Parse a manifest from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the manifest to pretty JSON.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::MarkerPhase;
    use uuid::Uuid;

    #[test]
    fn test_manifest_roundtrip() {
        let manifest = CaptureManifest {
            video_path: PathBuf::from("/tmp/full.mp4"),
            fps: 30,
            captured_frames: 90,
            padded_frames: 15,
            video_duration_ms: 4_000.0,
            markers: vec![InteractionMarker {
                interaction_id: Uuid::new_v4(),
                phase: MarkerPhase::Start,
                wall_clock_ms: 1_700_000_000_000,
                video_time_ms: 1_000.0,
            }],
            fps_samples: vec![FpsSample {
                fps: 59.2,
                wall_clock_ms: 1_700_000_000_500,
                video_time_ms: 500.0,
            }],
        };
        let parsed = CaptureManifest::from_json_str(&manifest.to_json_string().unwrap()).unwrap();
        assert_eq!(parsed, manifest);
    }
}
