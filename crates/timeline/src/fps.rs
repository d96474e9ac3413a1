//! Folding FPS samples onto clip windows.

use reelcut_session_model::{ClipWindow, FpsSample, FpsUpdate};
use serde::Serialize;

use crate::correlate::correlate;

/// FPS measurements falling inside one clip window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipFps {
    pub window: ClipWindow,

    /// Samples inside the window, clip-relative.
    pub updates: Vec<FpsUpdate>,

    /// FPS value of the sample immediately preceding the window, used
    /// to seed the rate display at clip start. `None` when the first
    /// in-window sample is the first sample overall.
    pub entry_fps: Option<f64>,
}

/// Fold stamped FPS samples onto clip windows.
pub fn correlate_fps(windows: &[ClipWindow], samples: &[FpsSample]) -> Vec<ClipFps> {
    correlate(
        windows,
        samples,
        |w| (w.start_ms, w.end_ms),
        |s| s.video_time_ms,
        |w, s, index| ClipFps {
            window: *w,
            updates: vec![update(w, s)],
            entry_fps: index.checked_sub(1).map(|prev| samples[prev].fps),
        },
        |record, s, _| {
            let window = record.window;
            record.updates.push(update(&window, s));
        },
        |w| ClipFps {
            window: *w,
            updates: vec![],
            entry_fps: None,
        },
    )
}

fn update(window: &ClipWindow, sample: &FpsSample) -> FpsUpdate {
    let clip_relative_ms = sample.video_time_ms - window.start_ms;
    if clip_relative_ms < 0.0 {
        tracing::warn!(
            fps = sample.fps,
            video_time_ms = sample.video_time_ms,
            clip_start_ms = window.start_ms,
            "FPS sample resolved to a negative clip-relative time"
        );
    }
    FpsUpdate {
        fps: sample.fps,
        clip_relative_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample(fps: f64, video_time_ms: f64) -> FpsSample {
        FpsSample {
            fps,
            wall_clock_ms: 0,
            video_time_ms,
        }
    }

    fn window(start_ms: f64, end_ms: f64) -> ClipWindow {
        ClipWindow {
            interaction_id: Uuid::new_v4(),
            start_ms,
            end_ms,
        }
    }

    #[test]
    fn test_updates_are_clip_relative() {
        let windows = [window(1_000.0, 5_000.0)];
        let samples = [sample(60.0, 1_500.0), sample(45.0, 4_000.0)];
        let out = correlate_fps(&windows, &samples);
        assert_eq!(
            out[0].updates,
            vec![
                FpsUpdate { fps: 60.0, clip_relative_ms: 500.0 },
                FpsUpdate { fps: 45.0, clip_relative_ms: 3_000.0 },
            ]
        );
    }

    #[test]
    fn test_entry_fps_is_preceding_sample_value() {
        let windows = [window(2_000.0, 6_000.0)];
        let samples = [
            sample(59.0, 500.0),
            sample(31.0, 1_200.0),
            sample(24.0, 2_500.0),
        ];
        let out = correlate_fps(&windows, &samples);
        // The first in-window sample is index 2; the clip enters at the
        // rate measured just before it.
        assert_eq!(out[0].entry_fps, Some(31.0));
    }

    #[test]
    fn test_entry_fps_absent_for_first_sample() {
        let windows = [window(0.0, 6_000.0)];
        let samples = [sample(60.0, 100.0)];
        let out = correlate_fps(&windows, &samples);
        assert_eq!(out[0].entry_fps, None);
    }

    #[test]
    fn test_window_without_samples_gets_empty_record() {
        let windows = [window(0.0, 1_000.0), window(5_000.0, 6_000.0)];
        let samples = [sample(60.0, 500.0)];
        let out = correlate_fps(&windows, &samples);
        assert_eq!(out.len(), 2);
        let empty = out.iter().find(|r| r.updates.is_empty()).unwrap();
        assert_eq!(empty.entry_fps, None);
        assert_eq!(empty.window.start_ms, 5_000.0);
    }
}
