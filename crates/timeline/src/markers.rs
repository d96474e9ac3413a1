//! Folding interaction markers onto clip windows.

use reelcut_session_model::{ClipWindow, CorrelatedMarker, InteractionMarker};
use serde::Serialize;

use crate::correlate::correlate;

/// All markers whose video time falls inside one clip window,
/// re-expressed clip-relative.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipMarkers {
    pub window: ClipWindow,
    pub markers: Vec<CorrelatedMarker>,
}

/// Fold stamped markers onto clip windows.
///
/// Clip-relative time is `video_time_ms - window.start_ms`. A negative
/// result means the streams disagree about the time axis; it is logged
/// and passed through unclamped so the corruption stays visible.
pub fn correlate_markers(windows: &[ClipWindow], markers: &[InteractionMarker]) -> Vec<ClipMarkers> {
    correlate(
        windows,
        markers,
        |w| (w.start_ms, w.end_ms),
        |m| m.video_time_ms,
        |w, m, _| ClipMarkers {
            window: *w,
            markers: vec![clip_relative(w, m)],
        },
        |record, m, _| {
            let window = record.window;
            record.markers.push(clip_relative(&window, m));
        },
        |w| ClipMarkers {
            window: *w,
            markers: vec![],
        },
    )
}

fn clip_relative(window: &ClipWindow, marker: &InteractionMarker) -> CorrelatedMarker {
    let clip_relative_ms = marker.video_time_ms - window.start_ms;
    if clip_relative_ms < 0.0 {
        tracing::warn!(
            interaction_id = %marker.interaction_id,
            phase = %marker.phase,
            video_time_ms = marker.video_time_ms,
            clip_start_ms = window.start_ms,
            "Marker resolved to a negative clip-relative time"
        );
    }
    CorrelatedMarker {
        marker: marker.clone(),
        clip_relative_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_session_model::MarkerPhase;
    use uuid::Uuid;

    fn window(id: Uuid, start_ms: f64, end_ms: f64) -> ClipWindow {
        ClipWindow {
            interaction_id: id,
            start_ms,
            end_ms,
        }
    }

    fn marker(id: Uuid, phase: MarkerPhase, video_time_ms: f64) -> InteractionMarker {
        InteractionMarker {
            interaction_id: id,
            phase,
            wall_clock_ms: 0,
            video_time_ms,
        }
    }

    #[test]
    fn test_clip_relative_time() {
        let id = Uuid::new_v4();
        let windows = [window(id, 2_000.0, 10_000.0)];
        let markers = [
            marker(id, MarkerPhase::Start, 5_000.0),
            marker(id, MarkerPhase::End, 7_000.0),
        ];
        let out = correlate_markers(&windows, &markers);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].markers[0].clip_relative_ms, 3_000.0);
        assert_eq!(out[0].markers[1].clip_relative_ms, 5_000.0);
    }

    #[test]
    fn test_clip_relative_round_trip_non_negative() {
        let id = Uuid::new_v4();
        let w = window(id, 1_500.0, 9_000.0);
        let markers = [
            marker(id, MarkerPhase::Start, 1_500.0),
            marker(id, MarkerPhase::End, 9_000.0),
        ];
        let out = correlate_markers(&[w], &markers);
        for correlated in &out[0].markers {
            // Recovering video time from the clip offset is exact.
            assert_eq!(
                correlated.clip_relative_ms + w.start_ms,
                correlated.marker.video_time_ms
            );
            assert!(correlated.clip_relative_ms >= 0.0);
        }
    }

    #[test]
    fn test_markers_outside_window_go_to_default_record() {
        let id = Uuid::new_v4();
        let windows = [window(id, 2_000.0, 4_000.0)];
        let markers = [marker(id, MarkerPhase::Start, 10_000.0)];
        let out = correlate_markers(&windows, &markers);
        assert_eq!(out.len(), 1);
        assert!(out[0].markers.is_empty());
    }

    #[test]
    fn test_negative_relative_time_passes_through() {
        // A marker below the window start only matches when bounds say
        // so; force it by handing in inconsistent windows.
        let id = Uuid::new_v4();
        let w = ClipWindow {
            interaction_id: id,
            start_ms: 5_000.0,
            end_ms: 4_000.0,
        };
        let correlated = clip_relative(&w, &marker(id, MarkerPhase::Start, 4_500.0));
        assert_eq!(correlated.clip_relative_ms, -500.0);
    }
}
