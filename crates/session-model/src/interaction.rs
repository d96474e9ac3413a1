//! Interactions and the metadata markers they produce during replay.
//!
//! Interactions are supplied by the caller alongside the event log.
//! Markers and FPS updates are emitted by in-page instrumentation while
//! the session replays; the capture controller stamps them with a video
//! time once the surrounding frame boundary is known.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::SessionEvent;
use crate::SessionError;

/// A user-recorded unit of activity, provided with the upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    /// Unique interaction id.
    pub interaction_id: Uuid,

    /// Serialized-DOM node id to capture for the element screenshot.
    pub target_node_id: i64,

    /// Offset after the interaction start at which to take the
    /// element screenshot.
    pub screenshot_delay_ms: i64,
}

/// Which boundary of an interaction a marker records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerPhase {
    Start,
    End,
}

impl std::fmt::Display for MarkerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerPhase::Start => write!(f, "start"),
            MarkerPhase::End => write!(f, "end"),
        }
    }
}

/// Metadata emitted by in-page instrumentation during replay.
///
/// Also the payload shape of recorded interaction-plugin events, so the
/// element extractor can read markers straight out of the original log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ReplayMetadata {
    /// An interaction began.
    InteractionStart {
        interaction_id: Uuid,
        wall_clock_ms: i64,
    },

    /// An interaction finished.
    InteractionEnd {
        interaction_id: Uuid,
        wall_clock_ms: i64,
    },

    /// A live frame-rate measurement.
    FpsUpdate { fps: f64, wall_clock_ms: i64 },
}

impl ReplayMetadata {
    /// Build a start or end marker.
    pub fn marker(interaction_id: Uuid, phase: MarkerPhase, wall_clock_ms: i64) -> Self {
        match phase {
            MarkerPhase::Start => Self::InteractionStart {
                interaction_id,
                wall_clock_ms,
            },
            MarkerPhase::End => Self::InteractionEnd {
                interaction_id,
                wall_clock_ms,
            },
        }
    }

    /// The marker phase, if this is an interaction marker.
    pub fn phase(&self) -> Option<MarkerPhase> {
        match self {
            Self::InteractionStart { .. } => Some(MarkerPhase::Start),
            Self::InteractionEnd { .. } => Some(MarkerPhase::End),
            Self::FpsUpdate { .. } => None,
        }
    }

    /// The interaction this metadata belongs to, if any.
    pub fn interaction_id(&self) -> Option<Uuid> {
        match self {
            Self::InteractionStart { interaction_id, .. }
            | Self::InteractionEnd { interaction_id, .. } => Some(*interaction_id),
            Self::FpsUpdate { .. } => None,
        }
    }

    /// Wall-clock timestamp at emission time.
    pub fn wall_clock_ms(&self) -> i64 {
        match self {
            Self::InteractionStart { wall_clock_ms, .. }
            | Self::InteractionEnd { wall_clock_ms, .. }
            | Self::FpsUpdate { wall_clock_ms, .. } => *wall_clock_ms,
        }
    }
}

/// An interaction marker stamped with its position on the video axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionMarker {
    pub interaction_id: Uuid,
    pub phase: MarkerPhase,

    /// Wall-clock at emission time.
    pub wall_clock_ms: i64,

    /// Position on the captured video's time axis.
    pub video_time_ms: f64,
}

/// An FPS measurement stamped with its position on the video axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FpsSample {
    pub fps: f64,
    pub wall_clock_ms: i64,
    pub video_time_ms: f64,
}

/// An FPS measurement as uploaded (not yet on the video axis).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FpsObservation {
    pub fps: f64,
    pub wall_clock_ms: i64,
}

/// The upload body consumed by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpload {
    /// Full recorded event log.
    pub events: Vec<SessionEvent>,

    /// Interactions to slice clips for.
    pub interactions: Vec<Interaction>,

    /// Recording start, wall-clock ms.
    pub start_at_ms: i64,

    /// Recording end, wall-clock ms.
    pub end_at_ms: i64,

    /// FPS measurements observed while recording.
    #[serde(default)]
    pub fps_observations: Vec<FpsObservation>,
}

impl SessionUpload {
    /// Target duration of the rendered video.
    pub fn target_duration_ms(&self) -> f64 {
        (self.end_at_ms - self.start_at_ms).max(0) as f64
    }
}

/// A matched start/end marker pair for one interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPair {
    pub start: InteractionMarker,
    pub end: InteractionMarker,
}

impl MarkerPair {
    /// Interaction id shared by both markers.
    pub fn interaction_id(&self) -> Uuid {
        self.start.interaction_id
    }
}

/// Pair every start marker with its end marker by interaction id.
///
/// Exactly one start and one end must exist per interaction; a missing
/// or duplicated marker fails the whole pipeline run.
pub fn pair_markers(markers: &[InteractionMarker]) -> Result<Vec<MarkerPair>, SessionError> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut halves: std::collections::HashMap<Uuid, (Option<InteractionMarker>, Option<InteractionMarker>)> =
        std::collections::HashMap::new();

    for marker in markers {
        let entry = halves.entry(marker.interaction_id).or_insert_with(|| {
            order.push(marker.interaction_id);
            (None, None)
        });
        let slot = match marker.phase {
            MarkerPhase::Start => &mut entry.0,
            MarkerPhase::End => &mut entry.1,
        };
        if slot.is_some() {
            return Err(SessionError::DuplicateMarker {
                interaction_id: marker.interaction_id,
                phase: marker.phase,
            });
        }
        *slot = Some(marker.clone());
    }

    let mut pairs = Vec::with_capacity(order.len());
    for interaction_id in order {
        let (start, end) = halves.remove(&interaction_id).expect("id recorded in order");
        let start = start.ok_or(SessionError::UnpairedMarker {
            interaction_id,
            phase: MarkerPhase::Start,
        })?;
        let end = end.ok_or(SessionError::UnpairedMarker {
            interaction_id,
            phase: MarkerPhase::End,
        })?;
        pairs.push(MarkerPair { start, end });
    }
    Ok(pairs)
}

/// Locate the recorded start/end markers for one interaction in the
/// original event log.
///
/// Used by the element screenshot extractor, which works from the log
/// rather than the rendered video. Exactly two markers must exist.
pub fn find_interaction_markers(
    events: &[SessionEvent],
    interaction_id: Uuid,
) -> Result<(ReplayMetadata, ReplayMetadata), SessionError> {
    let matches: Vec<ReplayMetadata> = events
        .iter()
        .filter_map(|event| event.replay_metadata())
        .filter(|metadata| metadata.interaction_id() == Some(interaction_id))
        .collect();

    let start = matches
        .iter()
        .find(|m| m.phase() == Some(MarkerPhase::Start));
    let end = matches.iter().find(|m| m.phase() == Some(MarkerPhase::End));

    match (matches.len(), start, end) {
        (2, Some(start), Some(end)) => Ok((start.clone(), end.clone())),
        (found, _, _) => Err(SessionError::MarkerCount {
            interaction_id,
            found,
        }),
    }
}
