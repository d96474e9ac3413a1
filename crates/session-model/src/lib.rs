//! Reelcut Session Model
//!
//! Core data model for recorded browser sessions:
//! - Session events (DOM snapshots, mutations, plugin payloads)
//! - Interactions and their replay-time markers
//! - Derived clip windows and the webhook callback payload

pub mod clip;
pub mod event;
pub mod interaction;
pub mod manifest;

pub use clip::*;
pub use event::*;
pub use interaction::*;
pub use manifest::*;

/// Errors raised while validating or interpreting session data.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session contains no events")]
    EmptySession,

    #[error("first session event must be a meta event carrying the viewport, found {found}")]
    MissingViewport { found: &'static str },

    #[error("event timestamps must be non-decreasing (event {index} goes backwards)")]
    NonMonotonicTimestamps { index: usize },

    #[error("duplicate {phase} marker for interaction {interaction_id}")]
    DuplicateMarker {
        interaction_id: uuid::Uuid,
        phase: interaction::MarkerPhase,
    },

    #[error("interaction {interaction_id} is missing its {phase} marker")]
    UnpairedMarker {
        interaction_id: uuid::Uuid,
        phase: interaction::MarkerPhase,
    },

    #[error("expected exactly one start and one end marker for interaction {interaction_id}, found {found}")]
    MarkerCount {
        interaction_id: uuid::Uuid,
        found: usize,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
