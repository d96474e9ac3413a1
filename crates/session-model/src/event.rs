//! Recorded session event types.
//!
//! A session is an ordered log of timestamped events sharing one epoch.
//! DOM payloads stay opaque JSON: the pipeline replays them inside a
//! page, it never interprets them.

use serde::{Deserialize, Serialize};

use crate::interaction::ReplayMetadata;
use crate::SessionError;

/// Milliseconds since the session epoch (shared by the whole log).
pub type TimestampMs = i64;

/// Plugin tag under which interaction markers are recorded.
pub const INTERACTION_PLUGIN: &str = "reelcut/interaction";

/// A single recorded session event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Milliseconds since the session epoch.
    pub timestamp: TimestampMs,

    /// The event payload.
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Discriminated union of event types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventKind {
    /// Viewport dimensions and location; must open every session.
    Meta(ViewportMeta),

    /// Complete serialized DOM tree.
    FullSnapshot(serde_json::Value),

    /// Incremental DOM mutation.
    IncrementalSnapshot(serde_json::Value),

    /// Free-form payload recorded by the session host.
    Custom(serde_json::Value),

    /// Payload recorded by a named recorder plugin.
    Plugin(PluginPayload),
}

/// Viewport metadata carried by the opening meta event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportMeta {
    /// Viewport width in CSS pixels.
    pub width: u32,

    /// Viewport height in CSS pixels.
    pub height: u32,

    /// Page URL at recording start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// Payload recorded by a named recorder plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginPayload {
    /// Plugin name.
    pub plugin: String,

    /// Plugin-defined payload.
    pub payload: serde_json::Value,
}

impl SessionEvent {
    /// Create a meta event.
    pub fn meta(timestamp: TimestampMs, width: u32, height: u32) -> Self {
        Self {
            timestamp,
            kind: EventKind::Meta(ViewportMeta {
                width,
                height,
                href: None,
            }),
        }
    }

    /// Create a full-snapshot event with an opaque DOM payload.
    pub fn full_snapshot(timestamp: TimestampMs, data: serde_json::Value) -> Self {
        Self {
            timestamp,
            kind: EventKind::FullSnapshot(data),
        }
    }

    /// Create an incremental-snapshot event.
    pub fn incremental(timestamp: TimestampMs, data: serde_json::Value) -> Self {
        Self {
            timestamp,
            kind: EventKind::IncrementalSnapshot(data),
        }
    }

    /// Create an interaction-plugin event.
    pub fn interaction_plugin(timestamp: TimestampMs, metadata: &ReplayMetadata) -> Self {
        Self {
            timestamp,
            kind: EventKind::Plugin(PluginPayload {
                plugin: INTERACTION_PLUGIN.to_string(),
                payload: serde_json::to_value(metadata)
                    .expect("replay metadata serializes infallibly"),
            }),
        }
    }

    /// Interaction metadata carried by this event, if it is an
    /// interaction-plugin event with a well-formed payload.
    pub fn replay_metadata(&self) -> Option<ReplayMetadata> {
        match &self.kind {
            EventKind::Plugin(p) if p.plugin == INTERACTION_PLUGIN => {
                serde_json::from_value(p.payload.clone()).ok()
            }
            _ => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match &self.kind {
            EventKind::Meta(_) => "meta",
            EventKind::FullSnapshot(_) => "full_snapshot",
            EventKind::IncrementalSnapshot(_) => "incremental_snapshot",
            EventKind::Custom(_) => "custom",
            EventKind::Plugin(_) => "plugin",
        }
    }
}

/// Viewport dimensions read from the mandatory opening meta event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionViewport {
    pub width: u32,
    pub height: u32,
}

/// Read the viewport from the first event.
///
/// Every session must open with a meta event carrying the viewport;
/// anything else is a fatal validation failure.
pub fn session_viewport(events: &[SessionEvent]) -> Result<SessionViewport, SessionError> {
    let first = events.first().ok_or(SessionError::EmptySession)?;
    match &first.kind {
        EventKind::Meta(meta) => Ok(SessionViewport {
            width: meta.width,
            height: meta.height,
        }),
        _ => Err(SessionError::MissingViewport {
            found: first.kind_name(),
        }),
    }
}

/// Validate the whole event log: opening viewport plus non-decreasing
/// timestamps.
pub fn validate_events(events: &[SessionEvent]) -> Result<SessionViewport, SessionError> {
    let viewport = session_viewport(events)?;
    for (index, window) in events.windows(2).enumerate() {
        if window[1].timestamp < window[0].timestamp {
            return Err(SessionError::NonMonotonicTimestamps { index: index + 1 });
        }
    }
    Ok(viewport)
}

/// Parse events from JSONL content (one JSON object per line).
pub fn parse_events(jsonl: &str) -> Result<Vec<SessionEvent>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Serialize events to JSONL format.
pub fn serialize_events(events: &[SessionEvent]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for event in events {
        output.push_str(&serde_json::to_string(event)?);
        output.push('\n');
    }
    Ok(output)
}
