//! Fold a capture manifest's metadata onto clip windows.

use std::path::PathBuf;

use reelcut_session_model::{pair_markers, CaptureManifest, ClipWindow};
use reelcut_timeline::{correlate_fps, correlate_markers};

pub fn run(manifest_path: PathBuf) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&manifest_path)?;
    let manifest = CaptureManifest::from_json_str(&content)?;

    let pairs = pair_markers(&manifest.markers)
        .map_err(|e| anyhow::anyhow!("Marker pairing failed: {e}"))?;
    let windows: Vec<ClipWindow> = pairs
        .iter()
        .map(|pair| ClipWindow::around(pair, manifest.video_duration_ms))
        .collect();

    let markers = correlate_markers(&windows, &manifest.markers);
    let fps = correlate_fps(&windows, &manifest.fps_samples);

    let report: Vec<serde_json::Value> = windows
        .iter()
        .map(|window| {
            let id = window.interaction_id;
            let clip_markers = markers
                .iter()
                .find(|record| record.window.interaction_id == id)
                .map(|record| record.markers.clone())
                .unwrap_or_default();
            let clip_fps = fps.iter().find(|record| record.window.interaction_id == id);
            serde_json::json!({
                "interactionId": id,
                "clipStartMs": window.start_ms,
                "clipEndMs": window.end_ms,
                "markers": clip_markers,
                "fpsUpdates": clip_fps.map(|r| r.updates.clone()).unwrap_or_default(),
                "entryFps": clip_fps.and_then(|r| r.entry_fps),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
