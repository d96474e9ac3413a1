//! Show session information.

use std::path::PathBuf;

use reelcut_session_model::{session_viewport, EventKind, SessionUpload};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&path)?;
    let upload: SessionUpload = serde_json::from_str(&content)?;

    println!("Session: {}", path.display());
    println!("  Events: {}", upload.events.len());

    if let Ok(viewport) = session_viewport(&upload.events) {
        println!("  Viewport: {}x{}", viewport.width, viewport.height);
    }

    let mut meta = 0usize;
    let mut full = 0usize;
    let mut incremental = 0usize;
    let mut custom = 0usize;
    let mut plugin = 0usize;
    for event in &upload.events {
        match &event.kind {
            EventKind::Meta(_) => meta += 1,
            EventKind::FullSnapshot(_) => full += 1,
            EventKind::IncrementalSnapshot(_) => incremental += 1,
            EventKind::Custom(_) => custom += 1,
            EventKind::Plugin(_) => plugin += 1,
        }
    }
    println!("    meta: {meta}");
    println!("    full snapshots: {full}");
    println!("    incremental snapshots: {incremental}");
    println!("    custom: {custom}");
    println!("    plugin: {plugin}");

    println!("  Interactions: {}", upload.interactions.len());
    for interaction in &upload.interactions {
        println!(
            "    {} (node {}, delay {}ms)",
            interaction.interaction_id, interaction.target_node_id, interaction.screenshot_delay_ms
        );
    }

    println!(
        "  Recording span: {:.1}s",
        upload.target_duration_ms() / 1000.0
    );
    println!("  FPS observations: {}", upload.fps_observations.len());

    Ok(())
}
