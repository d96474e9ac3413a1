//! Validate an uploaded session file.

use std::path::PathBuf;

use reelcut_session_model::{find_interaction_markers, parse_events, validate_events, SessionUpload};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating session at: {}", path.display());

    let content = std::fs::read_to_string(&path)?;

    // A bare .jsonl file is just the event log, without interactions.
    if path.extension().is_some_and(|ext| ext == "jsonl") {
        let events =
            parse_events(&content).map_err(|e| anyhow::anyhow!("Failed to parse events: {e}"))?;
        let viewport = validate_events(&events)
            .map_err(|e| anyhow::anyhow!("Event log is invalid: {e}"))?;
        println!("  Events: {}", events.len());
        println!("  Viewport: {}x{}", viewport.width, viewport.height);
        println!("\nEvent log is valid.");
        return Ok(());
    }

    let upload: SessionUpload =
        serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Failed to parse session: {e}"))?;

    let viewport = validate_events(&upload.events)
        .map_err(|e| anyhow::anyhow!("Event log is invalid: {e}"))?;
    println!("  Events: {}", upload.events.len());
    println!("  Viewport: {}x{}", viewport.width, viewport.height);
    println!("  Interactions: {}", upload.interactions.len());

    let mut issues = Vec::new();
    for interaction in &upload.interactions {
        if let Err(e) = find_interaction_markers(&upload.events, interaction.interaction_id) {
            issues.push(format!("{e}"));
        }
    }

    if upload.end_at_ms < upload.start_at_ms {
        issues.push("session end precedes session start".to_string());
    }

    if issues.is_empty() {
        println!("\nSession is valid.");
    } else {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        anyhow::bail!("{} issue(s) found", issues.len());
    }

    Ok(())
}
