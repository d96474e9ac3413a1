//! Slice per-interaction clips out of a rendered video.

use std::path::PathBuf;

use reelcut_render::slicer::ClipSlicer;
use reelcut_render::thumbnail::extract_thumbnail;
use reelcut_session_model::{pair_markers, CaptureManifest, ClipWindow};

pub async fn run(manifest_path: PathBuf, output: PathBuf, timeout_ms: u64) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&manifest_path)?;
    let manifest = CaptureManifest::from_json_str(&content)?;

    if !manifest.video_path.exists() {
        anyhow::bail!(
            "rendered video not found: {}",
            manifest.video_path.display()
        );
    }
    std::fs::create_dir_all(&output)?;

    let pairs = pair_markers(&manifest.markers)
        .map_err(|e| anyhow::anyhow!("Marker pairing failed: {e}"))?;

    println!(
        "Slicing {} clip(s) from {}",
        pairs.len(),
        manifest.video_path.display()
    );

    let slicer = ClipSlicer::new(timeout_ms);
    let mut tasks = tokio::task::JoinSet::new();
    for pair in &pairs {
        let window = ClipWindow::around(pair, manifest.video_duration_ms);
        let slicer = slicer.clone();
        let source = manifest.video_path.clone();
        let id = window.interaction_id;
        let clip_path = output.join(format!("clip-{id}.mp4"));
        let thumbnail_path = output.join(format!("thumb-{id}.jpg"));
        tasks.spawn(async move {
            slicer.slice(&source, &window, &clip_path).await?;
            extract_thumbnail(&source, window.start_ms, &thumbnail_path, timeout_ms).await?;
            Ok::<_, reelcut_common::error::ReelcutError>((id, clip_path))
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (id, clip_path) = joined??;
        println!("  {id} -> {}", clip_path.display());
    }

    println!("Done.");
    Ok(())
}
