//! Clip thumbnail extraction.

use std::path::{Path, PathBuf};

use reelcut_common::error::{ReelcutError, ReelcutResult};
use tokio::process::Command;

use crate::process::{ensure_non_empty_output, ffmpeg_program, run_managed};

fn thumbnail_args(source: &Path, at_ms: f64, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-ss".to_string(),
        format!("{:.3}", at_ms / 1000.0),
        "-i".to_string(),
        source.display().to_string(),
        "-frames:v".to_string(),
        "1".to_string(),
        "-q:v".to_string(),
        "3".to_string(),
        output.display().to_string(),
    ]
}

/// Extract a single-frame thumbnail from `source` at `at_ms`.
pub async fn extract_thumbnail(
    source: &Path,
    at_ms: f64,
    output: &Path,
    timeout_ms: u64,
) -> ReelcutResult<PathBuf> {
    tracing::debug!(at_ms, output = %output.display(), "Extracting thumbnail");

    let mut command = Command::new(ffmpeg_program());
    command.args(thumbnail_args(source, at_ms, output));

    let outcome = run_managed(command, "thumbnail", timeout_ms).await?;
    if !outcome.success() {
        return Err(ReelcutError::encode(
            format!("Thumbnail extraction failed at {at_ms}ms"),
            outcome.exit_code,
            outcome.stderr.trim().to_string(),
        ));
    }
    ensure_non_empty_output(output, "thumbnail")?;
    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_args_seek_before_input() {
        let args = thumbnail_args(Path::new("full.mp4"), 4_250.0, Path::new("thumb.jpg"));
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(args[ss + 1], "4.250");
        assert!(args.contains(&"-frames:v".to_string()));
    }
}
