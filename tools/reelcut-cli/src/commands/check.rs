//! Check system capabilities.

use reelcut_render::process::{command_exists, ffmpeg_program, ffprobe_program};

pub fn run() -> anyhow::Result<()> {
    println!("Reelcut System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = ffmpeg_program();
    if command_exists(&ffmpeg) {
        println!("[OK] Encoder: {ffmpeg}");
    } else {
        println!("[FAIL] Encoder not found: {ffmpeg}");
    }

    let ffprobe = ffprobe_program();
    if command_exists(&ffprobe) {
        println!("[OK] Prober: {ffprobe}");
    } else {
        println!("[WARN] Prober not found: {ffprobe} (duration probing disabled)");
    }

    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    println!("[OK] Render pool default size: {cpus} (host CPU count)");

    if command_exists(&ffmpeg) {
        println!("\nAll required capabilities are available. Reelcut is ready.");
    } else {
        println!("\nEncoder is missing. Install ffmpeg or set REELCUT_FFMPEG.");
    }

    Ok(())
}
