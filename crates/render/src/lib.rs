//! Reelcut Render Engine
//!
//! Everything that talks to ffmpeg: streaming captured frames into an
//! encoder process, trimming per-interaction clips out of the full
//! video, and extracting thumbnails.
//!
//! # Pipeline Architecture
//!
//! ```text
//! frames (stdin stream) ──► FrameEncoder ──► full.mp4
//!                                              │
//!                              ┌───────────────┤
//!                              ▼               ▼
//!                         ClipSlicer      thumbnail
//!                              │               │
//!                              ▼               ▼
//!                        clip-<id>.mp4   thumb-<id>.jpg
//! ```

pub mod encoder;
pub mod process;
pub mod slicer;
pub mod thumbnail;

pub use encoder::*;
pub use process::*;
pub use slicer::*;
pub use thumbnail::*;
