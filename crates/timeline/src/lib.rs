//! Reelcut Timeline Correlation
//!
//! The rendered video, interaction markers, and FPS samples arrive as
//! three independent streams whose common time axis only exists after
//! capture. This crate folds the metadata streams onto per-interaction
//! clip windows: a generic aggregation in [`correlate`], specialized
//! for markers and FPS samples.
//!
//! Everything here is pure and synchronous.

pub mod correlate;
pub mod fps;
pub mod markers;

pub use correlate::correlate;
pub use fps::*;
pub use markers::*;
