//! Reelcut Capture Engine
//!
//! Drives recorded sessions through headless-browser pages:
//! - the page protocol seam ([`ReplayPage`] / [`PageFactory`])
//! - a bounded page pool
//! - the frame capture controller (replay → ordered frame stream →
//!   encoder)
//! - the element screenshot extractor
//!
//! The browser automation backend itself lives behind [`PageFactory`];
//! this crate consumes pages, it does not create browsers.

pub mod controller;
pub mod element;
pub mod page;
pub mod pool;

#[cfg(any(test, feature = "scripted"))]
pub mod scripted;

pub use controller::*;
pub use element::*;
pub use page::*;
pub use pool::*;
