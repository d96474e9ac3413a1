//! Scripted in-memory page backend.
//!
//! Replays a predefined signal sequence instead of driving a browser.
//! Used by tests and for running the pipeline deterministically without
//! an automation backend.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_session_model::{BoundingRect, SessionEvent, SessionViewport};
use tokio::sync::mpsc;

use crate::page::{PageFactory, ReplayOptions, ReplayPage, ReplaySignal};

/// What a scripted page does when asked to replay.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBehavior {
    /// Signals emitted in order; `Finished` is appended automatically.
    pub signals: Vec<ReplaySignal>,

    /// Keep the signal channel open instead of finishing, to exercise
    /// host-side timeouts.
    pub hold_open: bool,

    /// Fail cropped region captures, to exercise the full-page retry.
    pub region_capture_fails: bool,
}

/// Factory producing scripted pages.
pub struct ScriptedFactory {
    behavior: ScriptedBehavior,
    pub pages_opened: Arc<AtomicUsize>,
    pub pages_closed: Arc<AtomicUsize>,
    pub region_captures: Arc<AtomicUsize>,
    pub last_viewport: Arc<Mutex<Option<SessionViewport>>>,
    pub last_replay_options: Arc<Mutex<Option<ReplayOptions>>>,
}

impl ScriptedFactory {
    pub fn new(behavior: ScriptedBehavior) -> Self {
        Self {
            behavior,
            pages_opened: Arc::new(AtomicUsize::new(0)),
            pages_closed: Arc::new(AtomicUsize::new(0)),
            region_captures: Arc::new(AtomicUsize::new(0)),
            last_viewport: Arc::new(Mutex::new(None)),
            last_replay_options: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl PageFactory for ScriptedFactory {
    async fn open_page(&self) -> ReelcutResult<Box<dyn ReplayPage>> {
        self.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedPage {
            behavior: self.behavior.clone(),
            frames_captured: AtomicU64::new(0),
            region_captures_attempted: self.region_captures.clone(),
            viewport: self.last_viewport.clone(),
            last_options: self.last_replay_options.clone(),
            pages_closed: self.pages_closed.clone(),
        }))
    }
}

/// A page that replays its scripted signal sequence.
pub struct ScriptedPage {
    behavior: ScriptedBehavior,
    frames_captured: AtomicU64,
    region_captures_attempted: Arc<AtomicUsize>,
    viewport: Arc<Mutex<Option<SessionViewport>>>,
    last_options: Arc<Mutex<Option<ReplayOptions>>>,
    pages_closed: Arc<AtomicUsize>,
}

impl ScriptedPage {
    /// Viewport applied by the controller, if any.
    pub fn viewport(&self) -> Option<SessionViewport> {
        *self.viewport.lock().expect("viewport lock")
    }

    /// Options of the most recent replay call.
    pub fn last_options(&self) -> Option<ReplayOptions> {
        self.last_options.lock().expect("options lock").clone()
    }
}

#[async_trait]
impl ReplayPage for ScriptedPage {
    async fn set_viewport(&self, viewport: SessionViewport) -> ReelcutResult<()> {
        *self.viewport.lock().expect("viewport lock") = Some(viewport);
        Ok(())
    }

    async fn replay(
        &self,
        _events: &[SessionEvent],
        options: ReplayOptions,
    ) -> ReelcutResult<mpsc::Receiver<ReplaySignal>> {
        *self.last_options.lock().expect("options lock") = Some(options);

        let (tx, rx) = mpsc::channel(64);
        let signals = self.behavior.signals.clone();
        let hold_open = self.behavior.hold_open;
        tokio::spawn(async move {
            for signal in signals {
                if tx.send(signal).await.is_err() {
                    return;
                }
            }
            if hold_open {
                // Simulate instrumentation that never finishes.
                tx.closed().await;
            } else {
                let _ = tx.send(ReplaySignal::Finished).await;
            }
        });
        Ok(rx)
    }

    async fn screenshot(&self) -> ReelcutResult<Vec<u8>> {
        let n = self.frames_captured.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("frame{n};").into_bytes())
    }

    async fn screenshot_region(&self, _rect: BoundingRect) -> ReelcutResult<Vec<u8>> {
        self.region_captures_attempted.fetch_add(1, Ordering::SeqCst);
        if self.behavior.region_capture_fails {
            return Err(ReelcutError::page("region capture failed"));
        }
        Ok(b"cropped".to_vec())
    }

    async fn screenshot_full_page(&self) -> ReelcutResult<Vec<u8>> {
        Ok(b"fullpage".to_vec())
    }

    async fn close(&self) -> ReelcutResult<()> {
        self.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
