//! Bounded page pool.
//!
//! One pool slot runs one logical unit of work (a full-video render or
//! one element screenshot) to completion; pages are never shared
//! between concurrent tasks. The pool is constructed explicitly and
//! handed to every component that needs pages; lifecycle is the host
//! program's call, not a process global.

use std::sync::Arc;

use reelcut_common::error::{ReelcutError, ReelcutResult};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::page::{PageFactory, ReplayPage};

/// A bounded pool handing out fresh pages.
pub struct PagePool {
    factory: Arc<dyn PageFactory>,
    slots: Arc<Semaphore>,
    size: usize,
}

impl PagePool {
    /// Create a pool with `size` concurrent slots.
    pub fn new(factory: Arc<dyn PageFactory>, size: usize) -> Self {
        let size = size.max(1);
        Self {
            factory,
            slots: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Number of concurrent slots.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Acquire a slot and open a fresh page in it.
    ///
    /// Suspends until a slot frees up. The slot is released when the
    /// returned lease drops, on success and failure alike.
    pub async fn acquire(&self) -> ReelcutResult<PageLease> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ReelcutError::page("Page pool is closed"))?;

        let page = self.factory.open_page().await?;
        Ok(PageLease {
            page: Some(page),
            _permit: permit,
        })
    }

    /// Shut the pool down: pending and future acquires fail.
    pub fn close(&self) {
        self.slots.close();
    }
}

/// A page checked out of the pool; returns its slot on drop.
pub struct PageLease {
    page: Option<Box<dyn ReplayPage>>,
    _permit: OwnedSemaphorePermit,
}

impl PageLease {
    /// The leased page.
    pub fn page(&self) -> &dyn ReplayPage {
        self.page.as_deref().expect("page present until release")
    }

    /// Close the page politely before releasing the slot.
    pub async fn release(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::warn!(error = %e, "Failed to close page on release");
            }
        }
    }
}
