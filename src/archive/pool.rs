//! Bounded Archive Access
//!
//! Handlers never hold the archive directly. They borrow an [`ArchiveHandle`]
//! from an [`ArchivePool`] for the duration of their archive calls. The pool
//! caps how many requests can be inside the backend at once; a handle gives
//! its slot back when it is dropped, which also covers `?` early returns and
//! tasks dropped mid-request.
//!
//! ```text
//!  conn task ──acquire()──► [permit][permit][    ][    ]  ◄── Semaphore(size)
//!      │                        │
//!      └──► handle.wave(..) ────┘ drop(handle) returns the permit
//! ```

use crate::archive::backend::{Archive, ArchiveError, ArchiveResult};
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

/// A shared, bounded accessor to one archive backend.
///
/// Cloning is cheap and every clone draws from the same set of slots.
#[derive(Clone)]
pub struct ArchivePool {
    archive: Arc<dyn Archive>,
    permits: Arc<Semaphore>,
    size: usize,
}

impl std::fmt::Debug for ArchivePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchivePool")
            .field("size", &self.size)
            .field("available", &self.permits.available_permits())
            .finish()
    }
}

impl ArchivePool {
    /// Creates a pool allowing `size` concurrent archive users (at least one).
    pub fn new(archive: Arc<dyn Archive>, size: usize) -> Self {
        let size = size.max(1);
        Self {
            archive,
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Waits for a free slot and returns a handle holding it.
    pub async fn acquire(&self) -> ArchiveResult<ArchiveHandle> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ArchiveError::Unavailable("archive pool closed".to_string()))?;
        trace!(available = self.permits.available_permits(), "Archive handle acquired");
        Ok(ArchiveHandle {
            archive: Arc::clone(&self.archive),
            _permit: permit,
        })
    }

    /// Maximum number of concurrent handles.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Refuses all further acquisitions. Outstanding handles stay valid.
    pub fn close(&self) {
        self.permits.close();
    }
}

/// Scoped access to the archive. Dropping it frees its pool slot.
pub struct ArchiveHandle {
    archive: Arc<dyn Archive>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for ArchiveHandle {
    type Target = dyn Archive;

    fn deref(&self) -> &Self::Target {
        self.archive.as_ref()
    }
}
