//! Archive Access Module
//!
//! Everything the protocol layer knows about stored data. The storage engine
//! itself sits behind the [`Archive`] trait; this module adds the pieces the
//! server wraps around it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────────────┐
//! │   Handlers   │────>│ ArchivePool  │────>│  dyn Archive         │
//! │              │     │ (Semaphore)  │     │  (InMemoryArchive,   │
//! │              │     └──────────────┘     │   database, ...)     │
//! │              │     ┌──────────────┐     │                      │
//! │              │────>│ CatalogCache │────>│                      │
//! └──────────────┘     │ (TTL)        │     └──────────────────────┘
//!                      └──────────────┘
//! ```
//!
//! ## Features
//!
//! - **Trait Seam**: Handlers only see [`Archive`], never a concrete backend
//! - **Bounded Pool**: At most N requests inside the backend at once
//! - **Catalog Cache**: Channel and instrument listings cached for a TTL
//! - **In-Memory Backend**: Full implementation for tests and snapshots

pub mod backend;
pub mod cache;
pub mod memory;
pub mod pool;
pub mod types;

// Re-export commonly used types
pub use backend::{Archive, ArchiveError, ArchiveResult, RsamDownsample};
pub use cache::CatalogCache;
pub use memory::InMemoryArchive;
pub use pool::{ArchiveHandle, ArchivePool};
pub use types::{
    Channel, HelicorderMatrix, HelicorderRow, Instrument, RsamSample, RsamSeries, Scnl, TimeSpan,
    WaveSegment, NO_DATA, NO_LOCATION,
};
