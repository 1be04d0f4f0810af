//! The Archive Seam
//!
//! The protocol layer never touches storage directly. Everything it needs
//! from the archive goes through [`Archive`], so the same handlers run over
//! the in-memory archive in tests and over a database-backed one in
//! production.

use crate::archive::types::{
    Channel, HelicorderMatrix, Instrument, RsamSeries, Scnl, TimeSpan, WaveSegment,
};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by an archive backend.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The backend could not be reached
    #[error("archive unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected or failed a query
    #[error("archive query failed: {0}")]
    Query(String),

    /// A snapshot file could not be read
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot file could not be decoded
    #[error("snapshot format error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// How an RSAM series should be reduced before it is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsamDownsample {
    /// Native resolution
    None,
    /// Mean over buckets of this many seconds
    Mean(u32),
}

impl RsamDownsample {
    /// Maps the wire period: anything below 2 seconds means native
    /// resolution.
    pub fn from_period(period: i64) -> Self {
        if period < 2 {
            RsamDownsample::None
        } else {
            RsamDownsample::Mean(period.min(u32::MAX as i64) as u32)
        }
    }
}

/// Read access to the waveform archive.
#[async_trait]
pub trait Archive: Send + Sync {
    /// Surrogate id of a channel, or `None` if the SCNL is unknown.
    async fn channel_id(&self, scnl: &Scnl) -> ArchiveResult<Option<i32>>;

    /// Earliest and latest sample times, or `None` if the channel holds no
    /// data.
    async fn coverage(&self, sid: i32) -> ArchiveResult<Option<TimeSpan>>;

    /// Samples covering `span`. Gaps inside the span are [`NO_DATA`].
    ///
    /// [`NO_DATA`]: crate::archive::types::NO_DATA
    async fn wave(&self, sid: i32, span: TimeSpan) -> ArchiveResult<Option<WaveSegment>>;

    /// Min/max rows for `span`, at a coarser interval when `downsample` is
    /// set.
    async fn helicorder(
        &self,
        sid: i32,
        span: TimeSpan,
        downsample: bool,
    ) -> ArchiveResult<Option<HelicorderMatrix>>;

    /// Amplitude series for `span`.
    async fn rsam(
        &self,
        sid: i32,
        span: TimeSpan,
        downsample: RsamDownsample,
    ) -> ArchiveResult<Option<RsamSeries>>;

    /// Intervals inside `span` that hold no data.
    async fn find_gaps(&self, scnl: &Scnl, span: TimeSpan) -> ArchiveResult<Vec<TimeSpan>>;

    /// Every known channel. Groups and key/value metadata are only filled in
    /// when `with_metadata` is set.
    async fn list_channels(&self, with_metadata: bool) -> ArchiveResult<Vec<Channel>>;

    /// Every known instrument.
    async fn list_instruments(&self) -> ArchiveResult<Vec<Instrument>>;
}
