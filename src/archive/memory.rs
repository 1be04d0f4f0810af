//! In-Memory Archive
//!
//! A complete [`Archive`] implementation that keeps channels, instruments and
//! wave segments in memory. The server binary uses it to serve a JSON
//! snapshot; the tests use it as the backend for every handler.
//!
//! ## Layout
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                 InMemoryArchive                    │
//! │  RwLock<Inner>                                     │
//! │   ├─ ids:         Scnl ──► sid                     │
//! │   ├─ channels:    sid  ──► Channel + [WaveSegment] │
//! │   └─ instruments: name ──► Instrument              │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! Sids are handed out sequentially and never reused, so a channel keeps its
//! id for as long as the archive lives.
//!
//! ## Example
//!
//! ```
//! use waveserver::archive::{InMemoryArchive, Scnl, WaveSegment};
//!
//! let archive = InMemoryArchive::new();
//! let sid = archive.add_channel(Scnl::new("AKV", "EHZ", "AV", None)).unwrap();
//! archive.put_wave(sid, WaveSegment::new(1000.0, 100.0, vec![0; 100])).unwrap();
//! ```

use crate::archive::backend::{Archive, ArchiveError, ArchiveResult, RsamDownsample};
use crate::archive::types::{
    Channel, HelicorderMatrix, HelicorderRow, Instrument, RsamSample, RsamSeries, Scnl,
    TimeSpan, WaveSegment, NO_DATA,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Helicorder row interval in seconds.
const HELI_INTERVAL: f64 = 10.0;

/// Helicorder row interval when downsampling.
const HELI_DOWNSAMPLED_INTERVAL: f64 = 60.0;

/// RSAM bucket width at native resolution.
const RSAM_NATIVE_PERIOD: f64 = 1.0;

/// Slack (in samples) when mapping times onto a sample grid.
const GRID_TOLERANCE: f64 = 1e-6;

/// Default cap on the samples one wave request may return.
pub const DEFAULT_MAX_SAMPLES: usize = 10_000_000;

#[derive(Debug)]
struct StoredChannel {
    channel: Channel,
    /// Sorted by start time
    waves: Vec<WaveSegment>,
}

impl StoredChannel {
    fn refresh_span(&mut self) {
        let start = self.waves.iter().map(|w| w.start).fold(f64::INFINITY, f64::min);
        let end = self
            .waves
            .iter()
            .filter(|w| !w.is_empty())
            .map(|w| w.sample_time(w.len() - 1))
            .fold(f64::NEG_INFINITY, f64::max);
        self.channel.span = if start.is_finite() && end.is_finite() {
            Some(TimeSpan::new(start, end))
        } else {
            None
        };
    }

    /// The stored samples inside `span`, one piece per overlapping segment,
    /// in start order.
    fn clipped(&self, span: TimeSpan) -> Vec<WaveSegment> {
        self.waves.iter().filter_map(|w| w.slice(span)).collect()
    }

    /// Samples on the grid of the earliest piece inside `span`, gaps set to
    /// `NO_DATA`, at most `max_samples` long.
    fn extract(&self, span: TimeSpan, max_samples: usize) -> Option<WaveSegment> {
        let pieces = self.clipped(span);
        let first = pieces.iter().min_by(|a, b| a.start.total_cmp(&b.start))?;

        let rate = first.sampling_rate;
        let anchor = first.start;
        let data_end = pieces
            .iter()
            .map(|w| w.sample_time(w.len() - 1))
            .fold(f64::NEG_INFINITY, f64::max);

        let wanted = ((data_end - anchor) * rate + GRID_TOLERANCE).floor() + 1.0;
        let len = if wanted > max_samples as f64 {
            debug!(wanted, max_samples, "Wave request truncated");
            max_samples
        } else {
            wanted as usize
        };
        if len == 0 {
            return None;
        }

        let mut samples = vec![NO_DATA; len];
        let mut skipped = 0usize;
        for piece in &pieces {
            if piece.sampling_rate != rate {
                skipped += 1;
                continue;
            }
            let offset = ((piece.start - anchor) * rate).round() as i64;
            for (j, &sample) in piece.samples.iter().enumerate() {
                let k = offset + j as i64;
                if k >= len as i64 {
                    break;
                }
                if k >= 0 {
                    samples[k as usize] = sample;
                }
            }
        }
        if skipped > 0 {
            debug!(
                channel = %self.channel.scnl,
                rate,
                skipped,
                "Segments at a different sampling rate left as gaps"
            );
        }

        Some(WaveSegment::new(anchor, rate, samples))
    }
}

#[derive(Debug, Default)]
struct Inner {
    ids: HashMap<Scnl, i32>,
    channels: BTreeMap<i32, StoredChannel>,
    instruments: BTreeMap<String, Instrument>,
    next_sid: i32,
}

/// A channel entry in a JSON snapshot.
#[derive(Debug, Deserialize)]
struct SnapshotChannel {
    #[serde(flatten)]
    channel: Channel,
    #[serde(default)]
    waves: Vec<WaveSegment>,
}

/// The JSON document accepted by [`InMemoryArchive::load_snapshot`].
#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    instruments: Vec<Instrument>,
    #[serde(default)]
    channels: Vec<SnapshotChannel>,
}

/// An archive held entirely in memory.
///
/// This struct is designed to be wrapped in an `Arc` and shared through an
/// [`ArchivePool`](crate::archive::ArchivePool). All operations are
/// thread-safe.
pub struct InMemoryArchive {
    inner: RwLock<Inner>,

    /// Cleared to simulate a backend outage
    available: AtomicBool,

    /// Longest wave a single request may return
    max_samples: usize,

    /// Statistics: archive queries served
    query_count: AtomicU64,
}

impl std::fmt::Debug for InMemoryArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryArchive")
            .field("available", &self.available.load(Ordering::Relaxed))
            .field("max_samples", &self.max_samples)
            .field("query_count", &self.query_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for InMemoryArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryArchive {
    /// Creates an empty archive.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_sid: 1,
                ..Default::default()
            }),
            available: AtomicBool::new(true),
            max_samples: DEFAULT_MAX_SAMPLES,
            query_count: AtomicU64::new(0),
        }
    }

    /// Caps the samples a single wave request returns. Longer windows are
    /// cut short at the cap.
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples.max(1);
        self
    }

    /// Creates an archive seeded from a JSON snapshot file.
    pub fn from_snapshot_file(path: impl AsRef<Path>) -> ArchiveResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let archive = Self::new();
        archive.load_snapshot(&json)?;
        Ok(archive)
    }

    /// Loads instruments, channels and waves from a JSON snapshot.
    ///
    /// Sids in the snapshot are ignored; channels get fresh ids in document
    /// order (or keep theirs if the SCNL is already present).
    pub fn load_snapshot(&self, json: &str) -> ArchiveResult<()> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        for instrument in snapshot.instruments {
            self.add_instrument(instrument)?;
        }
        let channels = snapshot.channels.len();
        for entry in snapshot.channels {
            let sid = self.insert_channel(entry.channel)?;
            for wave in entry.waves {
                self.put_wave(sid, wave)?;
            }
        }
        debug!(channels, "Snapshot loaded");
        Ok(())
    }

    fn read(&self) -> ArchiveResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| ArchiveError::Unavailable("archive lock poisoned".to_string()))
    }

    fn write(&self) -> ArchiveResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| ArchiveError::Unavailable("archive lock poisoned".to_string()))
    }

    /// Counts a query and fails it if the archive is marked unavailable.
    fn begin_query(&self) -> ArchiveResult<()> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(ArchiveError::Unavailable("archive offline".to_string()))
        }
    }

    /// Marks the archive as reachable or not. While unavailable every query
    /// fails with [`ArchiveError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// Number of queries served so far.
    pub fn query_count(&self) -> u64 {
        self.query_count.load(Ordering::Relaxed)
    }

    /// Adds or replaces an instrument.
    pub fn add_instrument(&self, instrument: Instrument) -> ArchiveResult<()> {
        let mut inner = self.write()?;
        inner.instruments.insert(instrument.name.clone(), instrument);
        Ok(())
    }

    /// Registers a bare channel and returns its sid.
    pub fn add_channel(&self, scnl: Scnl) -> ArchiveResult<i32> {
        self.insert_channel(Channel::new(0, scnl))
    }

    /// Registers a channel with its descriptive fields and returns its sid.
    ///
    /// If the SCNL already exists its sid is returned unchanged and the
    /// descriptive fields are replaced. The channel's span is always derived
    /// from the stored waves.
    pub fn insert_channel(&self, mut channel: Channel) -> ArchiveResult<i32> {
        channel.scnl = channel.scnl.normalized();
        let mut inner = self.write()?;

        if let Some(&sid) = inner.ids.get(&channel.scnl) {
            if let Some(stored) = inner.channels.get_mut(&sid) {
                channel.sid = sid;
                channel.span = stored.channel.span;
                stored.channel = channel;
            }
            return Ok(sid);
        }

        let sid = inner.next_sid;
        inner.next_sid += 1;
        channel.sid = sid;
        channel.span = None;
        inner.ids.insert(channel.scnl.clone(), sid);
        inner.channels.insert(
            sid,
            StoredChannel {
                channel,
                waves: Vec::new(),
            },
        );
        Ok(sid)
    }

    /// Appends a wave segment to a channel and extends its coverage.
    pub fn put_wave(&self, sid: i32, wave: WaveSegment) -> ArchiveResult<()> {
        let mut inner = self.write()?;
        let stored = inner
            .channels
            .get_mut(&sid)
            .ok_or_else(|| ArchiveError::Query(format!("no channel with sid {}", sid)))?;

        stored.waves.push(wave);
        stored
            .waves
            .sort_by(|a, b| a.start.total_cmp(&b.start));
        stored.refresh_span();
        Ok(())
    }

    /// Returns the number of channels.
    pub fn len(&self) -> usize {
        self.read().map(|inner| inner.channels.len()).unwrap_or(0)
    }

    /// Returns true if the archive holds no channels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn extract(&self, sid: i32, span: TimeSpan) -> ArchiveResult<Option<WaveSegment>> {
        let inner = self.read()?;
        Ok(inner
            .channels
            .get(&sid)
            .and_then(|c| c.extract(span, self.max_samples)))
    }

    fn clipped(&self, sid: i32, span: TimeSpan) -> ArchiveResult<Vec<WaveSegment>> {
        let inner = self.read()?;
        Ok(inner
            .channels
            .get(&sid)
            .map(|c| c.clipped(span))
            .unwrap_or_default())
    }
}

/// Running aggregate of one time bucket.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    min: f64,
    max: f64,
    sum_abs: f64,
    count: u64,
}

impl Bucket {
    fn new(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            sum_abs: value.abs(),
            count: 1,
        }
    }

    fn add(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum_abs += value.abs();
        self.count += 1;
    }
}

/// Aggregates the real samples of `pieces` into `interval`-second buckets
/// aligned on multiples of `interval`.
fn buckets(pieces: &[WaveSegment], interval: f64) -> BTreeMap<i64, Bucket> {
    let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();
    for piece in pieces {
        for (i, &sample) in piece.samples.iter().enumerate() {
            if sample == NO_DATA {
                continue;
            }
            let key = (piece.sample_time(i) / interval).floor() as i64;
            let value = f64::from(sample);
            buckets
                .entry(key)
                .and_modify(|b| b.add(value))
                .or_insert_with(|| Bucket::new(value));
        }
    }
    buckets
}

#[async_trait]
impl Archive for InMemoryArchive {
    async fn channel_id(&self, scnl: &Scnl) -> ArchiveResult<Option<i32>> {
        self.begin_query()?;
        Ok(self.read()?.ids.get(scnl).copied())
    }

    async fn coverage(&self, sid: i32) -> ArchiveResult<Option<TimeSpan>> {
        self.begin_query()?;
        Ok(self
            .read()?
            .channels
            .get(&sid)
            .and_then(|c| c.channel.span))
    }

    async fn wave(&self, sid: i32, span: TimeSpan) -> ArchiveResult<Option<WaveSegment>> {
        self.begin_query()?;
        self.extract(sid, span)
    }

    async fn helicorder(
        &self,
        sid: i32,
        span: TimeSpan,
        downsample: bool,
    ) -> ArchiveResult<Option<HelicorderMatrix>> {
        self.begin_query()?;
        let interval = if downsample {
            HELI_DOWNSAMPLED_INTERVAL
        } else {
            HELI_INTERVAL
        };

        let rows: Vec<HelicorderRow> = buckets(&self.clipped(sid, span)?, interval)
            .into_iter()
            .map(|(key, bucket)| HelicorderRow {
                time: key as f64 * interval,
                min: bucket.min,
                max: bucket.max,
            })
            .collect();

        Ok(if rows.is_empty() {
            None
        } else {
            Some(HelicorderMatrix { rows })
        })
    }

    async fn rsam(
        &self,
        sid: i32,
        span: TimeSpan,
        downsample: RsamDownsample,
    ) -> ArchiveResult<Option<RsamSeries>> {
        self.begin_query()?;
        let period = match downsample {
            RsamDownsample::None => RSAM_NATIVE_PERIOD,
            RsamDownsample::Mean(seconds) => f64::from(seconds),
        };

        let samples: Vec<RsamSample> = buckets(&self.clipped(sid, span)?, period)
            .into_iter()
            .map(|(key, bucket)| RsamSample {
                time: key as f64 * period,
                value: bucket.sum_abs / bucket.count as f64,
            })
            .collect();

        Ok(if samples.is_empty() {
            None
        } else {
            Some(RsamSeries { samples })
        })
    }

    async fn find_gaps(&self, scnl: &Scnl, span: TimeSpan) -> ArchiveResult<Vec<TimeSpan>> {
        self.begin_query()?;
        let pieces = {
            let inner = self.read()?;
            inner
                .ids
                .get(scnl)
                .and_then(|sid| inner.channels.get(sid))
                .map(|c| c.clipped(span))
                .unwrap_or_default()
        };

        let mut gaps = Vec::new();
        let mut cursor = span.start;
        for piece in &pieces {
            let dt = 1.0 / piece.sampling_rate;
            for (i, &sample) in piece.samples.iter().enumerate() {
                if sample == NO_DATA {
                    continue;
                }
                let t = piece.sample_time(i);
                if t - cursor > GRID_TOLERANCE {
                    gaps.push(TimeSpan::new(cursor, t));
                }
                cursor = cursor.max(t + dt);
            }
        }
        if span.end - cursor > GRID_TOLERANCE {
            gaps.push(TimeSpan::new(cursor, span.end));
        }
        Ok(gaps)
    }

    async fn list_channels(&self, with_metadata: bool) -> ArchiveResult<Vec<Channel>> {
        self.begin_query()?;
        let inner = self.read()?;
        Ok(inner
            .channels
            .values()
            .map(|stored| {
                let mut channel = stored.channel.clone();
                if !with_metadata {
                    channel.groups.clear();
                    channel.metadata.clear();
                }
                channel
            })
            .collect())
    }

    async fn list_instruments(&self) -> ArchiveResult<Vec<Instrument>> {
        self.begin_query()?;
        Ok(self.read()?.instruments.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn akv() -> Scnl {
        Scnl::new("AKV", "EHZ", "AV", None)
    }

    fn archive_with_wave() -> (InMemoryArchive, i32) {
        let archive = InMemoryArchive::new();
        let sid = archive.add_channel(akv()).unwrap();
        // 100 s at 1 Hz, values 0..100
        archive
            .put_wave(sid, WaveSegment::new(1000.0, 1.0, (0..100).collect()))
            .unwrap();
        (archive, sid)
    }

    #[tokio::test]
    async fn test_sids_are_stable() {
        let archive = InMemoryArchive::new();
        let a = archive.add_channel(akv()).unwrap();
        let b = archive
            .add_channel(Scnl::new("AKV", "EHZ", "AV", Some("00")))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(archive.add_channel(akv()).unwrap(), a);
        assert_eq!(archive.channel_id(&akv()).await.unwrap(), Some(a));
        assert_eq!(
            archive
                .channel_id(&Scnl::scn("XX", "EHZ", "AV"))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_placeholder_location_is_normalized() {
        let archive = InMemoryArchive::new();
        let raw = Scnl {
            station: "AKV".to_string(),
            channel: "EHZ".to_string(),
            network: "AV".to_string(),
            location: Some("--".to_string()),
        };
        let sid = archive.insert_channel(Channel::new(0, raw)).unwrap();

        assert_eq!(archive.channel_id(&akv()).await.unwrap(), Some(sid));
        assert_eq!(archive.add_channel(akv()).unwrap(), sid);
        assert_eq!(archive.list_channels(false).await.unwrap()[0].scnl, akv());
    }

    #[tokio::test]
    async fn test_coverage_tracks_waves() {
        let (archive, sid) = archive_with_wave();
        assert_eq!(
            archive.coverage(sid).await.unwrap(),
            Some(TimeSpan::new(1000.0, 1099.0))
        );

        archive
            .put_wave(sid, WaveSegment::new(500.0, 1.0, vec![1, 2, 3]))
            .unwrap();
        assert_eq!(
            archive.coverage(sid).await.unwrap(),
            Some(TimeSpan::new(500.0, 1099.0))
        );
    }

    #[tokio::test]
    async fn test_channel_without_data_has_no_coverage() {
        let archive = InMemoryArchive::new();
        let sid = archive.add_channel(akv()).unwrap();
        assert_eq!(archive.coverage(sid).await.unwrap(), None);
        assert!(archive
            .wave(sid, TimeSpan::new(0.0, 10.0))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_wave_extraction() {
        let (archive, sid) = archive_with_wave();
        let wave = archive
            .wave(sid, TimeSpan::new(1010.0, 1014.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(wave.start, 1010.0);
        assert_eq!(wave.samples, vec![10, 11, 12, 13, 14]);
    }

    #[tokio::test]
    async fn test_wave_fills_gaps() {
        let archive = InMemoryArchive::new();
        let sid = archive.add_channel(akv()).unwrap();
        archive
            .put_wave(sid, WaveSegment::new(0.0, 1.0, vec![1, 2]))
            .unwrap();
        archive
            .put_wave(sid, WaveSegment::new(5.0, 1.0, vec![6, 7]))
            .unwrap();

        let wave = archive
            .wave(sid, TimeSpan::new(0.0, 6.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(wave.samples, vec![1, 2, NO_DATA, NO_DATA, NO_DATA, 6, 7]);
    }

    #[tokio::test]
    async fn test_sparse_segments_are_capped() {
        let archive = InMemoryArchive::new().with_max_samples(1000);
        let sid = archive.add_channel(akv()).unwrap();
        // 100 Hz, two samples each, 10^8 s apart
        archive
            .put_wave(sid, WaveSegment::new(0.0, 100.0, vec![1, 2]))
            .unwrap();
        archive
            .put_wave(sid, WaveSegment::new(1e8, 100.0, vec![3, 4]))
            .unwrap();
        let span = TimeSpan::new(0.0, 1e8 + 1.0);

        let wave = archive.wave(sid, span).await.unwrap().unwrap();
        assert_eq!(wave.len(), 1000);
        assert_eq!(wave.start, 0.0);
        assert_eq!(&wave.samples[..3], &[1, 2, NO_DATA]);

        // Products aggregate the stored samples, never the gap
        let heli = archive
            .helicorder(sid, span, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(heli.rows.len(), 2);
        assert_eq!(heli.rows[1].max, 4.0);

        let gaps = archive.find_gaps(&akv(), span).await.unwrap();
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].start, 0.02);
        assert_eq!(gaps[0].end, 1e8);
    }

    #[tokio::test]
    async fn test_other_rate_segments_become_gaps() {
        let archive = InMemoryArchive::new();
        let sid = archive.add_channel(akv()).unwrap();
        archive
            .put_wave(sid, WaveSegment::new(0.0, 1.0, vec![1, 2, 3, 4, 5]))
            .unwrap();
        archive
            .put_wave(sid, WaveSegment::new(10.0, 10.0, vec![7; 10]))
            .unwrap();

        let wave = archive
            .wave(sid, TimeSpan::new(0.0, 11.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(wave.sampling_rate, 1.0);
        assert_eq!(&wave.samples[..5], &[1, 2, 3, 4, 5]);
        assert!(wave.samples[5..].iter().all(|&s| s == NO_DATA));

        // The helicorder still sees them
        let heli = archive
            .helicorder(sid, TimeSpan::new(0.0, 11.0), false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(heli.rows.len(), 2);
        assert_eq!(heli.rows[1].max, 7.0);
    }

    #[tokio::test]
    async fn test_find_gaps() {
        let archive = InMemoryArchive::new();
        let sid = archive.add_channel(akv()).unwrap();
        archive
            .put_wave(sid, WaveSegment::new(0.0, 1.0, vec![1, 2]))
            .unwrap();
        archive
            .put_wave(sid, WaveSegment::new(5.0, 1.0, vec![6, 7]))
            .unwrap();

        let gaps = archive
            .find_gaps(&akv(), TimeSpan::new(0.0, 10.0))
            .await
            .unwrap();
        assert_eq!(
            gaps,
            vec![TimeSpan::new(2.0, 5.0), TimeSpan::new(7.0, 10.0)]
        );

        let unknown = archive
            .find_gaps(&Scnl::scn("XX", "EHZ", "AV"), TimeSpan::new(0.0, 10.0))
            .await
            .unwrap();
        assert_eq!(unknown, vec![TimeSpan::new(0.0, 10.0)]);
    }

    #[tokio::test]
    async fn test_helicorder_buckets() {
        let (archive, sid) = archive_with_wave();
        let heli = archive
            .helicorder(sid, TimeSpan::new(1000.0, 1019.0), false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(heli.rows.len(), 2);
        assert_eq!(
            heli.rows[0],
            HelicorderRow {
                time: 1000.0,
                min: 0.0,
                max: 9.0
            }
        );
        assert_eq!(heli.rows[1].min, 10.0);
        assert_eq!(heli.rows[1].max, 19.0);

        let coarse = archive
            .helicorder(sid, TimeSpan::new(1000.0, 1099.0), true)
            .await
            .unwrap()
            .unwrap();
        // 960..1020 and 1020..1080 and 1080..1140
        assert_eq!(coarse.rows.len(), 3);
    }

    #[tokio::test]
    async fn test_rsam_downsampling() {
        let (archive, sid) = archive_with_wave();
        let native = archive
            .rsam(sid, TimeSpan::new(1000.0, 1009.0), RsamDownsample::None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(native.samples.len(), 10);

        let mean = archive
            .rsam(sid, TimeSpan::new(1000.0, 1009.0), RsamDownsample::Mean(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mean.samples.len(), 1);
        assert_eq!(mean.samples[0].time, 1000.0);
        assert_eq!(mean.samples[0].value, 4.5);
    }

    #[tokio::test]
    async fn test_list_channels_strips_metadata() {
        let archive = InMemoryArchive::new();
        let mut channel = Channel::new(0, akv());
        channel.groups.push("Volcanoes|Akutan".to_string());
        channel.metadata.insert("gain".to_string(), "2".to_string());
        archive.insert_channel(channel).unwrap();

        let bare = archive.list_channels(false).await.unwrap();
        assert!(bare[0].groups.is_empty());
        assert!(bare[0].metadata.is_empty());

        let full = archive.list_channels(true).await.unwrap();
        assert_eq!(full[0].groups.len(), 1);
        assert_eq!(full[0].metadata["gain"], "2");
    }

    #[tokio::test]
    async fn test_outage() {
        let (archive, sid) = archive_with_wave();
        archive.set_available(false);
        assert!(matches!(
            archive.coverage(sid).await,
            Err(ArchiveError::Unavailable(_))
        ));
        archive.set_available(true);
        assert!(archive.coverage(sid).await.is_ok());
        assert_eq!(archive.query_count(), 2);
    }

    #[tokio::test]
    async fn test_load_snapshot() {
        let json = r#"{
            "instruments": [
                {"name": "AKV", "longitude": -165.99, "latitude": 54.13, "height": 400.0,
                 "timezone": "US/Alaska"}
            ],
            "channels": [
                {"scnl": {"station": "AKV", "channel": "EHZ", "network": "AV"},
                 "instrument": "AKV", "unit": "counts",
                 "waves": [{"start": 1000.0, "sampling_rate": 1.0, "samples": [1, 2, 3]}]}
            ]
        }"#;

        let archive = InMemoryArchive::new();
        archive.load_snapshot(json).unwrap();
        assert_eq!(archive.len(), 1);

        let channels = archive.list_channels(true).await.unwrap();
        assert_eq!(channels[0].sid, 1);
        assert_eq!(channels[0].linear_a, 1.0);
        assert_eq!(channels[0].span, Some(TimeSpan::new(1000.0, 1002.0)));
        assert_eq!(archive.list_instruments().await.unwrap()[0].name, "AKV");
    }

    #[test]
    fn test_bad_snapshot() {
        let archive = InMemoryArchive::new();
        assert!(matches!(
            archive.load_snapshot("{not json"),
            Err(ArchiveError::Snapshot(_))
        ));
    }
}
