//! Archive Data Model
//!
//! Channels, instruments and the data products the archive hands back to the
//! protocol layer. All times in this module are internal (J2000) seconds;
//! conversion to wire time happens only when a reply is rendered.
//!
//! ## Binary Layouts
//!
//! Every product serializes big-endian:
//!
//! ```text
//! WaveSegment      f64 start | f64 rate | i32 n | n × i32 sample
//! HelicorderMatrix i32 rows  | rows × (f64 time | f64 min | f64 max)
//! RsamSeries       i32 n     | n × (f64 time | f64 value)
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Wire placeholder for "no location code".
pub const NO_LOCATION: &str = "--";

/// Sample value marking a gap inside an otherwise valid wave.
pub const NO_DATA: i32 = i32::MIN;

/// Slack (in samples) when deciding whether a sample lies inside a window.
const SLICE_TOLERANCE: f64 = 1e-6;

/// Station-Channel-Network-Location address of a channel.
///
/// Deserialization goes through [`Scnl::normalized`], so a snapshot that spells
/// "no location" as `--` or `""` yields the same address a request does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "ScnlFields")]
pub struct Scnl {
    pub station: String,
    pub channel: String,
    pub network: String,
    pub location: Option<String>,
}

/// The serialized form of [`Scnl`], before normalization.
#[derive(Deserialize)]
struct ScnlFields {
    station: String,
    channel: String,
    network: String,
    #[serde(default)]
    location: Option<String>,
}

impl From<ScnlFields> for Scnl {
    fn from(fields: ScnlFields) -> Self {
        Scnl {
            station: fields.station,
            channel: fields.channel,
            network: fields.network,
            location: fields.location,
        }
        .normalized()
    }
}

impl Scnl {
    /// Creates an address. An empty location or the `--` placeholder both
    /// mean "no location".
    pub fn new(station: &str, channel: &str, network: &str, location: Option<&str>) -> Self {
        let location = location
            .filter(|l| !l.is_empty() && *l != NO_LOCATION)
            .map(str::to_string);
        Self {
            station: station.to_string(),
            channel: channel.to_string(),
            network: network.to_string(),
            location,
        }
    }

    /// The same address with a `--` or empty location folded to `None`.
    pub fn normalized(self) -> Self {
        match self.location.as_deref() {
            Some(loc) if loc.is_empty() || loc == NO_LOCATION => Self {
                location: None,
                ..self
            },
            _ => self,
        }
    }

    /// Creates a legacy 3-tuple address.
    pub fn scn(station: &str, channel: &str, network: &str) -> Self {
        Self::new(station, channel, network, None)
    }

    /// The location code, or the `--` placeholder.
    pub fn location_or_placeholder(&self) -> &str {
        self.location.as_deref().unwrap_or(NO_LOCATION)
    }

    /// Archive code form: `S$C$N` or `S$C$N$L`.
    pub fn code(&self) -> String {
        match &self.location {
            Some(loc) => format!("{}${}${}${}", self.station, self.channel, self.network, loc),
            None => format!("{}${}${}", self.station, self.channel, self.network),
        }
    }

    /// Space-separated wire form, with or without the location field.
    pub fn wire(&self, has_location: bool) -> String {
        if has_location {
            format!(
                "{} {} {} {}",
                self.station,
                self.channel,
                self.network,
                self.location_or_placeholder()
            )
        } else {
            format!("{} {} {}", self.station, self.channel, self.network)
        }
    }
}

impl fmt::Display for Scnl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// A closed time interval in J2000 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// True when `other` lies entirely inside this span.
    pub fn covers(&self, other: &TimeSpan) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Where and how an instrument is installed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// An archived channel as seen by the protocol layer.
///
/// `sid` is assigned by the archive and stays fixed for as long as the SCNL
/// exists. `span` is `None` until the channel holds at least one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub sid: i32,
    pub scnl: Scnl,
    #[serde(default)]
    pub span: Option<TimeSpan>,
    #[serde(default = "default_linear_a")]
    pub linear_a: f64,
    #[serde(default)]
    pub linear_b: f64,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Name of the instrument this channel is recorded on.
    #[serde(default)]
    pub instrument: Option<String>,
}

fn default_linear_a() -> f64 {
    1.0
}

impl Channel {
    /// A bare channel with identity calibration and no data.
    pub fn new(sid: i32, scnl: Scnl) -> Self {
        Self {
            sid,
            scnl,
            span: None,
            linear_a: 1.0,
            linear_b: 0.0,
            alias: None,
            unit: None,
            groups: Vec::new(),
            metadata: BTreeMap::new(),
            instrument: None,
        }
    }

    pub fn code(&self) -> String {
        self.scnl.code()
    }
}

/// A contiguous run of samples. Gaps are filled with [`NO_DATA`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveSegment {
    pub start: f64,
    pub sampling_rate: f64,
    pub samples: Vec<i32>,
}

impl WaveSegment {
    pub fn new(start: f64, sampling_rate: f64, samples: Vec<i32>) -> Self {
        Self {
            start,
            sampling_rate,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time of the `index`th sample.
    #[inline]
    pub fn sample_time(&self, index: usize) -> f64 {
        self.start + index as f64 / self.sampling_rate
    }

    /// True if at least one sample is real data.
    pub fn has_data(&self) -> bool {
        self.samples.iter().any(|&s| s != NO_DATA)
    }

    /// The samples whose times fall inside `span`, or `None` if there are
    /// none.
    pub fn slice(&self, span: TimeSpan) -> Option<WaveSegment> {
        if self.samples.is_empty() || self.sampling_rate <= 0.0 {
            return None;
        }

        let first = ((span.start - self.start) * self.sampling_rate - SLICE_TOLERANCE)
            .ceil()
            .max(0.0) as usize;
        let last = ((span.end - self.start) * self.sampling_rate + SLICE_TOLERANCE).floor();
        if last < 0.0 {
            return None;
        }
        let last = (last as usize).min(self.samples.len() - 1);
        if first > last {
            return None;
        }

        Some(WaveSegment {
            start: self.sample_time(first),
            sampling_rate: self.sampling_rate,
            samples: self.samples[first..=last].to_vec(),
        })
    }

    pub fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(20 + 4 * self.samples.len());
        buf.put_f64(self.start);
        buf.put_f64(self.sampling_rate);
        buf.put_i32(self.samples.len() as i32);
        for &sample in &self.samples {
            buf.put_i32(sample);
        }
        buf.freeze()
    }
}

/// One helicorder interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelicorderRow {
    pub time: f64,
    pub min: f64,
    pub max: f64,
}

/// Per-interval min/max pairs for strip-chart display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HelicorderMatrix {
    pub rows: Vec<HelicorderRow>,
}

impl HelicorderMatrix {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + 24 * self.rows.len());
        buf.put_i32(self.rows.len() as i32);
        for row in &self.rows {
            buf.put_f64(row.time);
            buf.put_f64(row.min);
            buf.put_f64(row.max);
        }
        buf.freeze()
    }
}

/// One RSAM value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsamSample {
    pub time: f64,
    pub value: f64,
}

/// A (possibly downsampled) amplitude series.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RsamSeries {
    pub samples: Vec<RsamSample>,
}

impl RsamSeries {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + 16 * self.samples.len());
        buf.put_i32(self.samples.len() as i32);
        for sample in &self.samples {
            buf.put_f64(sample.time);
            buf.put_f64(sample.value);
        }
        buf.freeze()
    }
}
