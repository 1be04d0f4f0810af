//! Epoch Conversions
//!
//! The wire speaks Earthworm time: seconds since 1970-01-01 00:00:00 UTC.
//! The archive keys everything on J2000 seconds: seconds since
//! 2000-01-01 12:00:00 UTC. The two differ by a whole number of seconds, so
//! converting is a single addition and never rounds to anything coarser than
//! the `f64` ulp at the value (well under a microsecond for any date the
//! archive can hold).
//!
//! ```text
//!   1970-01-01 00:00:00        2000-01-01 12:00:00              now
//!        │◄──── 946 728 000 s ────►│
//!        │ wire (ew) = 0            │ internal (j2k) = 0
//! ```

use chrono::{DateTime, Utc};

/// Seconds from the wire epoch to the internal epoch.
pub const J2K_OFFSET: f64 = 946_728_000.0;

/// Seconds in a day, used by the retention window.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Converts wire (1970) seconds to internal (J2000) seconds.
#[inline]
pub fn ew_to_j2k(ew: f64) -> f64 {
    ew - J2K_OFFSET
}

/// Converts internal (J2000) seconds to wire (1970) seconds.
#[inline]
pub fn j2k_to_ew(j2k: f64) -> f64 {
    j2k + J2K_OFFSET
}

/// Converts a UTC timestamp to J2000 seconds with microsecond resolution.
pub fn datetime_to_j2k(dt: DateTime<Utc>) -> f64 {
    let ew = dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_micros()) / 1e6;
    ew_to_j2k(ew)
}

/// The current wall-clock time in J2000 seconds.
pub fn now_j2k() -> f64 {
    datetime_to_j2k(Utc::now())
}
