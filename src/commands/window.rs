//! Time Window Resolution
//!
//! Every data verb turns a requested `[t1, t2]` into either a window the
//! archive can serve or one of the FB/FL/FR/FG outcomes. The rules, applied
//! in order:
//!
//! ```text
//! 1. retention  start, coverage start  := max(.., now - maxDays·86400)
//!    embargo    coverage end           := min(.., now - embargo)
//! 2. e <= s                            → BadRange  (FB)
//! 3. no coverage / inverted coverage   → NoData    (FG)
//! 4. e < a                             → TooEarly  (FL a)
//! 5. s > b                             → TooLate   (FR b)
//! 6. otherwise                         → Ok [max(s,a), min(e,b)]
//! ```
//!
//! [`TimeWindow::resolve`] is the pure arithmetic; [`locate`] wires it to the
//! archive (channel lookup, then coverage).

use crate::archive::{Archive, ArchiveResult, Scnl, TimeSpan};
use crate::protocol::Failure;
use crate::time::SECONDS_PER_DAY;
use tracing::trace;

/// Operator retention and embargo policy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Policy {
    /// Days of history that may be served, 0 for unlimited
    pub max_days: u32,
    /// Seconds before now that are withheld, 0 for none
    pub embargo: f64,
}

impl Policy {
    pub fn new(max_days: u32, embargo: f64) -> Self {
        Self { max_days, embargo }
    }

    /// Oldest time that may be reported, if retention is limited.
    pub fn retention_boundary(&self, now: f64) -> Option<f64> {
        (self.max_days > 0).then(|| now - f64::from(self.max_days) * SECONDS_PER_DAY)
    }

    /// Newest time that may be reported, if an embargo is set.
    pub fn embargo_edge(&self, now: f64) -> Option<f64> {
        (self.embargo > 0.0).then(|| now - self.embargo)
    }

    /// Raises `t` to the retention boundary.
    pub fn clamp_earliest(&self, t: f64, now: f64) -> f64 {
        self.retention_boundary(now).map_or(t, |b| t.max(b))
    }

    /// Lowers `t` to the embargo edge.
    pub fn clamp_latest(&self, t: f64, now: f64) -> f64 {
        self.embargo_edge(now).map_or(t, |e| t.min(e))
    }

    /// The part of a channel's coverage that may be served, or `None` if
    /// retention and embargo leave nothing.
    pub fn clamp_coverage(&self, coverage: TimeSpan, now: f64) -> Option<TimeSpan> {
        let start = self.clamp_earliest(coverage.start, now);
        let end = self.clamp_latest(coverage.end, now);
        (start <= end).then(|| TimeSpan::new(start, end))
    }
}

/// The outcome of resolving a requested window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Serve this window
    Ok(TimeSpan),
    /// End not after start
    BadRange,
    /// Request ends before the earliest available sample
    TooEarly { earliest: f64 },
    /// Request starts after the latest available sample
    TooLate { latest: f64 },
    /// Channel has nothing servable
    NoData,
}

impl Resolution {
    /// The wire failure for anything but `Ok`.
    pub fn failure(&self) -> Option<Failure> {
        match *self {
            Resolution::Ok(_) => None,
            Resolution::BadRange => Some(Failure::BadRange),
            Resolution::TooEarly { earliest } => Some(Failure::TooEarly(earliest)),
            Resolution::TooLate { latest } => Some(Failure::TooLate(latest)),
            Resolution::NoData => Some(Failure::Gap),
        }
    }
}

/// A requested window and what it resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub requested: TimeSpan,
    pub resolution: Resolution,
}

impl TimeWindow {
    /// Resolves `requested` against a channel's coverage under `policy`.
    pub fn resolve(
        requested: TimeSpan,
        coverage: Option<TimeSpan>,
        policy: Policy,
        now: f64,
    ) -> Self {
        let resolution = Self::resolution(requested, coverage, policy, now);
        Self {
            requested,
            resolution,
        }
    }

    fn resolution(
        requested: TimeSpan,
        coverage: Option<TimeSpan>,
        policy: Policy,
        now: f64,
    ) -> Resolution {
        if requested.end <= requested.start {
            return Resolution::BadRange;
        }

        let coverage = match coverage.and_then(|c| policy.clamp_coverage(c, now)) {
            Some(c) => c,
            None => return Resolution::NoData,
        };

        let start = policy.clamp_earliest(requested.start, now);
        if requested.end < coverage.start {
            return Resolution::TooEarly {
                earliest: coverage.start,
            };
        }
        if start > coverage.end {
            return Resolution::TooLate {
                latest: coverage.end,
            };
        }

        Resolution::Ok(TimeSpan::new(
            start.max(coverage.start),
            requested.end.min(coverage.end),
        ))
    }

    /// The servable window, if resolution succeeded.
    pub fn resolved(&self) -> Option<TimeSpan> {
        match self.resolution {
            Resolution::Ok(span) => Some(span),
            _ => None,
        }
    }
}

/// A channel lookup plus window resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Located {
    /// Surrogate id, 0 when the channel is unknown
    pub sid: i32,
    pub outcome: Result<TimeSpan, Failure>,
}

/// Finds `scnl` and resolves `requested` against its coverage.
pub async fn locate(
    archive: &dyn Archive,
    scnl: &Scnl,
    requested: TimeSpan,
    policy: Policy,
    now: f64,
) -> ArchiveResult<Located> {
    let sid = match archive.channel_id(scnl).await? {
        Some(sid) => sid,
        None => {
            return Ok(Located {
                sid: 0,
                outcome: Err(Failure::NoChannel),
            })
        }
    };

    let coverage = archive.coverage(sid).await?;
    let window = TimeWindow::resolve(requested, coverage, policy, now);
    trace!(channel = %scnl, sid, requested = %requested, resolution = ?window.resolution, "Window resolved");

    Ok(Located {
        sid,
        outcome: match window.resolution.failure() {
            Some(failure) => Err(failure),
            None => Ok(window.resolved().unwrap_or(requested)),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{InMemoryArchive, WaveSegment};

    const NOW: f64 = 800_000_000.0;

    fn resolve(s: f64, e: f64, a: f64, b: f64) -> Resolution {
        TimeWindow::resolve(
            TimeSpan::new(s, e),
            Some(TimeSpan::new(a, b)),
            Policy::default(),
            NOW,
        )
        .resolution
    }

    #[test]
    fn test_too_early() {
        assert_eq!(
            resolve(500.0, 900.0, 1000.0, 2000.0),
            Resolution::TooEarly { earliest: 1000.0 }
        );
    }

    #[test]
    fn test_bad_range() {
        assert_eq!(resolve(1300.0, 1200.0, 1000.0, 2000.0), Resolution::BadRange);
        assert_eq!(resolve(1200.0, 1200.0, 1000.0, 2000.0), Resolution::BadRange);
    }

    #[test]
    fn test_too_late() {
        assert_eq!(
            resolve(2500.0, 3000.0, 1000.0, 2000.0),
            Resolution::TooLate { latest: 2000.0 }
        );
    }

    #[test]
    fn test_clamped_to_coverage() {
        assert_eq!(
            resolve(900.0, 2100.0, 1000.0, 2000.0),
            Resolution::Ok(TimeSpan::new(1000.0, 2000.0))
        );
        assert_eq!(
            resolve(1200.0, 1300.0, 1000.0, 2000.0),
            Resolution::Ok(TimeSpan::new(1200.0, 1300.0))
        );
    }

    #[test]
    fn test_touching_edges_resolve() {
        assert_eq!(
            resolve(900.0, 1000.0, 1000.0, 2000.0),
            Resolution::Ok(TimeSpan::new(1000.0, 1000.0))
        );
        assert_eq!(
            resolve(2000.0, 2100.0, 1000.0, 2000.0),
            Resolution::Ok(TimeSpan::new(2000.0, 2000.0))
        );
    }

    #[test]
    fn test_no_coverage() {
        let window = TimeWindow::resolve(TimeSpan::new(0.0, 10.0), None, Policy::default(), NOW);
        assert_eq!(window.resolution, Resolution::NoData);
        assert_eq!(window.resolution.failure(), Some(Failure::Gap));
        assert_eq!(window.resolved(), None);
    }

    #[test]
    fn test_resolution_grid() {
        let points = [-50.0, 0.0, 500.0, 999.0, 1000.0, 1500.0, 2000.0, 2001.0, 3000.0];
        let (a, b) = (1000.0, 2000.0);

        for &s in &points {
            for &e in &points {
                let got = resolve(s, e, a, b);
                let expected = if e <= s {
                    Resolution::BadRange
                } else if e < a {
                    Resolution::TooEarly { earliest: a }
                } else if s > b {
                    Resolution::TooLate { latest: b }
                } else {
                    Resolution::Ok(TimeSpan::new(s.max(a), e.min(b)))
                };
                assert_eq!(got, expected, "s={} e={}", s, e);

                if let Resolution::Ok(span) = got {
                    assert!(TimeSpan::new(s, e).covers(&span));
                    assert!(TimeSpan::new(a, b).covers(&span));
                }
            }
        }
    }

    #[test]
    fn test_retention_clamps_start() {
        let policy = Policy::new(1, 0.0);
        let boundary = NOW - SECONDS_PER_DAY;
        let window = TimeWindow::resolve(
            TimeSpan::new(0.0, NOW),
            Some(TimeSpan::new(0.0, NOW)),
            policy,
            NOW,
        );
        assert_eq!(window.resolved(), Some(TimeSpan::new(boundary, NOW)));
    }

    #[test]
    fn test_retention_hides_old_data() {
        let policy = Policy::new(1, 0.0);
        let boundary = NOW - SECONDS_PER_DAY;

        // All data older than the boundary: nothing servable
        let window = TimeWindow::resolve(
            TimeSpan::new(0.0, 100.0),
            Some(TimeSpan::new(0.0, 1000.0)),
            policy,
            NOW,
        );
        assert_eq!(window.resolution, Resolution::NoData);

        // Old request against data straddling the boundary: too early
        let window = TimeWindow::resolve(
            TimeSpan::new(0.0, 100.0),
            Some(TimeSpan::new(0.0, NOW)),
            policy,
            NOW,
        );
        assert_eq!(
            window.resolution,
            Resolution::TooEarly { earliest: boundary }
        );
    }

    #[test]
    fn test_embargo_clamps_end() {
        let policy = Policy::new(0, 600.0);
        let window = TimeWindow::resolve(
            TimeSpan::new(NOW - 3600.0, NOW),
            Some(TimeSpan::new(0.0, NOW)),
            policy,
            NOW,
        );
        assert_eq!(
            window.resolved(),
            Some(TimeSpan::new(NOW - 3600.0, NOW - 600.0))
        );

        let window = TimeWindow::resolve(
            TimeSpan::new(NOW - 60.0, NOW),
            Some(TimeSpan::new(0.0, NOW)),
            policy,
            NOW,
        );
        assert_eq!(
            window.resolution,
            Resolution::TooLate {
                latest: NOW - 600.0
            }
        );
    }

    #[test]
    fn test_policy_clamps() {
        let open = Policy::default();
        assert_eq!(open.retention_boundary(NOW), None);
        assert_eq!(open.embargo_edge(NOW), None);
        assert_eq!(open.clamp_earliest(5.0, NOW), 5.0);

        let policy = Policy::new(2, 30.0);
        assert_eq!(
            policy.retention_boundary(NOW),
            Some(NOW - 2.0 * SECONDS_PER_DAY)
        );
        assert_eq!(policy.clamp_latest(NOW, NOW), NOW - 30.0);
        assert_eq!(policy.clamp_coverage(TimeSpan::new(0.0, 10.0), NOW), None);
    }

    #[tokio::test]
    async fn test_locate() {
        let archive = InMemoryArchive::new();
        let scnl = Scnl::new("AKV", "EHZ", "AV", None);
        let sid = archive.add_channel(scnl.clone()).unwrap();
        archive
            .put_wave(sid, WaveSegment::new(1000.0, 1.0, vec![0; 1001]))
            .unwrap();

        let found = locate(&archive, &scnl, TimeSpan::new(1500.0, 2500.0), Policy::default(), NOW)
            .await
            .unwrap();
        assert_eq!(found.sid, sid);
        assert_eq!(found.outcome, Ok(TimeSpan::new(1500.0, 2000.0)));

        let early = locate(&archive, &scnl, TimeSpan::new(500.0, 900.0), Policy::default(), NOW)
            .await
            .unwrap();
        assert_eq!(early.outcome, Err(Failure::TooEarly(1000.0)));

        let unknown = locate(
            &archive,
            &Scnl::new("XX", "EHZ", "AV", None),
            TimeSpan::new(1300.0, 1200.0),
            Policy::default(),
            NOW,
        )
        .await
        .unwrap();
        assert_eq!(unknown.sid, 0);
        assert_eq!(unknown.outcome, Err(Failure::NoChannel));
    }
}
