//! Server Commands
//!
//! - `VERSION <id>` - protocol version
//! - `STATUS <id> [ageThreshold]` - connection count, channel count and the
//!   median age of the newest sample per channel

use crate::commands::handler::{CommandError, Context, Handler};
use crate::protocol::encoder::format_number;
use crate::protocol::{Command, Reply};
use crate::time::now_j2k;
use crate::PROTOCOL_VERSION;
use async_trait::async_trait;
use tracing::debug;

/// `VERSION <id>`. The reply carries no id.
pub fn version(cmd: &Command, _ctx: &Context) -> Option<Box<dyn Handler>> {
    if cmd.len() > 2 {
        return None;
    }
    Some(Box::new(Version))
}

#[derive(Debug)]
struct Version;

#[async_trait]
impl Handler for Version {
    fn verb(&self) -> &'static str {
        "VERSION"
    }

    async fn execute(&self) -> Result<Reply, CommandError> {
        Ok(Reply::Line(format!("PROTOCOL_VERSION: {}", PROTOCOL_VERSION)))
    }
}

/// `STATUS <id> [ageThreshold]`.
///
/// The threshold, in seconds, excludes channels whose newest sample is at
/// least that old from the median. Anything that is not a number means no
/// threshold.
pub fn status(cmd: &Command, ctx: &Context) -> Option<Box<dyn Handler>> {
    if !cmd.is_legal(2) && !cmd.is_legal(3) {
        return None;
    }

    let threshold = match cmd.string(2) {
        None => 0.0,
        Some(raw) => cmd.double(2).unwrap_or_else(|| {
            debug!(threshold = raw, "Non-numeric STATUS threshold, using none");
            0.0
        }),
    };

    Some(Box::new(Status {
        id: cmd.id()?.to_string(),
        threshold,
        ctx: ctx.clone(),
    }))
}

#[derive(Debug)]
struct Status {
    id: String,
    threshold: f64,
    ctx: Context,
}

#[async_trait]
impl Handler for Status {
    fn verb(&self) -> &'static str {
        "STATUS"
    }

    async fn execute(&self) -> Result<Reply, CommandError> {
        let channels = self.ctx.catalog.channels(&self.ctx.pool, false).await?;
        let now = now_j2k();

        let mut ages: Vec<f64> = channels
            .iter()
            .filter_map(|c| c.span)
            .map(|span| now - self.ctx.policy.clamp_latest(span.end, now))
            .filter(|&age| self.threshold <= 0.0 || age < self.threshold)
            .collect();

        let median_age = median(&mut ages).map_or_else(|| "n/a".to_string(), format_number);

        Ok(Reply::block(
            self.id.as_str(),
            vec![
                format!("protocolVersion: {}", PROTOCOL_VERSION),
                format!("connectionCount: {}", self.ctx.stats.active()),
                format!("channelCount: {}", channels.len()),
                format!("medianDataAge: {}", median_age),
            ],
        ))
    }
}

/// Median of `values`, averaging the middle pair for even counts.
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}
