//! Derived Product Commands
//!
//! - `GETSCNLHELIRAW <id> <S> <C> <N> <L> <t1> <t2> <compress>`
//! - `GETSCNLRSAMRAW <id> <S> <C> <N> <L> <t1> <t2> <period> <compress>`
//!
//! Both answer `<id> <byteLength>` followed by the (optionally compressed)
//! binary product, or `<id> <token>` on failure. The archive does the
//! aggregation; these handlers only pick its parameters and frame the result.

use crate::archive::{Archive, RsamDownsample};
use crate::commands::handler::{CommandError, Context, Handler};
use crate::commands::request::{ChannelRequest, Framing};
use crate::protocol::encoder::encode_payload;
use crate::protocol::{Command, Failure, Reply};
use crate::time::SECONDS_PER_DAY;
use async_trait::async_trait;
use tracing::debug;

/// Windows longer than this get the coarser helicorder interval.
const HELI_DOWNSAMPLE_AFTER: f64 = 2.0 * SECONDS_PER_DAY;

/// `GETSCNLHELIRAW`.
pub fn get_helicorder(cmd: &Command, ctx: &Context) -> Option<Box<dyn Handler>> {
    if !cmd.is_legal_scnl_times(9) {
        return None;
    }
    Some(Box::new(Helicorder {
        compressed: cmd.flag(8)?,
        request: ChannelRequest::new(cmd, ctx, Framing::Id)?,
    }))
}

#[derive(Debug)]
struct Helicorder {
    request: ChannelRequest,
    compressed: bool,
}

#[async_trait]
impl Handler for Helicorder {
    fn verb(&self) -> &'static str {
        "GETSCNLHELIRAW"
    }

    fn target(&self) -> String {
        self.request.target()
    }

    async fn execute(&self) -> Result<Reply, CommandError> {
        let archive = self.request.ctx.pool.acquire().await?;
        let (sid, span) = match self.request.resolve(&*archive).await? {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };

        let downsample = span.duration() > HELI_DOWNSAMPLE_AFTER;
        debug!(sid, downsample, "Fetching helicorder");
        let matrix = match archive.helicorder(sid, span, downsample).await? {
            Some(matrix) if !matrix.is_empty() => matrix,
            _ => return Ok(self.request.failure(sid, Failure::Gap)),
        };

        let payload = encode_payload(matrix.to_binary(), self.compressed)?;
        Ok(Reply::binary(self.request.header(sid), payload))
    }
}

/// `GETSCNLRSAMRAW`. A period below 2 seconds means native resolution.
pub fn get_rsam(cmd: &Command, ctx: &Context) -> Option<Box<dyn Handler>> {
    if !cmd.is_legal_scnl_times(10) {
        return None;
    }
    Some(Box::new(Rsam {
        downsample: RsamDownsample::from_period(cmd.int(8)?),
        compressed: cmd.flag(9)?,
        request: ChannelRequest::new(cmd, ctx, Framing::Id)?,
    }))
}

#[derive(Debug)]
struct Rsam {
    request: ChannelRequest,
    downsample: RsamDownsample,
    compressed: bool,
}

#[async_trait]
impl Handler for Rsam {
    fn verb(&self) -> &'static str {
        "GETSCNLRSAMRAW"
    }

    fn target(&self) -> String {
        format!("{} {:?}", self.request.target(), self.downsample)
    }

    async fn execute(&self) -> Result<Reply, CommandError> {
        let archive = self.request.ctx.pool.acquire().await?;
        let (sid, span) = match self.request.resolve(&*archive).await? {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };

        let series = match archive.rsam(sid, span, self.downsample).await? {
            Some(series) if !series.is_empty() => series,
            _ => return Ok(self.request.failure(sid, Failure::Gap)),
        };

        let payload = encode_payload(series.to_binary(), self.compressed)?;
        Ok(Reply::binary(self.request.header(sid), payload))
    }
}
