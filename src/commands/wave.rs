//! Wave Commands
//!
//! Sample dumps for one channel and window.
//!
//! | Verb         | Request tail                      | Reply                          |
//! |--------------|-----------------------------------|--------------------------------|
//! | `GETSCN`     | `S C N t1 t2 fill`                | ASCII samples                  |
//! | `GETSCNL`    | `S C N L t1 t2 fill`              | ASCII samples                  |
//! | `GETSCNLRAW` | `S C N L t1 t2 compress`          | channel header + binary wave   |
//! | `GETWAVERAW` | `S C N L t1 t2 compress`          | `<id>` + binary wave           |
//!
//! GETSCN and GETSCNL share one handler; the only difference is whether the
//! address carries a location.

use crate::archive::{Archive, WaveSegment, NO_DATA};
use crate::commands::handler::{CommandError, Context, Handler};
use crate::commands::request::{ChannelRequest, Framing};
use crate::protocol::encoder::{encode_payload, format_number, format_time};
use crate::protocol::{Command, Failure, Reply, DATA_TYPE};
use async_trait::async_trait;

/// Resolves the window and fetches its samples.
///
/// `Ok(Err(reply))` is a failure-token reply to send as is.
async fn fetch(
    request: &ChannelRequest,
) -> Result<Result<(i32, WaveSegment), Reply>, CommandError> {
    let archive = request.ctx.pool.acquire().await?;
    let (sid, span) = match request.resolve(&*archive).await? {
        Ok(resolved) => resolved,
        Err(reply) => return Ok(Err(reply)),
    };

    Ok(match archive.wave(sid, span).await? {
        Some(wave) if wave.has_data() => Ok((sid, wave)),
        _ => Err(request.failure(sid, Failure::Gap)),
    })
}

fn ascii(cmd: &Command, ctx: &Context, has_location: bool) -> Option<Box<dyn Handler>> {
    let (count, fill_index) = if has_location { (9, 8) } else { (8, 7) };
    let legal = if has_location {
        cmd.is_legal_scnl_times(count)
    } else {
        cmd.is_legal_scn_times(count)
    };
    if !legal {
        return None;
    }
    Some(Box::new(AsciiWave {
        request: ChannelRequest::new(cmd, ctx, Framing::Channel { has_location })?,
        fill: cmd.string(fill_index)?.to_string(),
    }))
}

/// `GETSCN <id> <S> <C> <N> <t1> <t2> <fill>`.
pub fn get_scn(cmd: &Command, ctx: &Context) -> Option<Box<dyn Handler>> {
    ascii(cmd, ctx, false)
}

/// `GETSCNL <id> <S> <C> <N> <L> <t1> <t2> <fill>`.
pub fn get_scnl(cmd: &Command, ctx: &Context) -> Option<Box<dyn Handler>> {
    ascii(cmd, ctx, true)
}

#[derive(Debug)]
struct AsciiWave {
    request: ChannelRequest,
    /// Token printed in place of missing samples
    fill: String,
}

#[async_trait]
impl Handler for AsciiWave {
    fn verb(&self) -> &'static str {
        match self.request.framing {
            Framing::Channel {
                has_location: false,
            } => "GETSCN",
            _ => "GETSCNL",
        }
    }

    fn target(&self) -> String {
        self.request.target()
    }

    async fn execute(&self) -> Result<Reply, CommandError> {
        let (sid, wave) = match fetch(&self.request).await? {
            Ok(found) => found,
            Err(reply) => return Ok(reply),
        };

        let mut line = format!(
            "{} F {} {} {}",
            self.request.header(sid),
            DATA_TYPE,
            format_time(wave.start),
            format_number(wave.sampling_rate)
        );
        line.reserve(wave.len() * 8);
        for &sample in &wave.samples {
            line.push(' ');
            if sample == NO_DATA {
                line.push_str(&self.fill);
            } else {
                line.push_str(&sample.to_string());
            }
        }
        Ok(Reply::Line(line))
    }
}

fn raw(cmd: &Command, ctx: &Context, framing: Framing) -> Option<Box<dyn Handler>> {
    if !cmd.is_legal_scnl_times(9) {
        return None;
    }
    Some(Box::new(RawWave {
        compressed: cmd.flag(8)?,
        request: ChannelRequest::new(cmd, ctx, framing)?,
    }))
}

/// `GETSCNLRAW <id> <S> <C> <N> <L> <t1> <t2> <compress>`.
pub fn get_scnl_raw(cmd: &Command, ctx: &Context) -> Option<Box<dyn Handler>> {
    raw(cmd, ctx, Framing::Channel { has_location: true })
}

/// `GETWAVERAW <id> <S> <C> <N> <L> <t1> <t2> <compress>`.
pub fn get_wave_raw(cmd: &Command, ctx: &Context) -> Option<Box<dyn Handler>> {
    raw(cmd, ctx, Framing::Id)
}

#[derive(Debug)]
struct RawWave {
    request: ChannelRequest,
    compressed: bool,
}

#[async_trait]
impl Handler for RawWave {
    fn verb(&self) -> &'static str {
        match self.request.framing {
            Framing::Channel { .. } => "GETSCNLRAW",
            Framing::Id => "GETWAVERAW",
        }
    }

    fn target(&self) -> String {
        self.request.target()
    }

    async fn execute(&self) -> Result<Reply, CommandError> {
        let (sid, wave) = match fetch(&self.request).await? {
            Ok(found) => found,
            Err(reply) => return Ok(reply),
        };

        let header = match self.request.framing {
            Framing::Channel { .. } => format!(
                "{} F {} {} {}",
                self.request.header(sid),
                DATA_TYPE,
                format_time(wave.start),
                format_time(wave.sample_time(wave.len().saturating_sub(1)))
            ),
            Framing::Id => self.request.header(sid),
        };
        let payload = encode_payload(wave.to_binary(), self.compressed)?;
        Ok(Reply::binary(header, payload))
    }
}
