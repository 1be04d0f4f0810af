//! Catalog Commands
//!
//! Listings of what the archive holds. None of these resolve a time window,
//! but MENU and GETCHANNELS report coverage after retention and embargo, so
//! a client never sees a time it would be refused.
//!
//! ```text
//! MENU: 7 SCNL
//! 7 1 AKV EHZ AV -- 946729000 946730000 s4  2 AKS EHZ AV -- ... s4 \n
//!
//! GETCHANNELS 7
//! 7 2
//! 1:AKV$EHZ$AV:946729000:946730000:-165.99:54.13:400:Alaska|Akutan
//! 2:AKS$EHZ$AV::::::
//! ```

use crate::archive::{Channel, Instrument, TimeSpan};
use crate::commands::handler::{CommandError, Context, Handler};
use crate::commands::window::Policy;
use crate::protocol::encoder::{format_number, format_time};
use crate::protocol::escape::pair;
use crate::protocol::{Command, Reply, DATA_TYPE};
use crate::time::now_j2k;
use async_trait::async_trait;
use std::collections::HashMap;

/// `MENU <id> [SCNL]`.
pub fn menu(cmd: &Command, ctx: &Context) -> Option<Box<dyn Handler>> {
    let has_location = match cmd.len() {
        2 => false,
        3 if cmd.string(2) == Some("SCNL") => true,
        _ => return None,
    };
    Some(Box::new(Menu {
        id: cmd.id()?.to_string(),
        has_location,
        ctx: ctx.clone(),
    }))
}

#[derive(Debug)]
struct Menu {
    id: String,
    has_location: bool,
    ctx: Context,
}

/// Channels with servable coverage, sorted by code.
fn servable(channels: &[Channel], policy: &Policy, now: f64) -> Vec<(Channel, TimeSpan)> {
    let mut listed: Vec<(Channel, TimeSpan)> = channels
        .iter()
        .filter_map(|c| {
            let span = policy.clamp_coverage(c.span?, now)?;
            Some((c.clone(), span))
        })
        .collect();
    listed.sort_by(|a, b| a.0.code().cmp(&b.0.code()));
    listed
}

#[async_trait]
impl Handler for Menu {
    fn verb(&self) -> &'static str {
        if self.has_location {
            "MENU SCNL"
        } else {
            "MENU"
        }
    }

    async fn execute(&self) -> Result<Reply, CommandError> {
        let channels = self.ctx.catalog.channels(&self.ctx.pool, false).await?;

        let mut line = self.id.clone();
        for (channel, span) in servable(&channels, &self.ctx.policy, now_j2k()) {
            line.push_str(&format!(
                " {} {} {} {} {} ",
                channel.sid,
                channel.scnl.wire(self.has_location),
                format_time(span.start),
                format_time(span.end),
                DATA_TYPE
            ));
        }
        Ok(Reply::Line(line))
    }
}

/// `GETCHANNELS <id> [METADATA]`.
pub fn get_channels(cmd: &Command, ctx: &Context) -> Option<Box<dyn Handler>> {
    let verbose = match cmd.len() {
        2 => false,
        3 if cmd.string(2) == Some("METADATA") => true,
        _ => return None,
    };
    Some(Box::new(GetChannels {
        id: cmd.id()?.to_string(),
        verbose,
        ctx: ctx.clone(),
    }))
}

#[derive(Debug)]
struct GetChannels {
    id: String,
    verbose: bool,
    ctx: Context,
}

impl GetChannels {
    fn render(
        &self,
        channel: &Channel,
        instrument: Option<&Instrument>,
        coverage: Option<TimeSpan>,
    ) -> String {
        let (earliest, latest) = coverage
            .map(|span| (format_time(span.start), format_time(span.end)))
            .unwrap_or_default();
        let (lon, lat, height) = instrument
            .map(|i| {
                (
                    format_number(i.longitude),
                    format_number(i.latitude),
                    format_number(i.height),
                )
            })
            .unwrap_or_default();

        let mut line = format!(
            "{}:{}:{}:{}:{}:{}:{}:{}",
            channel.sid,
            channel.code(),
            earliest,
            latest,
            lon,
            lat,
            height,
            channel.groups.join("|")
        );

        if self.verbose {
            let metadata = channel
                .metadata
                .iter()
                .map(|(k, v)| pair(k, v))
                .collect::<Vec<_>>()
                .join(",");
            line.push_str(&format!(
                ":{}:{}:{}:{}:{}",
                channel.alias.as_deref().unwrap_or_default(),
                channel.unit.as_deref().unwrap_or_default(),
                format_number(channel.linear_a),
                format_number(channel.linear_b),
                metadata
            ));
        }
        line
    }
}

#[async_trait]
impl Handler for GetChannels {
    fn verb(&self) -> &'static str {
        "GETCHANNELS"
    }

    async fn execute(&self) -> Result<Reply, CommandError> {
        let channels = self.ctx.catalog.channels(&self.ctx.pool, true).await?;
        let instruments = self.ctx.catalog.instruments(&self.ctx.pool).await?;
        let by_name: HashMap<&str, &Instrument> =
            instruments.iter().map(|i| (i.name.as_str(), i)).collect();
        let now = now_j2k();

        let lines = channels
            .iter()
            .map(|channel| {
                let instrument = channel
                    .instrument
                    .as_deref()
                    .and_then(|name| by_name.get(name).copied());
                let coverage = channel
                    .span
                    .and_then(|span| self.ctx.policy.clamp_coverage(span, now));
                self.render(channel, instrument, coverage)
            })
            .collect();

        Ok(Reply::block(self.id.as_str(), lines))
    }
}

/// Which records GETMETADATA lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetadataKind {
    Instrument,
    Channel,
}

/// `GETMETADATA <id> INSTRUMENT|CHANNEL`.
pub fn get_metadata(cmd: &Command, ctx: &Context) -> Option<Box<dyn Handler>> {
    if !cmd.is_legal(3) {
        return None;
    }
    let kind = match cmd.string(2)? {
        "INSTRUMENT" => MetadataKind::Instrument,
        "CHANNEL" => MetadataKind::Channel,
        _ => return None,
    };
    Some(Box::new(GetMetadata {
        id: cmd.id()?.to_string(),
        kind,
        ctx: ctx.clone(),
    }))
}

#[derive(Debug)]
struct GetMetadata {
    id: String,
    kind: MetadataKind,
    ctx: Context,
}

fn record(pairs: Vec<String>) -> String {
    pairs.join(",")
}

fn instrument_record(instrument: &Instrument) -> String {
    let mut pairs = vec![
        pair("name", &instrument.name),
        pair("longitude", &format_number(instrument.longitude)),
        pair("latitude", &format_number(instrument.latitude)),
        pair("height", &format_number(instrument.height)),
        pair("timezone", instrument.timezone.as_deref().unwrap_or_default()),
    ];
    pairs.extend(instrument.metadata.iter().map(|(k, v)| pair(k, v)));
    record(pairs)
}

fn channel_record(channel: &Channel) -> String {
    let mut pairs = vec![
        pair("sid", &channel.sid.to_string()),
        pair("channel", &channel.code()),
        pair(
            "instrument",
            channel.instrument.as_deref().unwrap_or_default(),
        ),
        pair("alias", channel.alias.as_deref().unwrap_or_default()),
        pair("unit", channel.unit.as_deref().unwrap_or_default()),
        pair("linearA", &format_number(channel.linear_a)),
        pair("linearB", &format_number(channel.linear_b)),
        pair("groups", &channel.groups.join(",")),
    ];
    pairs.extend(channel.metadata.iter().map(|(k, v)| pair(k, v)));
    record(pairs)
}

#[async_trait]
impl Handler for GetMetadata {
    fn verb(&self) -> &'static str {
        match self.kind {
            MetadataKind::Instrument => "GETMETADATA INSTRUMENT",
            MetadataKind::Channel => "GETMETADATA CHANNEL",
        }
    }

    async fn execute(&self) -> Result<Reply, CommandError> {
        let lines = match self.kind {
            MetadataKind::Instrument => {
                let instruments = self.ctx.catalog.instruments(&self.ctx.pool).await?;
                instruments.iter().map(instrument_record).collect()
            }
            MetadataKind::Channel => {
                let channels = self.ctx.catalog.channels(&self.ctx.pool, true).await?;
                channels.iter().map(channel_record).collect()
            }
        };
        Ok(Reply::block(self.id.as_str(), lines))
    }
}
