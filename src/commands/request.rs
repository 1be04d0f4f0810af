//! Channel Requests
//!
//! The part every data verb shares: an id to echo, a channel address, a
//! requested window, and a rule for how reply headers are framed. A request
//! resolves its window against the archive before the verb fetches its own
//! product.

use crate::archive::{Archive, Scnl, TimeSpan};
use crate::commands::handler::{CommandError, Context};
use crate::commands::window::locate;
use crate::protocol::{Command, Failure, Reply};
use crate::time::now_j2k;

/// How reply headers of a data verb start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `<id> <pin> <S> <C> <N> [<L>]`
    Channel { has_location: bool },
    /// `<id>`
    Id,
}

impl Framing {
    /// Whether the request line carries a location field.
    pub fn has_location(&self) -> bool {
        match *self {
            Framing::Channel { has_location } => has_location,
            Framing::Id => true,
        }
    }
}

/// A parsed channel-and-window request.
#[derive(Debug)]
pub struct ChannelRequest {
    pub id: String,
    pub scnl: Scnl,
    /// Internal (J2000) seconds
    pub requested: TimeSpan,
    pub framing: Framing,
    pub ctx: Context,
}

impl ChannelRequest {
    /// Reads the id, address and window. Shape checks are the caller's.
    pub fn new(cmd: &Command, ctx: &Context, framing: Framing) -> Option<Self> {
        let has_location = framing.has_location();
        let time_index = if has_location { 6 } else { 5 };
        Some(Self {
            id: cmd.id()?.to_string(),
            scnl: cmd.address(has_location)?,
            requested: cmd.time_span(time_index)?,
            framing,
            ctx: ctx.clone(),
        })
    }

    /// Reply header up to, not including, the payload or failure token.
    pub fn header(&self, sid: i32) -> String {
        match self.framing {
            Framing::Channel { has_location } => {
                format!("{} {} {}", self.id, sid, self.scnl.wire(has_location))
            }
            Framing::Id => self.id.clone(),
        }
    }

    /// Channel and window, for logging.
    pub fn target(&self) -> String {
        format!("{} {}", self.scnl, self.requested)
    }

    /// `<header> <token>`.
    ///
    /// Channel-framed FN replies repeat the id: `<id> <id> 0 <S> <C> <N>
    /// [<L>] FN`.
    pub fn failure(&self, sid: i32, failure: Failure) -> Reply {
        match (self.framing, failure) {
            (Framing::Channel { .. }, Failure::NoChannel) => {
                Reply::failure(&format!("{} {}", self.id, self.header(sid)), failure)
            }
            _ => Reply::failure(&self.header(sid), failure),
        }
    }

    /// Finds the channel and resolves the window.
    ///
    /// `Ok(Err(reply))` is a failure-token reply to send as is.
    pub async fn resolve(
        &self,
        archive: &dyn Archive,
    ) -> Result<Result<(i32, TimeSpan), Reply>, CommandError> {
        let located = locate(
            archive,
            &self.scnl,
            self.requested,
            self.ctx.policy,
            now_j2k(),
        )
        .await?;

        Ok(match located.outcome {
            Ok(span) => Ok((located.sid, span)),
            Err(failure) => Err(self.failure(located.sid, failure)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handler::tests::{context_for, sample_archive};
    use crate::commands::window::Policy;

    fn request(line: &str, framing: Framing) -> ChannelRequest {
        let ctx = context_for(sample_archive(), Policy::default());
        ChannelRequest::new(&Command::parse(line).unwrap(), &ctx, framing).unwrap()
    }

    #[test]
    fn test_headers() {
        let scn = request(
            "GETSCN 3 AKV EHZ AV 946729000 946729010 x",
            Framing::Channel {
                has_location: false,
            },
        );
        assert_eq!(scn.header(7), "3 7 AKV EHZ AV");
        assert_eq!(scn.requested, TimeSpan::new(1000.0, 1010.0));

        let scnl = request(
            "GETSCNL 3 AKV EHZ AV 00 946729000 946729010 x",
            Framing::Channel { has_location: true },
        );
        assert_eq!(scnl.header(7), "3 7 AKV EHZ AV 00");

        let raw = request("GETWAVERAW 3 AKV EHZ AV -- 946729000 946729010 0", Framing::Id);
        assert_eq!(raw.header(7), "3");
        assert_eq!(raw.failure(7, Failure::Gap), Reply::line("3 FG s4"));
    }

    #[tokio::test]
    async fn test_resolve() {
        let archive = sample_archive();
        let req = request(
            "GETSCNL 3 AKV EHZ AV -- 946729500 946731000 x",
            Framing::Channel { has_location: true },
        );
        let resolved = req.resolve(archive.as_ref()).await.unwrap();
        assert_eq!(resolved, Ok((1, TimeSpan::new(1500.0, 2000.0))));

        let req = request(
            "GETSCNL 3 AKS EHZ AV -- 946729500 946731000 x",
            Framing::Channel { has_location: true },
        );
        let resolved = req.resolve(archive.as_ref()).await.unwrap();
        assert_eq!(resolved, Err(Reply::line("3 3 0 AKS EHZ AV -- FN")));
    }
}
