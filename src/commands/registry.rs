//! Command Registry
//!
//! A fixed table from keyword to handler factory. Each entry also records
//! what happens when a command does not fit its verb's shape: Earthworm-era
//! verbs drop it without a word, Winston-era verbs answer
//! `<id> ERROR: malformed command`.
//!
//! | Keyword          | Factory                       | Malformed |
//! |------------------|-------------------------------|-----------|
//! | `VERSION`        | [`server::version`]           | reject    |
//! | `STATUS`         | [`server::status`]            | reject    |
//! | `MENU`           | [`catalog::menu`]             | ignore    |
//! | `GETCHANNELS`    | [`catalog::get_channels`]     | reject    |
//! | `GETMETADATA`    | [`catalog::get_metadata`]     | reject    |
//! | `GETSCN`         | [`wave::get_scn`]             | ignore    |
//! | `GETSCNL`        | [`wave::get_scnl`]            | ignore    |
//! | `GETSCNLRAW`     | [`wave::get_scnl_raw`]        | ignore    |
//! | `GETWAVERAW`     | [`wave::get_wave_raw`]        | reject    |
//! | `GETSCNLHELIRAW` | [`products::get_helicorder`]  | reject    |
//! | `GETSCNLRSAMRAW` | [`products::get_rsam`]        | reject    |

use crate::commands::handler::{Context, Handler};
use crate::commands::{catalog, products, server, wave};
use crate::protocol::Command;
use std::collections::HashMap;

/// Builds a handler for one request, or `None` if the command is malformed.
pub type HandlerFactory = fn(&Command, &Context) -> Option<Box<dyn Handler>>;

/// What to do with a command that does not fit its verb's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Drop it and send nothing
    Ignore,
    /// Answer `<id> ERROR: malformed command`
    Reject,
}

/// One verb.
#[derive(Clone, Copy)]
pub struct CommandSpec {
    pub keyword: &'static str,
    pub on_malformed: MalformedPolicy,
    pub factory: HandlerFactory,
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("keyword", &self.keyword)
            .field("on_malformed", &self.on_malformed)
            .finish()
    }
}

const fn spec(
    keyword: &'static str,
    on_malformed: MalformedPolicy,
    factory: HandlerFactory,
) -> CommandSpec {
    CommandSpec {
        keyword,
        on_malformed,
        factory,
    }
}

/// Every supported verb.
pub const COMMANDS: &[CommandSpec] = &[
    spec("VERSION", MalformedPolicy::Reject, server::version),
    spec("STATUS", MalformedPolicy::Reject, server::status),
    spec("MENU", MalformedPolicy::Ignore, catalog::menu),
    spec("GETCHANNELS", MalformedPolicy::Reject, catalog::get_channels),
    spec("GETMETADATA", MalformedPolicy::Reject, catalog::get_metadata),
    spec("GETSCN", MalformedPolicy::Ignore, wave::get_scn),
    spec("GETSCNL", MalformedPolicy::Ignore, wave::get_scnl),
    spec("GETSCNLRAW", MalformedPolicy::Ignore, wave::get_scnl_raw),
    spec("GETWAVERAW", MalformedPolicy::Reject, wave::get_wave_raw),
    spec("GETSCNLHELIRAW", MalformedPolicy::Reject, products::get_helicorder),
    spec("GETSCNLRSAMRAW", MalformedPolicy::Reject, products::get_rsam),
];

/// Keyword lookup over [`COMMANDS`].
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    by_keyword: HashMap<&'static str, CommandSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            by_keyword: COMMANDS.iter().map(|spec| (spec.keyword, *spec)).collect(),
        }
    }

    /// The entry for `keyword`. Matching is case-sensitive.
    pub fn get(&self, keyword: &str) -> Option<&CommandSpec> {
        self.by_keyword.get(keyword)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
