//! Command Dispatch
//!
//! This module turns a raw request line into a reply. It parses the line,
//! looks the keyword up in the [`CommandRegistry`], lets the verb's factory
//! build a handler (or report a malformed shape), and runs the handler.
//!
//! ## Request Lifecycle
//!
//! ```text
//! ┌─────────┐   ┌──────────┐   ┌─────────────┐   ┌──────────┐   ┌────────┐
//! │  Parse  │──>│ Registry │──>│  Factory    │──>│ Handler  │──>│ Reply  │
//! └─────────┘   └────┬─────┘   └──────┬──────┘   └────┬─────┘   └────────┘
//!                    │ unknown         │ bad shape     │ backend error
//!                    ▼                 ▼               ▼
//!            ERROR: unsupported   ignore / ERROR:   logged, connection
//!                                 malformed         closed
//! ```

use crate::archive::{ArchiveError, ArchivePool, CatalogCache};
use crate::commands::registry::{CommandRegistry, MalformedPolicy};
use crate::commands::window::Policy;
use crate::connection::ConnectionStats;
use crate::protocol::{Command, ParseError, Reply};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Everything a handler may use, injected at construction.
#[derive(Debug, Clone)]
pub struct Context {
    /// Bounded access to the archive
    pub pool: ArchivePool,
    /// Retention and embargo
    pub policy: Policy,
    /// Shared channel/instrument listings
    pub catalog: Arc<CatalogCache>,
    /// Server-wide connection counters
    pub stats: Arc<ConnectionStats>,
}

/// Errors that abort a request without a reply.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The archive failed or is unreachable
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// A payload could not be encoded
    #[error("encoding error: {0}")]
    Encode(#[from] std::io::Error),
}

/// One request, ready to run.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The verb, for logging.
    fn verb(&self) -> &'static str;

    /// Channel and window this request is about, for logging.
    fn target(&self) -> String {
        String::new()
    }

    /// Runs the request to completion.
    async fn execute(&self) -> Result<Reply, CommandError>;
}

/// Dispatches request lines to per-verb handlers.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    ctx: Context,
    registry: Arc<CommandRegistry>,
}

impl CommandHandler {
    /// Creates a dispatcher over a shared registry.
    pub fn new(ctx: Context, registry: Arc<CommandRegistry>) -> Self {
        Self { ctx, registry }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Executes one request line.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(reply))` - write this reply
    /// - `Ok(None)` - nothing to write (blank line, or a malformed legacy
    ///   command that is dropped silently)
    /// - `Err(e)` - the backend failed; the error has been logged
    pub async fn execute(&self, line: &str) -> Result<Option<Reply>, CommandError> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(ParseError::Empty) => return Ok(None),
            Err(e) => {
                debug!(error = %e, "Unparseable command line");
                return Ok(None);
            }
        };

        let spec = match self.registry.get(command.keyword()) {
            Some(spec) => spec,
            None => {
                debug!(keyword = command.keyword(), "Unsupported command");
                return Ok(Some(Reply::unsupported(command.keyword())));
            }
        };

        let handler = match (spec.factory)(&command, &self.ctx) {
            Some(handler) => handler,
            None => {
                return Ok(match spec.on_malformed {
                    MalformedPolicy::Ignore => {
                        debug!(verb = spec.keyword, line, "Dropping malformed command");
                        None
                    }
                    MalformedPolicy::Reject => {
                        debug!(verb = spec.keyword, line, "Rejecting malformed command");
                        Some(Reply::malformed(command.id()))
                    }
                });
            }
        };

        match handler.execute().await {
            Ok(reply) => Ok(Some(reply)),
            Err(e) => {
                error!(
                    verb = handler.verb(),
                    target = %handler.target(),
                    error = %e,
                    "Request failed"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::archive::{Channel, InMemoryArchive, Instrument, Scnl, WaveSegment};
    use std::time::Duration;

    /// An archive with one channel, AKV EHZ AV --, holding 1 Hz samples
    /// 0..=1000 from t=1000 to t=2000 (J2000).
    pub(crate) fn sample_archive() -> Arc<InMemoryArchive> {
        let archive = Arc::new(InMemoryArchive::new());
        archive
            .add_instrument(Instrument {
                name: "AKV".to_string(),
                longitude: -165.99,
                latitude: 54.13,
                height: 400.0,
                timezone: Some("US/Alaska".to_string()),
                ..Default::default()
            })
            .unwrap();

        let mut channel = Channel::new(0, Scnl::new("AKV", "EHZ", "AV", None));
        channel.instrument = Some("AKV".to_string());
        channel.unit = Some("counts".to_string());
        channel.groups = vec!["Alaska".to_string(), "Akutan".to_string()];
        channel
            .metadata
            .insert("comment".to_string(), "vault, north rim".to_string());
        let sid = archive.insert_channel(channel).unwrap();
        archive
            .put_wave(sid, WaveSegment::new(1000.0, 1.0, (0..=1000).collect()))
            .unwrap();
        archive
    }

    pub(crate) fn context_for(archive: Arc<InMemoryArchive>, policy: Policy) -> Context {
        Context {
            pool: ArchivePool::new(archive, 4),
            policy,
            catalog: Arc::new(CatalogCache::new(Duration::ZERO)),
            stats: Arc::new(ConnectionStats::new()),
        }
    }

    pub(crate) fn dispatcher(archive: Arc<InMemoryArchive>) -> CommandHandler {
        CommandHandler::new(
            context_for(archive, Policy::default()),
            Arc::new(CommandRegistry::new()),
        )
    }

    pub(crate) async fn run(handler: &CommandHandler, line: &str) -> Option<Reply> {
        handler.execute(line).await.unwrap()
    }

    pub(crate) async fn run_line(handler: &CommandHandler, line: &str) -> String {
        match run(handler, line).await {
            Some(Reply::Line(s)) => s,
            other => panic!("expected a line reply to {:?}, got {:?}", line, other),
        }
    }

    #[tokio::test]
    async fn test_blank_line_is_silent() {
        let handler = dispatcher(sample_archive());
        assert_eq!(run(&handler, "").await, None);
        assert_eq!(run(&handler, "  ").await, None);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let handler = dispatcher(sample_archive());
        assert_eq!(
            run_line(&handler, "PUTWAVE 1 foo").await,
            "ERROR: unsupported command PUTWAVE"
        );
    }

    #[tokio::test]
    async fn test_keyword_is_case_sensitive() {
        let handler = dispatcher(sample_archive());
        assert_eq!(
            run_line(&handler, "version 1").await,
            "ERROR: unsupported command version"
        );
    }

    #[tokio::test]
    async fn test_legacy_malformed_is_silent() {
        let handler = dispatcher(sample_archive());
        assert_eq!(run(&handler, "GETSCNL: 1 AKV EHZ AV -- 0").await, None);
        assert_eq!(run(&handler, "GETSCN: 1 AKV EHZ AV x y 0").await, None);
        assert_eq!(run(&handler, "GETSCNLRAW: 1 AKV EHZ AV").await, None);
        assert_eq!(run(&handler, "MENU: 1 SCNL extra").await, None);
    }

    #[tokio::test]
    async fn test_newer_malformed_is_rejected() {
        let handler = dispatcher(sample_archive());
        for line in [
            "GETWAVERAW 1 AKV EHZ AV -- 0",
            "GETSCNLHELIRAW 1 AKV EHZ AV -- a b 0",
            "GETSCNLRSAMRAW 1 AKV EHZ AV -- 0 10 x 0",
            "GETMETADATA 1 STATION",
            "GETCHANNELS 1 VERBOSE",
            "STATUS 1 2 3",
        ] {
            assert_eq!(
                run_line(&handler, line).await,
                "1 ERROR: malformed command",
                "line {:?}",
                line
            );
        }
    }

    #[tokio::test]
    async fn test_doubled_space_is_malformed() {
        let handler = dispatcher(sample_archive());
        assert_eq!(
            run_line(&handler, "GETWAVERAW 1 AKV  EHZ AV -- 946729000 946729010 0").await,
            "1 ERROR: malformed command"
        );
        assert_eq!(
            run(&handler, "GETSCNL: 1 AKV EHZ AV  -- 946729000 946729010 0").await,
            None
        );
    }

    #[tokio::test]
    async fn test_backend_failure_is_an_error() {
        let archive = sample_archive();
        let handler = dispatcher(archive.clone());
        archive.set_available(false);

        let result = handler
            .execute("GETSCNL 1 AKV EHZ AV -- 946729000 946729010 x")
            .await;
        assert!(matches!(result, Err(CommandError::Archive(_))));

        // The pool slot came back
        assert_eq!(handler.context().pool.available(), 4);
    }
}
