//! # waveserver - A Wave Server for Seismic Archives
//!
//! waveserver answers the line-oriented wave server protocol spoken by
//! Earthworm and Winston clients: channel menus, metadata listings, raw and
//! ASCII waveform dumps, helicorder matrices and RSAM series, all served from
//! an archive behind an async trait.
//!
//! ## Features
//!
//! - **Wire-Compatible**: Byte-exact replies for legacy Earthworm clients
//! - **Two Epochs**: Wire times since 1970, archive times since J2000, with
//!   sub-millisecond conversions
//! - **Policy**: Retention and embargo clamp every window and every menu
//! - **Async I/O**: Built on Tokio, one task per client connection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             waveserver                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                          ┌────────────────────┼──────────────────┐      │
//! │                          ▼                    ▼                  ▼      │
//! │  ┌─────────────┐  ┌──────────────┐   ┌──────────────┐   ┌────────────┐ │
//! │  │  Command    │  │  Registry    │   │ TimeWindow   │   │ Reply      │ │
//! │  │  Parser     │  │ (keyword ──> │   │ resolver     │   │ encoder    │ │
//! │  │             │  │  factory)    │   │              │   │ (zlib)     │ │
//! │  └─────────────┘  └──────────────┘   └──────┬───────┘   └────────────┘ │
//! │                                             ▼                           │
//! │                     ┌──────────────────────────────────────────────┐   │
//! │                     │  ArchivePool ──> dyn Archive                 │   │
//! │                     │  CatalogCache (TTL)                          │   │
//! │                     └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use waveserver::archive::{ArchivePool, CatalogCache, InMemoryArchive};
//! use waveserver::commands::{CommandHandler, CommandRegistry, Context, Policy};
//! use waveserver::connection::{handle_connection, ConnectionStats};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let archive = Arc::new(InMemoryArchive::from_snapshot_file("archive.json").unwrap());
//!     let ctx = Context {
//!         pool: ArchivePool::new(archive, 8),
//!         policy: Policy::default(),
//!         catalog: Arc::new(CatalogCache::default()),
//!         stats: Arc::new(ConnectionStats::new()),
//!     };
//!     let handler = CommandHandler::new(ctx, Arc::new(CommandRegistry::new()));
//!
//!     let listener = TcpListener::bind("127.0.0.1:16022").await.unwrap();
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         tokio::spawn(handle_connection(stream, addr, handler.clone(), 8192));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `VERSION id`
//! - `MENU id [SCNL]`
//! - `GETCHANNELS id [METADATA]`
//! - `GETMETADATA id INSTRUMENT|CHANNEL`
//! - `GETSCN id S C N t1 t2 fill`
//! - `GETSCNL id S C N L t1 t2 fill`
//! - `GETSCNLRAW id S C N L t1 t2 compress`
//! - `GETWAVERAW id S C N L t1 t2 compress`
//! - `GETSCNLHELIRAW id S C N L t1 t2 compress`
//! - `GETSCNLRSAMRAW id S C N L t1 t2 period compress`
//! - `STATUS id [ageThreshold]`
//!
//! ## Module Overview
//!
//! - [`protocol`]: Line framing, command parsing and reply encoding
//! - [`archive`]: The archive trait, its pool and cache, and an in-memory
//!   backend
//! - [`commands`]: Registry, time window resolution and one handler per verb
//! - [`connection`]: Client connection management
//! - [`config`]: Command-line options
//! - [`time`]: Epoch conversions

pub mod archive;
pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod time;

// Re-export commonly used types for convenience
pub use archive::{Archive, ArchivePool, CatalogCache, InMemoryArchive};
pub use commands::{CommandHandler, CommandRegistry, Context, Policy};
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{Command, ParseError, Reply};

/// The standard wave server port
pub const DEFAULT_PORT: u16 = 16022;

/// The default host waveserver binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Protocol version reported by VERSION and STATUS
pub const PROTOCOL_VERSION: u32 = 3;

/// Version of waveserver
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
