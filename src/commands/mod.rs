//! Command Handler Module
//!
//! This module implements the command processing layer of the wave server.
//! It receives request lines, resolves channels and time windows against the
//! archive, and returns replies ready for the wire.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ Command parser  │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Registry     │
//! │  - Validate     │
//! │  - Resolve      │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ ArchivePool     │  (archive module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! ### Server
//! - `VERSION`, `STATUS`
//!
//! ### Catalog
//! - `MENU`, `GETCHANNELS`, `GETMETADATA`
//!
//! ### Waves
//! - `GETSCN`, `GETSCNL`, `GETSCNLRAW`, `GETWAVERAW`
//!
//! ### Derived products
//! - `GETSCNLHELIRAW`, `GETSCNLRSAMRAW`

pub mod catalog;
pub mod handler;
pub mod products;
pub mod registry;
pub mod request;
pub mod server;
pub mod wave;
pub mod window;

// Re-export the main command handler
pub use handler::{CommandError, CommandHandler, Context, Handler};
pub use registry::{CommandRegistry, CommandSpec, MalformedPolicy};
pub use window::{Policy, Resolution, TimeWindow};
