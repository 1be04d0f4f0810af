//! Wave Server Protocol Implementation
//!
//! This module implements the line-oriented protocol spoken by Earthworm and
//! Winston wave server clients.
//!
//! ## Overview
//!
//! Requests are single ASCII lines: a keyword, a request id, then positional
//! fields. Replies echo the request id and are either ASCII lines or a header
//! line announcing a byte count followed by that many raw bytes.
//!
//! ## Modules
//!
//! - `parser`: Line framing and the `Command` tokenizer
//! - `types`: The `Reply` framings and failure tokens
//! - `encoder`: Number rendering and payload compression
//! - `escape`: Metadata record escaping
//!
//! ## Example
//!
//! ```
//! use waveserver::protocol::{Command, Reply};
//!
//! let cmd = Command::parse("VERSION 1").unwrap();
//! assert_eq!(cmd.keyword(), "VERSION");
//!
//! let bytes = Reply::line("PROTOCOL_VERSION: 3").serialize();
//! assert_eq!(bytes, b"PROTOCOL_VERSION: 3\n");
//! ```

pub mod encoder;
pub mod escape;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{split_line, Command, ParseError, ParseResult, MAX_LINE_LENGTH};
pub use types::{Failure, Reply, DATA_TYPE};
