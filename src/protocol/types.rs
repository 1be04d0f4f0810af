//! Wave Server Reply Types
//!
//! This module defines what a handler hands back and how it goes on the wire.
//!
//! ## Framings
//!
//! - **Line**: one ASCII line, `\n` terminated
//! - **Block**: a counted header line `<header> <n>` and `n` lines
//! - **Binary**: `<header> <byteLength>\n` then exactly `byteLength` bytes
//!
//! ## Failure Tokens
//!
//! Protocol-level outcomes replace the payload with a token appended to the
//! reply header:
//!
//! ```text
//! 42 42 0 XX EHZ AV -- FN        unknown channel
//! 42 7 AKV EHZ AV -- FB           end <= start
//! 42 7 AKV EHZ AV -- FL s4 <t>    before the earliest sample
//! 42 7 AKV EHZ AV -- FR s4 <t>    after the latest sample
//! 42 7 AKV EHZ AV -- FG s4        valid window, no data
//! ```

use crate::protocol::encoder::format_time;
use bytes::Bytes;
use std::fmt;

/// Line terminator for every ASCII reply.
pub const NEWLINE: u8 = b'\n';

/// Data type tag advertised for every channel.
pub const DATA_TYPE: &str = "s4";

/// A protocol-level outcome that replaces the payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Failure {
    /// FN: channel unknown
    NoChannel,
    /// FB: end time not after start time
    BadRange,
    /// FL: request ends before the earliest sample (J2000)
    TooEarly(f64),
    /// FR: request starts after the latest sample (J2000)
    TooLate(f64),
    /// FG: window valid but holds no data
    Gap,
}

impl Failure {
    /// The bare two-letter code.
    pub fn code(&self) -> &'static str {
        match self {
            Failure::NoChannel => "FN",
            Failure::BadRange => "FB",
            Failure::TooEarly(_) => "FL",
            Failure::TooLate(_) => "FR",
            Failure::Gap => "FG",
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::NoChannel | Failure::BadRange => f.write_str(self.code()),
            Failure::TooEarly(t) | Failure::TooLate(t) => {
                write!(f, "{} {} {}", self.code(), DATA_TYPE, format_time(*t))
            }
            Failure::Gap => write!(f, "{} {}", self.code(), DATA_TYPE),
        }
    }
}

/// A complete reply, ready to be serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A single line. The terminator is added on serialization.
    Line(String),

    /// `<header> <lines.len()>` followed by one line per entry.
    Block { header: String, lines: Vec<String> },

    /// `<header> <payload.len()>` followed by the raw payload.
    Binary { header: String, payload: Bytes },
}

impl Reply {
    /// Creates a single-line reply.
    pub fn line(s: impl Into<String>) -> Self {
        Reply::Line(s.into())
    }

    /// Creates a counted block reply.
    pub fn block(header: impl Into<String>, lines: Vec<String>) -> Self {
        Reply::Block {
            header: header.into(),
            lines,
        }
    }

    /// Creates a length-prefixed binary reply.
    pub fn binary(header: impl Into<String>, payload: Bytes) -> Self {
        Reply::Binary {
            header: header.into(),
            payload,
        }
    }

    /// `<header> <token>` for a protocol-level failure.
    pub fn failure(header: &str, failure: Failure) -> Self {
        Reply::Line(format!("{} {}", header, failure))
    }

    /// Answer to a newer verb whose fields do not fit its shape.
    pub fn malformed(id: Option<&str>) -> Self {
        match id {
            Some(id) => Reply::Line(format!("{} ERROR: malformed command", id)),
            None => Reply::line("ERROR: malformed command"),
        }
    }

    /// Answer to a keyword with no handler.
    pub fn unsupported(keyword: &str) -> Self {
        Reply::Line(format!("ERROR: unsupported command {}", keyword))
    }

    /// Serializes the reply to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Line(line) => {
                buf.extend_from_slice(line.as_bytes());
                buf.push(NEWLINE);
            }
            Reply::Block { header, lines } => {
                buf.extend_from_slice(header.as_bytes());
                buf.push(b' ');
                buf.extend_from_slice(lines.len().to_string().as_bytes());
                buf.push(NEWLINE);
                for line in lines {
                    buf.extend_from_slice(line.as_bytes());
                    buf.push(NEWLINE);
                }
            }
            Reply::Binary { header, payload } => {
                buf.reserve(header.len() + 16 + payload.len());
                buf.extend_from_slice(header.as_bytes());
                buf.push(b' ');
                buf.extend_from_slice(payload.len().to_string().as_bytes());
                buf.push(NEWLINE);
                buf.extend_from_slice(payload);
            }
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Line(line) => f.write_str(line),
            Reply::Block { header, lines } => write!(f, "{} ({} lines)", header, lines.len()),
            Reply::Binary { header, payload } => {
                write!(f, "{} (binary data, {} bytes)", header, payload.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_tokens() {
        assert_eq!(Failure::NoChannel.to_string(), "FN");
        assert_eq!(Failure::BadRange.to_string(), "FB");
        assert_eq!(Failure::TooEarly(1000.0).to_string(), "FL s4 946729000");
        assert_eq!(Failure::TooLate(2000.5).to_string(), "FR s4 946730000.5");
        assert_eq!(Failure::Gap.to_string(), "FG s4");
    }

    #[test]
    fn test_line_serialize() {
        assert_eq!(Reply::line("PROTOCOL_VERSION: 3").serialize(), b"PROTOCOL_VERSION: 3\n");
    }

    #[test]
    fn test_failure_serialize() {
        let reply = Reply::failure("42 42 0 XX EHZ AV --", Failure::NoChannel);
        assert_eq!(reply.serialize(), b"42 42 0 XX EHZ AV -- FN\n");
    }

    #[test]
    fn test_block_serialize() {
        let reply = Reply::block("7", vec!["a=1".to_string(), "b=2".to_string()]);
        assert_eq!(reply.serialize(), b"7 2\na=1\nb=2\n");

        let empty = Reply::block("7", Vec::new());
        assert_eq!(empty.serialize(), b"7 0\n");
    }

    #[test]
    fn test_binary_serialize() {
        let payload = Bytes::from_static(b"\x00\n\xff\x10");
        let reply = Reply::binary("9", payload);
        assert_eq!(reply.serialize(), b"9 4\n\x00\n\xff\x10");
    }

    #[test]
    fn test_error_replies() {
        assert_eq!(
            Reply::malformed(Some("5")).serialize(),
            b"5 ERROR: malformed command\n"
        );
        assert_eq!(Reply::malformed(None).serialize(), b"ERROR: malformed command\n");
        assert_eq!(
            Reply::unsupported("PUTWAVE").serialize(),
            b"ERROR: unsupported command PUTWAVE\n"
        );
    }
}
