//! Wave Server Command Parser
//!
//! Commands are single lines of space-separated tokens:
//!
//! ```text
//! GETSCNL: 42 AKV EHZ AV -- 1262304000 1262304060 -2147483648\n
//! └──┬──┘  └┬┘ └────┬────┘ └┬┘ └─────────┬─────────┘ └───┬───┘
//!  keyword  id   S  C  N    L        t1 t2            fill
//!  field 0   1   2  3  4    5        6  7              8
//! ```
//!
//! The keyword loses a trailing colon (Earthworm clients send `MENU:`), the
//! request id is kept verbatim so it can be echoed, and everything after that
//! is positional. Whether a command has the right shape for its verb is
//! decided by the handler, using the legality predicates here.
//!
//! Tokens are split on single spaces. A doubled space yields an empty field,
//! so the line fails its verb's field count. Trailing spaces are dropped.
//!
//! ## Line Framing
//!
//! [`split_line`] follows the same contract as a streaming parser:
//! - `Ok(Some((line, consumed)))` - a full line, `consumed` bytes were used
//! - `Ok(None)` - no newline yet, read more
//! - `Err(ParseError)` - the line can never be valid (too long)

use crate::archive::types::{Scnl, TimeSpan};
use crate::time::ew_to_j2k;
use thiserror::Error;

/// Errors that can occur while framing or parsing a command line.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// The line held no tokens
    #[error("empty command")]
    Empty,

    /// The line exceeds the maximum allowed length
    #[error("line too long: {size} bytes (max: {max})")]
    LineTooLong { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Default maximum command line length in bytes.
pub const MAX_LINE_LENGTH: usize = 8 * 1024;

/// Extracts the next `\n`-terminated line from `buf`.
///
/// The returned line has its `\n` (and any `\r` before it) removed. Bytes
/// that are not UTF-8 are replaced, which leaves the command malformed rather
/// than faulting the connection.
pub fn split_line(buf: &[u8], max: usize) -> ParseResult<Option<(String, usize)>> {
    match buf.iter().position(|&b| b == b'\n') {
        Some(pos) if pos > max => Err(ParseError::LineTooLong { size: pos, max }),
        Some(pos) => {
            let line = String::from_utf8_lossy(&buf[..pos]);
            let line = line.trim_end_matches('\r').to_string();
            Ok(Some((line, pos + 1)))
        }
        None if buf.len() > max => Err(ParseError::LineTooLong {
            size: buf.len(),
            max,
        }),
        None => Ok(None),
    }
}

/// A parsed request line. Immutable once built; lives for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// `tokens[0]` is the keyword without its trailing colon
    tokens: Vec<String>,
}

impl Command {
    /// Tokenizes a command line.
    pub fn parse(line: &str) -> ParseResult<Self> {
        let mut tokens: Vec<String> = line
            .trim_end_matches(['\r', '\n'])
            .trim_end_matches(' ')
            .split(' ')
            .map(str::to_string)
            .collect();

        match tokens.first_mut() {
            Some(keyword) => {
                if let Some(stripped) = keyword.strip_suffix(':') {
                    *keyword = stripped.to_string();
                }
                if keyword.is_empty() {
                    return Err(ParseError::Empty);
                }
            }
            None => return Err(ParseError::Empty),
        }

        Ok(Self { tokens })
    }

    /// The verb, case preserved.
    pub fn keyword(&self) -> &str {
        &self.tokens[0]
    }

    /// The request id, echoed in every reply.
    pub fn id(&self) -> Option<&str> {
        self.string(1)
    }

    /// Number of tokens including the keyword.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always false; a command has at least its keyword.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The token at `index`, where 0 is the keyword.
    pub fn string(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// The token at `index` as a finite number.
    pub fn double(&self, index: usize) -> Option<f64> {
        self.string(index)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// The token at `index` as an integer.
    pub fn int(&self, index: usize) -> Option<i64> {
        self.string(index).and_then(|s| s.parse().ok())
    }

    /// The token at `index` as a `0|1` flag.
    pub fn flag(&self, index: usize) -> Option<bool> {
        match self.string(index)? {
            "0" => Some(false),
            "1" => Some(true),
            _ => None,
        }
    }

    /// True when the command has exactly `n` tokens.
    pub fn is_legal(&self, n: usize) -> bool {
        self.tokens.len() == n
    }

    /// `n` tokens, with the two time fields after an SCN address numeric.
    pub fn is_legal_scn_times(&self, n: usize) -> bool {
        self.is_legal(n) && self.double(5).is_some() && self.double(6).is_some()
    }

    /// `n` tokens, with the two time fields after an SCNL address numeric.
    pub fn is_legal_scnl_times(&self, n: usize) -> bool {
        self.is_legal(n) && self.double(6).is_some() && self.double(7).is_some()
    }

    /// Fields 2..=4 as a 3-tuple address.
    pub fn scn(&self) -> Option<Scnl> {
        Some(Scnl::scn(self.string(2)?, self.string(3)?, self.string(4)?))
    }

    /// Fields 2..=5 as a 4-tuple address.
    pub fn scnl(&self) -> Option<Scnl> {
        Some(Scnl::new(
            self.string(2)?,
            self.string(3)?,
            self.string(4)?,
            Some(self.string(5)?),
        ))
    }

    /// The address, 3- or 4-tuple.
    pub fn address(&self, has_location: bool) -> Option<Scnl> {
        if has_location {
            self.scnl()
        } else {
            self.scn()
        }
    }

    /// Fields `index` and `index + 1` as wire times, converted to J2000.
    pub fn time_span(&self, index: usize) -> Option<TimeSpan> {
        Some(TimeSpan::new(
            ew_to_j2k(self.double(index)?),
            ew_to_j2k(self.double(index + 1)?),
        ))
    }
}
