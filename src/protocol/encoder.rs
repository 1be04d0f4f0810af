//! Reply Encoding Helpers
//!
//! Number rendering for ASCII replies and the optional zlib step applied to
//! binary payloads before they are framed.

use crate::time::j2k_to_ew;
use bytes::Bytes;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// Renders a number with at most six decimals and no trailing zeros.
///
/// Microsecond resolution keeps wire times loss-free to well under a
/// millisecond.
pub fn format_number(value: f64) -> String {
    let mut s = format!("{:.6}", value);
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Renders an internal (J2000) time as wire seconds.
pub fn format_time(j2k: f64) -> String {
    format_number(j2k_to_ew(j2k))
}

/// Deflates `raw` into a zlib stream.
pub fn compress(raw: &[u8]) -> std::io::Result<Bytes> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
    encoder.write_all(raw)?;
    Ok(Bytes::from(encoder.finish()?))
}

/// Applies the per-request compression flag to a binary payload.
pub fn encode_payload(raw: Bytes, compressed: bool) -> std::io::Result<Bytes> {
    if compressed {
        compress(&raw)
    } else {
        Ok(raw)
    }
}
