//! Metadata Escaping
//!
//! GETMETADATA records are one line of comma-separated `key=value` pairs.
//! Values may contain anything, so the three characters that would break the
//! framing are escaped:
//!
//! | Literal | Escaped |
//! |---------|---------|
//! | `\`     | `\\`    |
//! | `,`     | `\c`    |
//! | newline | `\n`    |
//!
//! Splitting a record on unescaped commas and unescaping each field gives
//! back the original strings exactly.
//!
//! Earthworm-era servers only emit `\c` and `\n`. Escaping the backslash
//! itself is an extension: a value holding a literal `\` is sent as `\\`,
//! which an older client will show doubled.

/// Escapes a string for use inside a metadata record.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\c"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverses [`escape`]. Unknown escapes are kept as written.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('c') => out.push(','),
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Renders one escaped `key=value` pair.
pub fn pair(key: &str, value: &str) -> String {
    format!("{}={}", escape(key), escape(value))
}

/// Splits a record on unescaped commas and unescapes every field.
pub fn split_record(record: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = record.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                current.push(ch);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' => fields.push(unescape(&std::mem::take(&mut current))),
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        fields.push(unescape(&current));
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a,b"), "a\\cb");
        assert_eq!(escape("line1\nline2"), "line1\\nline2");
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("C:\\dir"), "C:\\\\dir");
    }

    #[test]
    fn test_escaped_record_is_one_line() {
        let record = pair("note", "a,\nb");
        assert!(!record.contains('\n'));
        assert_eq!(record.matches(',').count(), 0);
    }

    #[test]
    fn test_round_trip() {
        let values = [
            "",
            "plain",
            "a,b,c",
            "multi\nline\ntext",
            ",\n,\n",
            "literal \\c is not a comma",
            "trailing backslash \\",
            "\\n already escaped looking",
            "unicode ✓, still fine",
        ];
        for value in values {
            assert_eq!(unescape(&escape(value)), value, "value {:?}", value);
        }
    }

    #[test]
    fn test_record_round_trip() {
        let pairs = [
            ("name", "Akutan, Alaska"),
            ("comment", "installed 2003\nupgraded 2011"),
            ("path", "\\\\share\\c,d"),
        ];
        let record = pairs
            .iter()
            .map(|(k, v)| pair(k, v))
            .collect::<Vec<_>>()
            .join(",");

        let fields = split_record(&record);
        assert_eq!(fields.len(), pairs.len());
        for (field, (key, value)) in fields.iter().zip(pairs.iter()) {
            assert_eq!(field, &format!("{}={}", key, value));
        }
    }

    #[test]
    fn test_unknown_escape_kept() {
        assert_eq!(unescape("a\\qb"), "a\\qb");
    }
}
