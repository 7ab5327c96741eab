use std::sync::LazyLock;

use regex::Regex;

use crate::protocol::format_number;

pub const FIELD_SEPARATOR: char = '|';

static LINE_BREAKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n]+").unwrap());

/// One persisted line of the intake log: `code|qtty|timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub code: String,
    pub qtty: f64,
    /// Epoch milliseconds.
    pub timestamp: f64,
}

impl LogRecord {
    pub fn new(code: &str, qtty: f64, timestamp: f64) -> Self {
        Self {
            code: sanitize_code(code),
            qtty,
            timestamp,
        }
    }

    /// Record text without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.code,
            format_number(self.qtty),
            format_number(self.timestamp),
            sep = FIELD_SEPARATOR
        )
    }

    /// Parses a stored line. Lines with fewer than three fields or
    /// non-numeric values yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split(FIELD_SEPARATOR);
        let code = parts.next()?.to_string();
        let qtty = crate::protocol::parse_number(parts.next()?)?;
        let timestamp = crate::protocol::parse_number(parts.next()?)?;
        Some(Self {
            code,
            qtty,
            timestamp,
        })
    }
}

/// Keeps the line format stable: line breaks become a space, the field
/// separator becomes `_`, and the result is trimmed.
pub fn sanitize_code(input: &str) -> String {
    LINE_BREAKS
        .replace_all(input, " ")
        .replace(FIELD_SEPARATOR, "_")
        .trim()
        .to_string()
}

/// Timestamp field of the last non-empty line, if it parses.
pub fn last_timestamp(content: &str) -> Option<f64> {
    let last = content.trim().lines().last()?;
    let ts = last.split(FIELD_SEPARATOR).nth(2)?;
    crate::protocol::parse_number(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizing_never_adds_fields() {
        assert_eq!(sanitize_code("A|B"), "A_B");
        assert_eq!(sanitize_code("  A\r\n\nB  "), "A B");
        assert_eq!(sanitize_code("\n|\n"), "_");
        assert_eq!(sanitize_code(" \r\n "), "");
    }

    #[test]
    fn line_layout() {
        let record = LogRecord::new("X1|2", 3.0, 1_700_000_000_000.0);
        assert_eq!(record.to_line(), "X1_2|3|1700000000000");
        assert_eq!(LogRecord::parse(&record.to_line()), Some(record));
    }

    #[test]
    fn last_timestamp_reads_final_line() {
        let content = "A|1|100\nB|2|250\n";
        assert_eq!(last_timestamp(content), Some(250.0));
        assert_eq!(last_timestamp(""), None);
        assert_eq!(last_timestamp("\n\n"), None);
    }

    #[test]
    fn malformed_last_line_has_no_timestamp() {
        assert_eq!(last_timestamp("A|1|100\ngarbage\n"), None);
        assert_eq!(last_timestamp("A|1|100\nB|2|soon\n"), None);
        assert_eq!(LogRecord::parse("only|two"), None);
    }
}
