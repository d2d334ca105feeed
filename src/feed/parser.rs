use super::FeedKind;
use csv::ReaderBuilder;
use std::sync::Arc;
use thiserror::Error;

const UTF8_BOM: char = '\u{feff}';

/// Malformed CSV in one feed.
///
/// `line` is 1-based and points at the start of the offending record;
/// it is 0 when the input has no lines at all.
#[derive(Debug, Error)]
#[error("failed to parse feed '{feed}' at line {line}: {reason}")]
pub struct ParseError {
    pub feed: FeedKind,
    pub line: u64,
    pub reason: ParseErrorReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorReason {
    #[error("input is empty (no header row)")]
    Empty,
    #[error("input is not valid UTF-8")]
    InvalidUtf8,
    #[error("quoted field is never closed")]
    UnterminatedQuote,
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("header '{0}' appears more than once")]
    DuplicateHeader(String),
    #[error("{0}")]
    Csv(String),
}

/// One CSV record keyed by the feed's header row.
#[derive(Debug, Clone)]
pub struct RawRow {
    line: u64,
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl RawRow {
    /// Line on which this record starts.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Cell under `column`, untrimmed.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    /// `(header, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }
}

/// A feed decoded into rows, header included.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub kind: FeedKind,
    pub headers: Arc<[String]>,
    pub rows: Vec<RawRow>,
}

/// Decodes CSV bytes into header-keyed rows.
///
/// The first record is the header. Every later record must have as many
/// cells as the header. Blank lines, and records whose cells are all
/// blank, are skipped.
pub fn parse_csv(feed: FeedKind, bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    let fail = |line: u64, reason: ParseErrorReason| ParseError { feed, line, reason };

    let text = std::str::from_utf8(bytes).map_err(|e| {
        let line = 1 + bytes[..e.valid_up_to()]
            .iter()
            .filter(|&&b| b == b'\n')
            .count() as u64;
        fail(line, ParseErrorReason::InvalidUtf8)
    })?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    if text.trim().is_empty() {
        return Err(fail(0, ParseErrorReason::Empty));
    }

    // The csv reader accepts an unclosed quote as a field running to EOF.
    if let Some(line) = unterminated_quote_line(text) {
        return Err(fail(line, ParseErrorReason::UnterminatedQuote));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let header_record = reader
        .headers()
        .map_err(|e| fail(1, ParseErrorReason::Csv(e.to_string())))?;
    let headers: Vec<String> = header_record.iter().map(|h| h.trim().to_string()).collect();

    for (i, header) in headers.iter().enumerate() {
        if headers[..i].contains(header) {
            return Err(fail(1, ParseErrorReason::DuplicateHeader(header.clone())));
        }
    }
    let headers: Arc<[String]> = headers.into();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            fail(line, ParseErrorReason::Csv(e.to_string()))
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        if record.len() != headers.len() {
            return Err(fail(
                line,
                ParseErrorReason::ColumnCount {
                    expected: headers.len(),
                    found: record.len(),
                },
            ));
        }

        rows.push(RawRow {
            line,
            headers: Arc::clone(&headers),
            values: record.iter().map(str::to_string).collect(),
        });
    }

    tracing::debug!(feed = %feed, rows = rows.len(), "Parsed feed");
    Ok(ParsedFeed {
        kind: feed,
        headers,
        rows,
    })
}

/// Line where a quoted field opens without ever closing, per RFC 4180.
fn unterminated_quote_line(text: &str) -> Option<u64> {
    let mut line = 1;
    let mut opened_at = 0;
    let mut in_quotes = false;
    let mut field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => line += 1,
                '\r' if chars.peek() != Some(&'\n') => line += 1,
                _ => {}
            }
            continue;
        }

        match c {
            '"' if field_start => {
                in_quotes = true;
                opened_at = line;
            }
            ',' => {
                field_start = true;
                continue;
            }
            '\n' => {
                line += 1;
                field_start = true;
                continue;
            }
            // A bare CR ends a record; CRLF is counted at the LF.
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    line += 1;
                }
                field_start = true;
                continue;
            }
            _ => {}
        }
        field_start = false;
    }

    in_quotes.then_some(opened_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<ParsedFeed, ParseError> {
        parse_csv(FeedKind::Services, input.as_bytes())
    }

    #[test]
    fn test_header_defines_keys() {
        let feed = parse("name,link_id,gradient\nDrilling,drilling,g1\n").unwrap();
        assert_eq!(&*feed.headers, ["name", "link_id", "gradient"]);
        assert_eq!(feed.rows.len(), 1);
        assert_eq!(feed.rows[0].get("link_id"), Some("drilling"));
        assert_eq!(feed.rows[0].get("missing"), None);
        assert_eq!(feed.rows[0].line(), 2);
    }

    #[test]
    fn test_quoted_fields_with_commas_and_newlines() {
        let input = "field,value\n\"address\",\"1 Main St, Suite 2\nSpringfield\"\nphone,\"say \"\"hi\"\"\"\n";
        let feed = parse_csv(FeedKind::Contact, input.as_bytes()).unwrap();
        assert_eq!(feed.rows.len(), 2);
        assert_eq!(
            feed.rows[0].get("value"),
            Some("1 Main St, Suite 2\nSpringfield")
        );
        assert_eq!(feed.rows[1].get("value"), Some("say \"hi\""));
        // Second record starts after the embedded newline
        assert_eq!(feed.rows[1].line(), 4);
    }

    #[test]
    fn test_header_only_yields_no_rows() {
        let feed = parse("name,link_id,gradient\n").unwrap();
        assert!(feed.rows.is_empty());
        assert_eq!(feed.headers.len(), 3);
    }

    #[test]
    fn test_empty_input_is_error() {
        let err = parse("").unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::Empty);
        assert_eq!(err.line, 0);

        let err = parse("  \n\n").unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::Empty);
    }

    #[test]
    fn test_column_count_mismatch_reports_line() {
        let err = parse("name,link_id,gradient\na,b,c\nd,e\n").unwrap_err();
        assert_eq!(err.feed, FeedKind::Services);
        assert_eq!(err.line, 3);
        assert_eq!(
            err.reason,
            ParseErrorReason::ColumnCount {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_unterminated_quote_reports_opening_line() {
        let err = parse("name,link_id,gradient\na,b,c\n\"open,d,e\nf,g,h\n").unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::UnterminatedQuote);
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_unterminated_quote_with_cr_line_endings() {
        let err = parse("name,link_id,gradient\r\"open,b,c\rd,e,f\r").unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::UnterminatedQuote);
        assert_eq!(err.line, 2);

        assert_eq!(unterminated_quote_line("a,b\r\"c\r\nd\"\r\n"), None);
        assert_eq!(unterminated_quote_line("a,b\r\n\"c,d\r\n"), Some(2));
    }

    #[test]
    fn test_escaped_quotes_are_not_unterminated() {
        assert_eq!(unterminated_quote_line("a,\"b \"\"c\"\"\"\n"), None);
        assert_eq!(unterminated_quote_line("a,b\"c\n"), None);
        assert_eq!(unterminated_quote_line("a,\"b\n"), Some(1));
    }

    #[test]
    fn test_blank_lines_and_rows_skipped() {
        let feed = parse("name,link_id,gradient\r\na,b,c\r\n\r\n,,\r\n  , ,\r\n").unwrap();
        assert_eq!(feed.rows.len(), 1);
    }

    #[test]
    fn test_bom_stripped_from_header() {
        let feed = parse("\u{feff}name,link_id,gradient\na,b,c\n").unwrap();
        assert_eq!(feed.headers[0], "name");
    }

    #[test]
    fn test_invalid_utf8_reports_line() {
        let mut bytes = b"name,link_id,gradient\na,b,".to_vec();
        bytes.push(0xff);
        let err = parse_csv(FeedKind::Services, &bytes).unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::InvalidUtf8);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let err = parse("name,name,gradient\na,b,c\n").unwrap_err();
        assert_eq!(
            err.reason,
            ParseErrorReason::DuplicateHeader("name".to_string())
        );
    }

    #[test]
    fn test_iter_pairs_in_column_order() {
        let feed = parse("name,link_id,gradient\nA,a,g\n").unwrap();
        let pairs: Vec<_> = feed.rows[0].iter().collect();
        assert_eq!(pairs, vec![("name", "A"), ("link_id", "a"), ("gradient", "g")]);
    }
}
