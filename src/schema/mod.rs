//! Per-feed schema adapters.
//!
//! Adapters turn a [`ParsedFeed`] into the feed's semantic record type:
//!
//! - [`key_value`] - `field,value` feeds folded into a [`KeyValueRecord`]
//! - [`tabular`] - one entity per row for core values, services, and
//!   service details
//!
//! Adapters are pure and independent of each other. Content problems that
//! should not block a run (a row with a blank field name) come back in
//! [`Adapted::skipped`]; everything else is a [`SchemaError`].

pub mod key_value;
pub mod tabular;

pub use key_value::{adapt_key_value, KeyValueRecord};
pub use tabular::{
    adapt_core_values, adapt_service_details, adapt_services, parse_key_services, CoreValue,
    ImagePosition, ServiceDetail, ServiceSummary,
};

use crate::feed::{FeedKind, ParsedFeed, RawRow};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("feed '{feed}' has the wrong columns (missing: [{}], unexpected: [{}])", .missing.join(", "), .unexpected.join(", "))]
    Columns {
        feed: FeedKind,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("feed '{feed}' line {line}: column '{column}' must not be empty")]
    MissingField {
        feed: FeedKind,
        line: u64,
        column: &'static str,
    },

    #[error("feed '{feed}' line {line}: field '{field}' already defined on line {first_line}")]
    DuplicateField {
        feed: FeedKind,
        field: String,
        line: u64,
        first_line: u64,
    },

    #[error("feed '{feed}' line {line}: link_id '{link_id}' must be lowercase letters, digits and single hyphens")]
    InvalidLinkId {
        feed: FeedKind,
        line: u64,
        link_id: String,
    },

    #[error("service '{service_id}': image_position '{value}' must be 'left' or 'right'")]
    InvalidImagePosition { service_id: String, value: String },
}

/// A row an adapter dropped without failing the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: &'static str,
}

/// Adapter output plus the rows it skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Adapted<T> {
    pub record: T,
    pub skipped: Vec<SkippedRow>,
}

impl<T> Adapted<T> {
    fn clean(record: T) -> Self {
        Self {
            record,
            skipped: Vec::new(),
        }
    }
}

/// Requires the header set to equal `feed.kind.schema().columns()`.
///
/// Column order is not significant; names are case-sensitive.
pub(crate) fn check_columns(feed: &ParsedFeed) -> Result<(), SchemaError> {
    let expected = feed.kind.schema().columns();

    let missing: Vec<String> = expected
        .iter()
        .filter(|col| !feed.headers.iter().any(|h| h.as_str() == **col))
        .map(|col| col.to_string())
        .collect();
    let unexpected: Vec<String> = feed
        .headers
        .iter()
        .filter(|h| !expected.contains(&h.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::Columns {
            feed: feed.kind,
            missing,
            unexpected,
        })
    }
}

/// Trimmed cell value; empty when the cell is blank.
pub(crate) fn cell<'a>(row: &'a RawRow, column: &str) -> &'a str {
    row.get(column).map(str::trim).unwrap_or("")
}

/// Trimmed cell value that must not be blank.
pub(crate) fn required<'a>(
    feed: FeedKind,
    row: &'a RawRow,
    column: &'static str,
) -> Result<&'a str, SchemaError> {
    let value = cell(row, column);
    if value.is_empty() {
        return Err(SchemaError::MissingField {
            feed,
            line: row.line(),
            column,
        });
    }
    Ok(value)
}

/// Trimmed cell value, or `default` when blank.
pub(crate) fn or_default(row: &RawRow, column: &str, default: &str) -> String {
    match cell(row, column) {
        "" => default.to_string(),
        value => value.to_string(),
    }
}
