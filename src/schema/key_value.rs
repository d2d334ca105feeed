use super::{check_columns, Adapted, SchemaError, SkippedRow};
use crate::feed::ParsedFeed;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// Flat field → value mapping built from a `field,value` feed.
///
/// Fields keep the order their rows had in the sheet, and serialize as a
/// JSON object in that order. Editors rely on row order for things like
/// `paragraph1` .. `paragraph12`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValueRecord(Vec<(String, String)>);

impl KeyValueRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut String> {
        self.0
            .iter_mut()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(field, value)` pairs in sheet order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Later duplicates replace the earlier value in place.
impl FromIterator<(String, String)> for KeyValueRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut record = Self::default();
        for (field, value) in iter {
            match record.get_mut(&field) {
                Some(existing) => *existing = value,
                None => record.0.push((field, value)),
            }
        }
        record
    }
}

impl Serialize for KeyValueRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, value) in &self.0 {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

/// Folds a key-value feed into one record, in row order.
///
/// The field name is trimmed and the value is trimmed; a blank value is
/// kept as `""`. Rows with a blank field name are skipped. A field that
/// appears twice fails the feed rather than letting the later row win.
///
/// # Errors
///
/// - [`SchemaError::Columns`] - header is not exactly `field,value`
/// - [`SchemaError::DuplicateField`] - a field name repeats
pub fn adapt_key_value(feed: &ParsedFeed) -> Result<Adapted<KeyValueRecord>, SchemaError> {
    check_columns(feed)?;

    let mut values = Vec::with_capacity(feed.rows.len());
    let mut first_seen: HashMap<String, u64> = HashMap::new();
    let mut skipped = Vec::new();

    for row in &feed.rows {
        let field = super::cell(row, "field");
        if field.is_empty() {
            tracing::warn!(feed = %feed.kind, line = row.line(), "Skipping row with blank field name");
            skipped.push(SkippedRow {
                line: row.line(),
                reason: "blank field name",
            });
            continue;
        }

        if let Some(&first_line) = first_seen.get(field) {
            return Err(SchemaError::DuplicateField {
                feed: feed.kind,
                field: field.to_string(),
                line: row.line(),
                first_line,
            });
        }
        first_seen.insert(field.to_string(), row.line());
        values.push((field.to_string(), super::cell(row, "value").to_string()));
    }

    Ok(Adapted {
        record: KeyValueRecord(values),
        skipped,
    })
}
