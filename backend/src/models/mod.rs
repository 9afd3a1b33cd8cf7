//! Domain models for the Gridform data engine.
//!
//! This module contains the canonical in-memory representation of tabular data:
//!
//! - [`Field`] - A column definition (key + display label)
//! - [`Record`] - One row, keyed by field key
//! - [`Dataset`] - The paired (fields, records) unit loaded, edited and persisted as a whole
//! - [`GridState`] - Ephemeral rendering hint (last edited row)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Text shown by the rendering layer for a field absent from a record.
pub const EMPTY_CELL: &str = "-";

/// One row of data. Key order is preserved as inserted.
///
/// Records may carry keys absent from the field list (tolerated, not
/// rendered) and may miss keys present in it (rendered as [`EMPTY_CELL`]).
pub type Record = Map<String, Value>;

// =============================================================================
// Field
// =============================================================================

/// A named column definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "RawField")]
pub struct Field {
    /// Unique key within a dataset.
    pub key: String,
    /// Display name.
    pub label: String,
}

impl Field {
    /// Create a field with an explicit label.
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }

    /// Create a field whose label is derived from its key.
    pub fn from_key(key: impl Into<String>) -> Self {
        let key = key.into();
        let label = label_from_key(&key);
        Self { key, label }
    }
}

/// Wire shape of a field: the label may be omitted.
#[derive(Deserialize)]
struct RawField {
    key: String,
    #[serde(default)]
    label: Option<String>,
}

impl From<RawField> for Field {
    fn from(raw: RawField) -> Self {
        match raw.label {
            Some(label) if !label.is_empty() => Field::new(raw.key, label),
            _ => Field::from_key(raw.key),
        }
    }
}

/// Derive a display label from a camel-case key.
///
/// A space goes before every uppercase letter after the first character,
/// then the first character is uppercased: `"firstName"` becomes `"First Name"`.
pub fn label_from_key(key: &str) -> String {
    let mut label = String::with_capacity(key.len() + 4);

    for (i, c) in key.chars().enumerate() {
        if i == 0 {
            label.extend(c.to_uppercase());
        } else {
            if c.is_ascii_uppercase() {
                label.push(' ');
            }
            label.push(c);
        }
    }

    label
}

// =============================================================================
// Dataset
// =============================================================================

/// The canonical (fields, records) unit.
///
/// Serialized verbatim as `{"fields": [...], "records": [...]}`; this is both
/// the JSON export format and the persisted snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub fields: Vec<Field>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(fields: Vec<Field>, records: Vec<Record>) -> Self {
        Self { fields, records }
    }

    /// Build a dataset from schema-less records, deriving fields from the
    /// first record. Empty input yields an empty dataset.
    pub fn from_records(records: Vec<Record>) -> Self {
        let fields = fields_from_records(&records);
        Self { fields, records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Field keys in column order.
    pub fn keys(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.key.as_str()).collect()
    }

    /// Display text for one cell. Missing values render as [`EMPTY_CELL`].
    pub fn cell_text(&self, row: usize, key: &str) -> Option<String> {
        let record = self.records.get(row)?;
        Some(match record.get(key) {
            Some(value) => value_to_text(value),
            None => EMPTY_CELL.to_string(),
        })
    }
}

/// Derive an ordered field list from the key order of the first record.
pub fn fields_from_records(records: &[Record]) -> Vec<Field> {
    match records.first() {
        Some(first) => first.keys().map(Field::from_key).collect(),
        None => Vec::new(),
    }
}

/// Plain-text rendering of a scalar cell value.
///
/// Strings are returned unquoted, `null` becomes empty, and nested values
/// fall back to their JSON text.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

// =============================================================================
// Grid State
// =============================================================================

/// Ephemeral rendering-adjacent state.
///
/// Carries the last edited record index so the renderer can flash that row.
/// Cleared on every full re-render; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridState {
    pub last_edited: Option<usize>,
}

impl GridState {
    pub fn mark_edited(&mut self, index: usize) {
        self.last_edited = Some(index);
    }

    /// Take the highlight, leaving the state cleared.
    pub fn take_highlight(&mut self) -> Option<usize> {
        self.last_edited.take()
    }

    pub fn clear(&mut self) {
        self.last_edited = None;
    }
}

// =============================================================================
// Tests
// =============================================================================
