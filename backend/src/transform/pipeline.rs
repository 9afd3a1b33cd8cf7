//! Import/export serializer.
//!
//! Turns external JSON/CSV text into a [`Dataset`] and back. These functions
//! are pure: they never touch engine state, so a failed import cannot leave a
//! partially applied dataset behind. [`crate::engine::GridEngine`] validates
//! the result, swaps it in and writes it through to storage.
//!
//! # Example
//!
//! ```rust,ignore
//! use gridform::transform::pipeline::{import_csv, export_json};
//!
//! let dataset = import_csv("name,age\nAlice,30")?;
//! let snapshot = export_json(&dataset)?;
//! ```

use serde_json::Value;
use std::path::Path;

use crate::error::{CsvResult, ImportError, ImportResult};
use crate::models::{Dataset, Field, Record};
use crate::parser;

/// Fixed download name for JSON exports.
pub const JSON_EXPORT_FILENAME: &str = "grid-data.json";

/// Fixed download name for CSV exports.
pub const CSV_EXPORT_FILENAME: &str = "grid-data.csv";

/// Supported interchange formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Json,
    Csv,
}

impl FileFormat {
    /// Pick a format from a file name's extension (case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> ImportResult<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            _ => Err(ImportError::InvalidFormat(format!(
                "unsupported file type: {}",
                path.as_ref().display()
            ))),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
        }
    }

    pub fn filename(self) -> &'static str {
        match self {
            Self::Json => JSON_EXPORT_FILENAME,
            Self::Csv => CSV_EXPORT_FILENAME,
        }
    }
}

impl std::str::FromStr for FileFormat {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(ImportError::InvalidFormat(format!("unknown format '{}'", other))),
        }
    }
}

// =============================================================================
// Import
// =============================================================================

/// Import JSON text.
///
/// Accepts either a plain array of flat records (fields derived from the
/// first record) or an explicit `{"fields": [...], "records": [...]}` object.
pub fn import_json(text: &str) -> ImportResult<Dataset> {
    let value: Value = serde_json::from_str(text)?;

    match value {
        Value::Array(items) => {
            let records = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(record) => Ok(record),
                    _ => Err(ImportError::InvalidFormat(format!(
                        "record {} is not an object",
                        i
                    ))),
                })
                .collect::<ImportResult<Vec<Record>>>()?;
            Ok(Dataset::from_records(records))
        }
        Value::Object(mut obj) => {
            let (Some(fields), Some(records)) = (obj.remove("fields"), obj.remove("records"))
            else {
                return Err(ImportError::InvalidFormat(
                    "expected an array of records or an object with fields and records".into(),
                ));
            };
            let fields: Vec<Field> = serde_json::from_value(fields)
                .map_err(|e| ImportError::InvalidFormat(format!("fields: {}", e)))?;
            let records: Vec<Record> = serde_json::from_value(records)
                .map_err(|e| ImportError::InvalidFormat(format!("records: {}", e)))?;
            Ok(Dataset::new(fields, records))
        }
        _ => Err(ImportError::InvalidFormat(
            "expected an array of records or an object with fields and records".into(),
        )),
    }
}

/// Import CSV text. Zero decoded records is [`ImportError::EmptyResult`].
pub fn import_csv(text: &str) -> ImportResult<Dataset> {
    let records = parser::decode(text);
    if records.is_empty() {
        return Err(ImportError::EmptyResult);
    }
    Ok(Dataset::from_records(records))
}

/// Import text in the given format.
pub fn import_text(format: FileFormat, text: &str) -> ImportResult<Dataset> {
    match format {
        FileFormat::Json => import_json(text),
        FileFormat::Csv => import_csv(text),
    }
}

// =============================================================================
// Export
// =============================================================================

/// Serialize the dataset verbatim. This is also the persisted snapshot.
pub fn export_json(dataset: &Dataset) -> serde_json::Result<String> {
    serde_json::to_string(dataset)
}

/// Encode the dataset as CSV using the current field key order.
pub fn export_csv(dataset: &Dataset) -> CsvResult<String> {
    parser::encode(&dataset.fields, &dataset.records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_import_plain_array() {
        let dataset = import_json(r#"[{"firstName":"Ann","age":31},{"firstName":"Bo"}]"#).unwrap();

        assert_eq!(
            dataset.fields,
            vec![Field::new("firstName", "First Name"), Field::new("age", "Age")]
        );
        assert_eq!(dataset.records.len(), 2);
        assert_eq!(dataset.records[0]["age"], 31);
    }

    #[test]
    fn test_import_explicit_object() {
        let text = r#"{"fields":[{"key":"n","label":"Name"}],"records":[{"n":"x"}]}"#;
        let dataset = import_json(text).unwrap();

        assert_eq!(dataset.fields, vec![Field::new("n", "Name")]);
        assert_eq!(dataset.records[0]["n"], "x");
    }

    #[test]
    fn test_import_invalid_shapes() {
        for text in [r#"{"rows":[]}"#, "42", r#""text""#, r#"[1,2]"#, r#"{"fields":3,"records":[]}"#] {
            let err = import_json(text).unwrap_err();
            assert!(matches!(err, ImportError::InvalidFormat(_)), "{}", text);
        }
    }

    #[test]
    fn test_import_malformed_json() {
        assert!(matches!(import_json("{not json"), Err(ImportError::Json(_))));
    }

    #[test]
    fn test_import_csv_empty_result() {
        assert!(matches!(import_csv("a,b\n"), Err(ImportError::EmptyResult)));
    }

    #[test]
    fn test_import_csv_derives_fields() {
        let dataset = import_csv("firstName,age\nAnn,31").unwrap();
        assert_eq!(dataset.fields[0], Field::new("firstName", "First Name"));
        assert_eq!(dataset.records[0]["age"], "31");
    }

    #[test]
    fn test_export_json_round_trip() {
        let text = r#"{"fields":[{"key":"a","label":"A"}],"records":[{"a":"1","extra":true}]}"#;
        let dataset = import_json(text).unwrap();
        assert_eq!(export_json(&dataset).unwrap(), text);
    }

    #[test]
    fn test_export_csv_uses_field_order() {
        let dataset = Dataset::new(
            vec![Field::from_key("b"), Field::from_key("a")],
            vec![json!({ "a": "1", "b": "2" }).as_object().cloned().unwrap()],
        );
        assert_eq!(export_csv(&dataset).unwrap(), "\"b\",\"a\"\n\"2\",\"1\"");
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(FileFormat::from_path("data.JSON").unwrap(), FileFormat::Json);
        assert_eq!(FileFormat::from_path("dir/data.csv").unwrap(), FileFormat::Csv);
        assert!(FileFormat::from_path("data.xlsx").is_err());
        assert_eq!(FileFormat::Csv.mime_type(), "text/csv");
        assert_eq!(FileFormat::Json.filename(), "grid-data.json");
    }
}
