//! Convert a grouped form specification into a dataset.
//!
//! A form specification is a list of sections, each holding flat field
//! definitions whose keys carry a numeric suffix. The suffix says which
//! record a field belongs to; the base name is the column.
//!
//! # Architecture
//!
//! ```text
//! Form spec (indexed keys)             →  Dataset
//! ┌──────────────────────────────┐       ┌──────────────────────────┐
//! │ firstName1 = "Alice"         │       │ fields: firstName, age   │
//! │ age1       = 30              │  →    ├──────────────────────────┤
//! │ firstName2 = "Bob"           │       │ { firstName: Alice, 30 } │
//! │ age2       = 28              │       │ { firstName: Bob,   28 } │
//! │ submit     (no suffix, skip) │       └──────────────────────────┘
//! └──────────────────────────────┘
//! ```
//!
//! Indices group as opaque strings (`"01"` and `"1"` are distinct records)
//! but records come out in ascending numeric order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{label_from_key, Dataset, Field, Record};

static INDEXED_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z]+)([0-9]+)$").expect("indexed key pattern is valid")
});

/// One section of a form specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSection {
    /// Section title.
    #[serde(default)]
    pub section: String,
    /// Layout column count (rendering hint only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    /// Field definitions in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// A single form field definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field key, e.g. `firstName3`.
    pub key: String,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Input type hint (`text`, `checkbox`, ...).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    /// Initial value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDef {
    pub fn new(key: impl Into<String>, label: impl Into<String>, default: Value) -> Self {
        Self {
            key: key.into(),
            label: Some(label.into()),
            input_type: None,
            default: Some(default),
        }
    }
}

/// Split an indexed key into `(base_name, index)`.
///
/// Returns `None` for keys without a numeric suffix (form-only controls).
pub fn split_indexed_key(key: &str) -> Option<(&str, &str)> {
    let caps = INDEXED_KEY.captures(key)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Reconcile a grouped form specification into a dataset.
///
/// - Field order follows the first appearance of each base name.
/// - The first definition seen for a base name decides its label.
/// - Keys without a numeric suffix are ignored.
/// - A missing or `null` default becomes an empty string.
pub fn form_spec_to_dataset(sections: &[FormSection]) -> Dataset {
    let mut fields: Vec<Field> = Vec::new();
    let mut field_index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<RecordGroup> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();

    for def in sections.iter().flat_map(|s| s.fields.iter()) {
        let Some((base, index)) = split_indexed_key(&def.key) else {
            continue;
        };

        if !field_index.contains_key(base) {
            let label = match def.label.as_deref() {
                Some(label) if !label.is_empty() => label.to_string(),
                _ => label_from_key(base),
            };
            field_index.insert(base.to_string(), fields.len());
            fields.push(Field::new(base, label));
        }

        let slot = *group_index.entry(index.to_string()).or_insert_with(|| {
            groups.push(RecordGroup::new(index));
            groups.len() - 1
        });

        let value = match &def.default {
            Some(Value::Null) | None => Value::String(String::new()),
            Some(v) => v.clone(),
        };
        groups[slot].record.insert(base.to_string(), value);
    }

    // Stable sort keeps first-seen order between equal numeric indices ("1" vs "01").
    groups.sort_by(|a, b| compare_numeric(&a.index, &b.index));

    Dataset::new(fields, groups.into_iter().map(|g| g.record).collect())
}

/// Record under construction for one suffix index.
struct RecordGroup {
    index: String,
    record: Record,
}

impl RecordGroup {
    fn new(index: &str) -> Self {
        Self {
            index: index.to_string(),
            record: Record::new(),
        }
    }
}

/// Compare two digit strings by numeric value without overflow.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section(fields: Vec<FieldDef>) -> FormSection {
        FormSection {
            section: "Users".into(),
            columns: Some(2),
            fields,
        }
    }

    #[test]
    fn test_grouping_by_suffix() {
        let spec = vec![section(vec![
            FieldDef::new("firstName1", "First Name", json!("Alice")),
            FieldDef::new("age1", "Age", json!(30)),
            FieldDef::new("firstName2", "First Name", json!("Bob")),
            FieldDef::new("age2", "Age", json!(28)),
        ])];

        let dataset = form_spec_to_dataset(&spec);

        assert_eq!(
            dataset.fields,
            vec![Field::new("firstName", "First Name"), Field::new("age", "Age")]
        );
        assert_eq!(dataset.records.len(), 2);
        assert_eq!(dataset.records[0]["firstName"], "Alice");
        assert_eq!(dataset.records[0]["age"], 30);
        assert_eq!(dataset.records[1]["firstName"], "Bob");
    }

    #[test]
    fn test_first_label_wins() {
        let spec = vec![
            section(vec![FieldDef::new("email1", "Email", json!("a@x.io"))]),
            section(vec![FieldDef::new("email2", "E-mail address", json!("b@x.io"))]),
        ];

        let dataset = form_spec_to_dataset(&spec);
        assert_eq!(dataset.fields, vec![Field::new("email", "Email")]);
        assert_eq!(dataset.records.len(), 2);
    }

    #[test]
    fn test_unindexed_keys_ignored() {
        let spec = vec![section(vec![
            FieldDef::new("submit", "Submit", json!("")),
            FieldDef::new("name1", "Name", json!("Ann")),
            FieldDef::new("first_name2", "Broken", json!("x")),
        ])];

        let dataset = form_spec_to_dataset(&spec);
        assert_eq!(dataset.fields, vec![Field::new("name", "Name")]);
        assert_eq!(dataset.records.len(), 1);
    }

    #[test]
    fn test_records_ordered_numerically() {
        let spec = vec![section(vec![
            FieldDef::new("name10", "Name", json!("ten")),
            FieldDef::new("name2", "Name", json!("two")),
            FieldDef::new("name1", "Name", json!("one")),
        ])];

        let dataset = form_spec_to_dataset(&spec);
        let names: Vec<&str> = dataset
            .records
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["one", "two", "ten"]);
    }

    #[test]
    fn test_indices_grouped_as_strings() {
        let spec = vec![section(vec![
            FieldDef::new("name1", "Name", json!("plain")),
            FieldDef::new("name01", "Name", json!("padded")),
        ])];

        let dataset = form_spec_to_dataset(&spec);
        assert_eq!(dataset.records.len(), 2);
        assert_eq!(dataset.records[0]["name"], "plain");
        assert_eq!(dataset.records[1]["name"], "padded");
    }

    #[test]
    fn test_missing_label_and_default() {
        let spec: Vec<FormSection> = serde_json::from_value(json!([
            { "section": "S", "fields": [ { "key": "lastName1" } ] }
        ]))
        .unwrap();

        let dataset = form_spec_to_dataset(&spec);
        assert_eq!(dataset.fields, vec![Field::new("lastName", "Last Name")]);
        assert_eq!(dataset.records[0]["lastName"], "");
    }

    #[test]
    fn test_split_indexed_key() {
        assert_eq!(split_indexed_key("firstName3"), Some(("firstName", "3")));
        assert_eq!(split_indexed_key("submit"), None);
        assert_eq!(split_indexed_key("42"), None);
    }
}
