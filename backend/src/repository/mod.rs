//! Record repository - standalone CRUD over id-keyed records.
//!
//! Separate from the grid engine: the grid addresses rows by position, while
//! the repository gives every record a synthetic id stored under `_id`.
//! Records keep their insertion order.

use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{ImportError, ImportResult};
use crate::models::{value_to_text, Record};

/// Key holding a record's synthetic id.
pub const ID_KEY: &str = "_id";

/// Sort direction for [`RecordRepository::sort`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// In-memory id-keyed record store.
#[derive(Debug, Clone, Default)]
pub struct RecordRepository {
    /// Ids in insertion order
    order: Vec<String>,
    /// Loaded records (id -> record)
    records: HashMap<String, Record>,
}

impl RecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Insert a record and return its id.
    ///
    /// A non-empty `_id` already on the record is kept as is, numbers
    /// included, and is looked up by its text form (replacing any record with
    /// that id). Otherwise a fresh UUID is assigned.
    pub fn create(&mut self, mut record: Record) -> String {
        let id = match record.get(ID_KEY).map(value_to_text) {
            Some(id) if !id.is_empty() => id,
            _ => {
                let id = Uuid::new_v4().to_string();
                record.insert(ID_KEY.to_string(), Value::String(id.clone()));
                id
            }
        };

        if self.records.insert(id.clone(), record).is_none() {
            self.order.push(id.clone());
        }
        id
    }

    pub fn read(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    /// Shallow-merge `updates` into the record. Returns `false` for unknown ids.
    /// The id itself cannot be changed.
    pub fn update(&mut self, id: &str, updates: Record) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        for (key, value) in updates {
            if key != ID_KEY {
                record.insert(key, value);
            }
        }
        true
    }

    /// Remove a record. Returns `false` for unknown ids.
    pub fn delete(&mut self, id: &str) -> bool {
        if self.records.remove(id).is_some() {
            self.order.retain(|o| o != id);
            true
        } else {
            false
        }
    }

    /// All records in insertion order.
    pub fn all(&self) -> Vec<&Record> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    /// Records matching a predicate, in insertion order.
    pub fn find<F>(&self, predicate: F) -> Vec<&Record>
    where
        F: Fn(&Record) -> bool,
    {
        self.all().into_iter().filter(|r| predicate(r)).collect()
    }

    /// All records ordered by the text of `key`. Missing values sort as "".
    pub fn sort(&self, key: &str, direction: Direction) -> Vec<&Record> {
        let mut sorted = self.all();
        sorted.sort_by(|a, b| {
            let ord = sort_text(a, key).cmp(&sort_text(b, key));
            match direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });
        sorted
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.records.clear();
    }

    /// Pretty-printed JSON array of all records.
    pub fn export(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.all())
    }

    /// Replace the contents with the records of a JSON array.
    ///
    /// Input is fully parsed before anything changes, so a failed import
    /// leaves the repository as it was.
    pub fn import(&mut self, json: &str) -> ImportResult<usize> {
        let items: Vec<Value> = serde_json::from_str(json)?;
        let records = items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                other => Err(ImportError::InvalidFormat(format!(
                    "expected an object, found {}",
                    other
                ))),
            })
            .collect::<ImportResult<Vec<Record>>>()?;

        self.clear();
        let count = records.len();
        for record in records {
            self.create(record);
        }
        Ok(count)
    }
}

fn sort_text(record: &Record, key: &str) -> String {
    record.get(key).map(value_to_text).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_create_assigns_id() {
        let mut repo = RecordRepository::new();
        let id = repo.create(record(json!({ "name": "Alice" })));

        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(repo.read(&id).unwrap()[ID_KEY], id.as_str());
    }

    #[test]
    fn test_create_keeps_existing_id() {
        let mut repo = RecordRepository::new();
        let id = repo.create(record(json!({ "_id": "u1", "name": "Alice" })));
        assert_eq!(id, "u1");

        repo.create(record(json!({ "_id": "u1", "name": "Alicia" })));
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.read("u1").unwrap()["name"], "Alicia");
    }

    #[test]
    fn test_numeric_id_survives_import_export() {
        let mut repo = RecordRepository::new();
        repo.import(r#"[{"_id":5,"name":"Ann"}]"#).unwrap();

        assert_eq!(repo.read("5").unwrap()[ID_KEY], json!(5));
        let exported: Value = serde_json::from_str(&repo.export().unwrap()).unwrap();
        assert_eq!(exported, json!([{ "_id": 5, "name": "Ann" }]));
    }

    #[test]
    fn test_update_merges() {
        let mut repo = RecordRepository::new();
        let id = repo.create(record(json!({ "name": "Bob", "role": "Dev" })));

        assert!(repo.update(&id, record(json!({ "role": "Lead", "_id": "hijack" }))));
        let stored = repo.read(&id).unwrap();
        assert_eq!(stored["name"], "Bob");
        assert_eq!(stored["role"], "Lead");
        assert_eq!(stored[ID_KEY], id.as_str());

        assert!(!repo.update("missing", Record::new()));
    }

    #[test]
    fn test_delete_and_order() {
        let mut repo = RecordRepository::new();
        let a = repo.create(record(json!({ "n": "a" })));
        repo.create(record(json!({ "n": "b" })));
        repo.create(record(json!({ "n": "c" })));

        assert!(repo.delete(&a));
        assert!(!repo.delete(&a));
        let names: Vec<&str> = repo.all().iter().map(|r| r["n"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_find_and_sort() {
        let mut repo = RecordRepository::new();
        repo.create(record(json!({ "name": "Carol", "role": "Manager" })));
        repo.create(record(json!({ "name": "alice", "role": "Dev" })));
        repo.create(record(json!({ "role": "Manager" })));

        let managers = repo.find(|r| r.get("role") == Some(&json!("Manager")));
        assert_eq!(managers.len(), 2);

        let sorted = repo.sort("name", Direction::Asc);
        assert!(sorted[0].get("name").is_none());
        assert_eq!(sorted[1]["name"], "Carol");

        let desc = repo.sort("name", Direction::Desc);
        assert_eq!(desc[0]["name"], "alice");
    }

    #[test]
    fn test_export_import() {
        let mut repo = RecordRepository::new();
        repo.create(record(json!({ "_id": "1", "name": "Ann" })));
        let exported = repo.export().unwrap();

        let mut other = RecordRepository::new();
        other.create(record(json!({ "name": "stale" })));
        assert_eq!(other.import(&exported).unwrap(), 1);
        assert_eq!(other.read("1").unwrap()["name"], "Ann");
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn test_failed_import_keeps_contents() {
        let mut repo = RecordRepository::new();
        repo.create(record(json!({ "name": "keep" })));

        assert!(repo.import("not json").is_err());
        assert!(repo.import("[1]").is_err());
        assert_eq!(repo.len(), 1);
    }
}
