//! The grid engine: one explicit instance holding the current dataset, the
//! edit session and the persistence gateway.
//!
//! Every mutation builds the next dataset off to the side, writes it through
//! to the store, and only then swaps it in. Observers therefore see either
//! the old or the new dataset, and memory never runs ahead of storage.
//!
//! ```text
//!  import_json / import_csv / load_form_spec ──┐
//!                                              ├─▶ validate ─▶ store.save ─▶ swap ─▶ DatasetChanged
//!  on_edit_committed ──────────────────────────┘
//! ```

use serde::Serialize;
use tokio::sync::broadcast;

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::broadcast::Broadcaster;
use crate::edit::{EditDraft, EditSession, EditState};
use crate::error::{EditError, EngineError, EngineResult, StoreError, StoreResult};
use crate::models::{Dataset, GridState, Record};
use crate::parser;
use crate::store::KeyValueStore;
use crate::transform::pipeline::{self, FileFormat};
use crate::transform::reconciler::{form_spec_to_dataset, FormSection};
use crate::validation::validate;

/// Redraw notification for the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetChanged {
    pub dataset: Dataset,
    /// Row to flash, set only right after an edit commit.
    pub highlight: Option<usize>,
}

/// A downloadable export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub filename: &'static str,
    pub mime: &'static str,
    pub body: String,
}

pub struct GridEngine<S: KeyValueStore> {
    dataset: Dataset,
    edit: EditSession,
    grid: GridState,
    store: S,
    key: String,
    events: Broadcaster<DatasetChanged>,
}

impl<S: KeyValueStore> GridEngine<S> {
    /// Create an engine and restore the snapshot stored under `key`.
    ///
    /// An unreadable, corrupt or invalid snapshot is logged and the engine
    /// starts empty.
    pub fn init(store: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let dataset = match load_snapshot(&store, &key) {
            Ok(Some(dataset)) if dataset.fields.is_empty() && dataset.records.is_empty() => {
                Dataset::default()
            }
            Ok(Some(dataset)) => match validate(&dataset) {
                Ok(()) => {
                    log_success(format!("Restored {} records from '{}'", dataset.len(), key));
                    dataset
                }
                Err(e) => {
                    log_warning(format!("Ignoring stored snapshot: {}", e));
                    Dataset::default()
                }
            },
            Ok(None) => Dataset::default(),
            Err(e) => {
                log_warning(format!("Ignoring stored snapshot: {}", e));
                Dataset::default()
            }
        };

        Self {
            dataset,
            edit: EditSession::new(),
            grid: GridState::default(),
            store,
            key,
            events: Broadcaster::new(),
        }
    }

    /// Shut the engine down, handing back the store.
    pub fn teardown(self) -> S {
        self.store
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn grid_state(&self) -> GridState {
        self.grid
    }

    pub fn edit_state(&self) -> EditState {
        self.edit.state()
    }

    pub fn draft(&self) -> Option<&EditDraft> {
        self.edit.draft()
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Receive a [`DatasetChanged`] after every successful mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<DatasetChanged> {
        self.events.subscribe()
    }

    // =========================================================================
    // Import
    // =========================================================================

    pub fn import_json(&mut self, text: &str) -> EngineResult<&Dataset> {
        self.import(FileFormat::Json, text)
    }

    pub fn import_csv(&mut self, text: &str) -> EngineResult<&Dataset> {
        self.import(FileFormat::Csv, text)
    }

    /// Import text in the given format, replacing the dataset wholesale.
    pub fn import(&mut self, format: FileFormat, text: &str) -> EngineResult<&Dataset> {
        log_info(format!("📂 Importing {:?} ({} bytes)...", format, text.len()));
        let dataset = pipeline::import_text(format, text)?;
        self.replace(dataset)?;
        log_success(format!(
            "Loaded {} records, {} fields",
            self.dataset.len(),
            self.dataset.fields.len()
        ));
        Ok(&self.dataset)
    }

    /// Import raw file bytes; format comes from the file name's extension.
    pub fn import_file(&mut self, file_name: &str, bytes: &[u8]) -> EngineResult<&Dataset> {
        let format = FileFormat::from_path(file_name)?;
        let text = parser::decode_bytes_auto(bytes)?;
        self.import(format, &text)
    }

    /// Replace the dataset with one reconciled from a grouped form spec.
    pub fn load_form_spec(&mut self, sections: &[FormSection]) -> EngineResult<&Dataset> {
        let dataset = form_spec_to_dataset(sections);
        log_info(format!(
            "Reconciled {} sections into {} records",
            sections.len(),
            dataset.len()
        ));
        self.replace(dataset)?;
        Ok(&self.dataset)
    }

    // =========================================================================
    // Edit transactions
    // =========================================================================

    /// Open an edit on record `index`, cancelling any open edit.
    pub fn on_edit_requested(&mut self, index: usize) -> EngineResult<EditDraft> {
        let draft = self.edit.begin(&self.dataset, index)?;
        Ok(draft.clone())
    }

    /// Commit the open edit, replacing the record with `values`.
    pub fn on_edit_committed(&mut self, values: Record) -> EngineResult<usize> {
        if !self.edit.is_editing() {
            return Err(EditError::NotEditing.into());
        }

        let mut next = self.dataset.clone();
        let mut grid = self.grid;
        let mut session = self.edit.clone();
        let index = session.commit(&mut next, &mut grid, values)?;

        self.persist(&next)?;
        self.dataset = next;
        self.grid = grid;
        self.edit = session;

        log_success(format!("Record {} updated", index));
        self.emit_changed();
        Ok(index)
    }

    /// Drop the open edit. No mutation, no persistence write.
    pub fn on_edit_cancelled(&mut self) -> Option<usize> {
        self.edit.cancel()
    }

    // =========================================================================
    // Export / persistence
    // =========================================================================

    /// Serialize the current dataset as a downloadable export.
    ///
    /// JSON needs a loaded dataset (fields present); CSV also needs rows.
    pub fn export(&self, format: FileFormat) -> EngineResult<Export> {
        let body = match format {
            FileFormat::Json if self.dataset.fields.is_empty() => {
                return Err(EngineError::NothingToExport)
            }
            FileFormat::Csv if self.dataset.is_empty() => return Err(EngineError::NothingToExport),
            FileFormat::Json => pipeline::export_json(&self.dataset)?,
            FileFormat::Csv => pipeline::export_csv(&self.dataset)?,
        };

        Ok(Export {
            filename: format.filename(),
            mime: format.mime_type(),
            body,
        })
    }

    /// Current dataset as the persisted JSON snapshot.
    pub fn export_json(&self) -> EngineResult<String> {
        Ok(pipeline::export_json(&self.dataset)?)
    }

    /// Current dataset as CSV.
    pub fn export_csv(&self) -> EngineResult<String> {
        Ok(pipeline::export_csv(&self.dataset)?)
    }

    /// Write the current dataset to the store.
    pub fn save(&mut self) -> EngineResult<()> {
        let dataset = self.dataset.clone();
        self.persist(&dataset)
    }

    /// Remove the stored snapshot and empty the grid.
    pub fn clear(&mut self) -> EngineResult<()> {
        self.store.clear(&self.key)?;
        self.edit.cancel();
        self.dataset = Dataset::default();
        self.grid.clear();
        log_success("🧹 Grid and stored snapshot cleared");
        self.emit_changed();
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Validate, persist, then swap in a whole new dataset.
    fn replace(&mut self, dataset: Dataset) -> EngineResult<()> {
        validate(&dataset)?;
        self.persist(&dataset)?;

        if let Some(open) = self.edit.cancel() {
            log_info_indent(format!("Open edit of record {} discarded", open), 1);
        }
        self.dataset = dataset;
        self.grid.clear();
        self.emit_changed();
        Ok(())
    }

    fn persist(&mut self, dataset: &Dataset) -> EngineResult<()> {
        let snapshot = pipeline::export_json(dataset)?;
        self.store.save(&self.key, &snapshot)?;
        log_info_indent(format!("💾 Saved snapshot under '{}'", self.key), 1);
        Ok(())
    }

    /// Notify the renderer. Emitting is the full re-render, so the highlight
    /// is handed over and cleared.
    fn emit_changed(&mut self) {
        let highlight = self.grid.take_highlight();
        self.events.send(DatasetChanged {
            dataset: self.dataset.clone(),
            highlight,
        });
    }
}

/// Read and parse the snapshot under `key`.
pub fn load_snapshot<S: KeyValueStore>(store: &S, key: &str) -> StoreResult<Option<Dataset>> {
    match store.load(key)? {
        Some(text) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(e.to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ImportError, ValidationError};
    use crate::models::Field;
    use crate::store::MemoryStore;
    use crate::transform::reconciler::FieldDef;
    use serde_json::json;

    const KEY: &str = "savedGridData";

    fn engine() -> GridEngine<MemoryStore> {
        GridEngine::init(MemoryStore::new(), KEY)
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    /// Store that fails every write.
    #[derive(Default)]
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn save(&mut self, _key: &str, _snapshot: &str) -> StoreResult<()> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        fn load(&self, key: &str) -> StoreResult<Option<String>> {
            self.0.load(key)
        }

        fn clear(&mut self, key: &str) -> StoreResult<()> {
            self.0.clear(key)
        }
    }

    #[test]
    fn test_import_writes_through() {
        let mut engine = engine();
        engine.import_csv("name,age\nAlice,30\nBob,25").unwrap();

        let stored = engine.store().load(KEY).unwrap().unwrap();
        assert_eq!(stored, engine.export_json().unwrap());
        assert_eq!(engine.dataset().len(), 2);
    }

    #[test]
    fn test_init_restores_snapshot() {
        let mut first = engine();
        first.import_json(r#"[{"firstName":"Ann"}]"#).unwrap();
        let store = first.teardown();

        let second = GridEngine::init(store, KEY);
        assert_eq!(second.dataset().fields, vec![Field::new("firstName", "First Name")]);
        assert_eq!(second.dataset().records[0]["firstName"], "Ann");
    }

    #[test]
    fn test_init_ignores_corrupt_snapshot() {
        let mut store = MemoryStore::new();
        store.save(KEY, "{broken").unwrap();

        let engine = GridEngine::init(store, KEY);
        assert!(engine.dataset().is_empty());
    }

    #[test]
    fn test_failed_import_keeps_previous_dataset() {
        let mut engine = engine();
        engine.import_csv("a,b\n1,2").unwrap();
        let before = engine.dataset().clone();
        let stored_before = engine.store().load(KEY).unwrap();

        let err = engine.import_json(r#"{"rows":[]}"#).unwrap_err();
        assert!(matches!(err, EngineError::Import(ImportError::InvalidFormat(_))));

        let err = engine.import_csv("a,b\n").unwrap_err();
        assert!(matches!(err, EngineError::Import(ImportError::EmptyResult)));

        let err = engine
            .import_json(r#"{"fields":[{"key":"x"},{"key":"x"}],"records":[]}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::DuplicateKey(_))
        ));

        assert_eq!(engine.dataset(), &before);
        assert_eq!(engine.store().load(KEY).unwrap(), stored_before);
    }

    #[test]
    fn test_edit_cycle_persists_and_highlights() {
        let mut engine = engine();
        engine.import_csv("name,age\nAlice,30\nBob,25").unwrap();
        let mut rx = engine.subscribe();

        let draft = engine.on_edit_requested(1).unwrap();
        assert_eq!(draft.values()["name"], "Bob");

        let index = engine
            .on_edit_committed(record(json!({ "name": "Robert" })))
            .unwrap();
        assert_eq!(index, 1);
        assert_eq!(engine.dataset().records[1], record(json!({ "name": "Robert" })));
        assert_eq!(engine.edit_state(), EditState::Idle);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.highlight, Some(1));
        assert_eq!(event.dataset, *engine.dataset());
        assert_eq!(engine.grid_state().last_edited, None);

        let stored = engine.store().load(KEY).unwrap().unwrap();
        assert!(stored.contains("Robert"));
        assert!(!stored.contains("\"Bob\""));
    }

    #[test]
    fn test_cancel_does_not_write() {
        let mut engine = engine();
        engine.import_csv("name\nAlice").unwrap();
        let stored_before = engine.store().load(KEY).unwrap();

        engine.on_edit_requested(0).unwrap();
        assert_eq!(engine.on_edit_cancelled(), Some(0));
        assert_eq!(engine.edit_state(), EditState::Idle);
        assert_eq!(engine.store().load(KEY).unwrap(), stored_before);
    }

    #[test]
    fn test_edit_out_of_range() {
        let mut engine = engine();
        engine.import_csv("name\nAlice").unwrap();

        let err = engine.on_edit_requested(3).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Edit(EditError::IndexOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_commit_failure_leaves_state() {
        let mut engine = GridEngine::init(ReadOnlyStore::default(), KEY);
        engine.dataset = Dataset::from_records(vec![record(json!({ "name": "Alice" }))]);

        engine.on_edit_requested(0).unwrap();
        let err = engine
            .on_edit_committed(record(json!({ "name": "Changed" })))
            .unwrap_err();

        assert!(matches!(err, EngineError::Store(_)));
        assert_eq!(engine.dataset().records[0]["name"], "Alice");
        assert_eq!(engine.edit_state(), EditState::Editing(0));
    }

    #[test]
    fn test_import_cancels_open_edit() {
        let mut engine = engine();
        engine.import_csv("name\nAlice").unwrap();
        engine.on_edit_requested(0).unwrap();

        engine.import_csv("name\nZed").unwrap();
        assert_eq!(engine.edit_state(), EditState::Idle);
        assert!(matches!(
            engine.on_edit_committed(Record::new()),
            Err(EngineError::Edit(EditError::NotEditing))
        ));
    }

    #[test]
    fn test_load_form_spec() {
        let mut engine = engine();
        let spec = vec![FormSection {
            section: "Users".into(),
            columns: Some(2),
            fields: vec![
                FieldDef::new("firstName1", "First Name", json!("Alice")),
                FieldDef::new("age1", "Age", json!(30)),
            ],
        }];

        engine.load_form_spec(&spec).unwrap();
        assert_eq!(engine.dataset().len(), 1);
        assert!(engine.store().load(KEY).unwrap().is_some());
    }

    #[test]
    fn test_export_formats() {
        let mut engine = engine();
        assert!(matches!(
            engine.export(FileFormat::Json),
            Err(EngineError::NothingToExport)
        ));

        engine.import_csv("name\nAlice").unwrap();

        let json = engine.export(FileFormat::Json).unwrap();
        assert_eq!(json.filename, "grid-data.json");
        assert_eq!(json.mime, "application/json");
        assert_eq!(json.body, engine.store().load(KEY).unwrap().unwrap());

        let csv = engine.export(FileFormat::Csv).unwrap();
        assert_eq!(csv.filename, "grid-data.csv");
        assert_eq!(csv.mime, "text/csv");
        assert_eq!(csv.body, "\"name\"\n\"Alice\"");
    }

    #[test]
    fn test_clear() {
        let mut engine = engine();
        engine.import_csv("name\nAlice").unwrap();

        engine.clear().unwrap();
        assert!(engine.dataset().is_empty());
        assert_eq!(engine.store().load(KEY).unwrap(), None);
    }

    #[test]
    fn test_import_file_by_extension() {
        let mut engine = engine();
        engine.import_file("people.CSV", b"name\nAlice").unwrap();
        assert_eq!(engine.dataset().records[0]["name"], "Alice");

        assert!(matches!(
            engine.import_file("people.txt", b"name\nAlice"),
            Err(EngineError::Import(ImportError::InvalidFormat(_)))
        ));
    }

    #[test]
    fn test_import_file_keeps_utf8_text() {
        let mut engine = engine();
        engine
            .import_file("prices.json", r#"[{"item":"Tea","price":"€5"}]"#.as_bytes())
            .unwrap();
        assert_eq!(engine.dataset().records[0]["price"], "€5");

        engine.import_file("names.csv", "n\né\nß".as_bytes()).unwrap();
        assert_eq!(engine.dataset().records[0]["n"], "é");
        assert_eq!(engine.dataset().records[1]["n"], "ß");

        let stored = engine.store().load(KEY).unwrap().unwrap();
        assert!(stored.contains("\"é\"") && stored.contains("\"ß\""));
    }

    #[test]
    fn test_export_fields_without_records() {
        let mut engine = engine();
        engine
            .import_json(r#"{"fields":[{"key":"name"}],"records":[]}"#)
            .unwrap();

        let json = engine.export(FileFormat::Json).unwrap();
        assert_eq!(json.body, engine.store().load(KEY).unwrap().unwrap());
        assert!(matches!(
            engine.export(FileFormat::Csv),
            Err(EngineError::NothingToExport)
        ));
    }
}
