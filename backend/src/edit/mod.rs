//! Edit transaction manager.
//!
//! A two-state machine (`Idle` / `Editing(index)`) around single-record
//! edits. [`EditSession::begin`] builds an editable copy of one record,
//! [`EditSession::commit`] replaces that record wholesale, and
//! [`EditSession::cancel`] drops the copy without touching the dataset.
//!
//! Only one edit is in flight at a time: beginning a new edit while another
//! is open cancels the open one first.

use serde::Serialize;
use serde_json::Value;

use crate::api::logs::log_warning;
use crate::error::{EditError, EditResult};
use crate::models::{label_from_key, Dataset, GridState, Record};

/// Transaction state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "lowercase")]
pub enum EditState {
    #[default]
    Idle,
    Editing(usize),
}

/// Input widget hint for one editable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Checkbox,
}

/// One editable value in a draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditableField {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub input: InputKind,
    /// Original value, used as the form default.
    pub default: Value,
}

/// Editable copy of one record.
///
/// Holds one entry per key present in the record (not per dataset field),
/// in the record's key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditDraft {
    pub index: usize,
    pub fields: Vec<EditableField>,
}

impl EditDraft {
    fn from_record(index: usize, record: &Record) -> Self {
        let fields = record
            .iter()
            .map(|(key, value)| EditableField {
                key: key.clone(),
                label: label_from_key(key),
                input: match value {
                    Value::Bool(_) => InputKind::Checkbox,
                    _ => InputKind::Text,
                },
                default: value.clone(),
            })
            .collect();

        Self { index, fields }
    }

    /// The draft's default values as a record.
    pub fn values(&self) -> Record {
        self.fields
            .iter()
            .map(|f| (f.key.clone(), f.default.clone()))
            .collect()
    }
}

/// Tracks the single in-flight edit.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: EditState,
    draft: Option<EditDraft>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn draft(&self) -> Option<&EditDraft> {
        self.draft.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing(_))
    }

    /// Start editing `dataset.records[index]`.
    ///
    /// An open edit is cancelled first. An out-of-range index is a caller
    /// bug and fails without changing state.
    pub fn begin(&mut self, dataset: &Dataset, index: usize) -> EditResult<&EditDraft> {
        let record = dataset
            .records
            .get(index)
            .ok_or(EditError::IndexOutOfRange {
                index,
                len: dataset.records.len(),
            })?;

        if let EditState::Editing(open) = self.state {
            log_warning(format!("Edit of record {} cancelled by new edit of record {}", open, index));
            self.cancel();
        }

        self.state = EditState::Editing(index);
        Ok(self.draft.insert(EditDraft::from_record(index, record)))
    }

    /// Replace the edited record with `values` and return to `Idle`.
    ///
    /// The replacement is total: keys missing from `values` are dropped from
    /// the stored record. Marks the row as last edited in `grid`.
    pub fn commit(
        &mut self,
        dataset: &mut Dataset,
        grid: &mut GridState,
        values: Record,
    ) -> EditResult<usize> {
        let EditState::Editing(index) = self.state else {
            return Err(EditError::NotEditing);
        };

        let len = dataset.records.len();
        let slot = dataset
            .records
            .get_mut(index)
            .ok_or(EditError::IndexOutOfRange { index, len })?;

        *slot = values;
        grid.mark_edited(index);
        self.reset();
        Ok(index)
    }

    /// Discard the draft. Returns the index that was being edited, if any.
    pub fn cancel(&mut self) -> Option<usize> {
        let open = match self.state {
            EditState::Editing(index) => Some(index),
            EditState::Idle => None,
        };
        self.reset();
        open
    }

    fn reset(&mut self) {
        self.state = EditState::Idle;
        self.draft = None;
    }
}
