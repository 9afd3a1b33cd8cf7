//! REST API types for renderer integration.
//!
//! All payloads are camelCase JSON. Records are passed through untouched so
//! key order and value types survive the trip to the browser.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::edit::EditState;
use crate::models::{Dataset, Field, GridState, Record};

/// Current grid contents plus UI state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetResponse {
    pub fields: Vec<Field>,
    pub records: Vec<Record>,
    pub grid_state: GridState,
    pub edit_state: EditState,
}

impl DatasetResponse {
    pub fn new(dataset: &Dataset, grid_state: GridState, edit_state: EditState) -> Self {
        Self {
            fields: dataset.fields.clone(),
            records: dataset.records.clone(),
            grid_state,
            edit_state,
        }
    }
}

/// Response sent after a successful file import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    /// Unique import identifier, echoed in the server log
    pub import_id: String,

    /// Always "ready" on success
    pub status: String,

    pub file_name: Option<String>,
    pub record_count: usize,
    pub field_count: usize,
    pub dataset: Dataset,
}

impl ImportResponse {
    pub fn new(file_name: Option<String>, dataset: &Dataset) -> Self {
        Self {
            import_id: Uuid::new_v4().to_string(),
            status: "ready".to_string(),
            file_name,
            record_count: dataset.len(),
            field_count: dataset.fields.len(),
            dataset: dataset.clone(),
        }
    }
}

/// Response to a committed edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    /// Row that was replaced (and should be highlighted)
    pub index: usize,
    pub record: Record,
}

/// Response to a cancelled edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    /// Row whose edit was discarded, if one was open
    pub cancelled: Option<usize>,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}
