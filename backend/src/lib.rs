//! # Gridform - tabular data engine
//!
//! Gridform holds a flat dataset (ordered fields plus records), imports and
//! exports it as JSON or CSV, reconciles grouped form specs into rows, and
//! edits single records through an explicit transaction.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ JSON / CSV  │────▶│   Parser    │────▶│   Engine    │────▶│    Store    │
//! │  form spec  │     │ (auto-enc)  │     │ (edit, swap)│     │ (snapshot)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                                         DatasetChanged
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gridform::{GridEngine, MemoryStore};
//!
//! let mut engine = GridEngine::init(MemoryStore::new(), "savedGridData");
//! engine.import_csv("name,age\nAlice,30")?;
//! engine.on_edit_requested(0)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Dataset, Field, Record, GridState
//! - [`parser`] - CSV codec and byte decoding
//! - [`validation`] - Dataset invariants
//! - [`transform`] - Form-spec reconciler and import/export pipeline
//! - [`edit`] - Edit transaction state machine
//! - [`store`] - Key/value persistence gateway
//! - [`repository`] - Id-keyed record collection
//! - [`engine`] - The grid engine
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Editing
pub mod edit;

// Persistence
pub mod repository;
pub mod store;

// Engine
pub mod broadcast;
pub mod config;
pub mod engine;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError, EditError, EngineError, ImportError, ServerError, StoreError, ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{label_from_key, Dataset, Field, GridState, Record, EMPTY_CELL};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{decode, decode_bytes_auto, decode_content, detect_encoding, encode};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid, validate};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::pipeline::{export_csv, export_json, import_csv, import_json, FileFormat};
pub use transform::reconciler::{form_spec_to_dataset, FieldDef, FormSection};

// =============================================================================
// Re-exports - Edit / Engine
// =============================================================================

pub use config::EngineConfig;
pub use edit::{EditDraft, EditSession, EditState};
pub use engine::{DatasetChanged, Export, GridEngine};

// =============================================================================
// Re-exports - Persistence
// =============================================================================

pub use repository::{Direction, RecordRepository};
pub use store::{FileStore, KeyValueStore, MemoryStore};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
