//! Transformation module.
//!
//! - Reconciler: grouped form specs to a flat dataset
//! - Pipeline: JSON/CSV import and export of whole datasets

pub mod pipeline;
pub mod reconciler;

pub use pipeline::*;
pub use reconciler::{form_spec_to_dataset, split_indexed_key, FieldDef, FormSection};
