//! Dataset validation.
//!
//! Checks run before a dataset reaches the rendering layer. Only the header
//! is inspected: the field list must be non-empty and its keys unique.
//! Record contents are never validated (sparse and extra keys are legal).
//!
//! # Example
//!
//! ```rust,ignore
//! use gridform::{validate, Dataset, Field};
//!
//! let dataset = Dataset::new(vec![Field::from_key("name")], vec![]);
//! assert!(validate(&dataset).is_ok());
//! ```

use std::collections::HashSet;

use crate::error::{ValidationError, ValidationResult};
use crate::models::Dataset;

/// Validate a dataset's field list.
///
/// # Returns
/// * `Ok(())` if the dataset can be rendered
/// * `Err(ValidationError::EmptyDataset)` if there are no fields
/// * `Err(ValidationError::DuplicateKey)` naming the first repeated key
pub fn validate(dataset: &Dataset) -> ValidationResult<()> {
    if dataset.fields.is_empty() {
        return Err(ValidationError::EmptyDataset);
    }

    let mut seen = HashSet::with_capacity(dataset.fields.len());
    for field in &dataset.fields {
        if !seen.insert(field.key.as_str()) {
            return Err(ValidationError::DuplicateKey(field.key.clone()));
        }
    }

    Ok(())
}

/// Quick check: returns just true/false.
pub fn is_valid(dataset: &Dataset) -> bool {
    validate(dataset).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;

    #[test]
    fn test_valid_dataset() {
        let dataset = Dataset::new(
            vec![Field::from_key("name"), Field::from_key("age")],
            Vec::new(),
        );
        assert!(is_valid(&dataset));
    }

    #[test]
    fn test_empty_fields_rejected() {
        let dataset = Dataset::default();
        assert_eq!(validate(&dataset), Err(ValidationError::EmptyDataset));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let dataset = Dataset::new(
            vec![
                Field::from_key("name"),
                Field::from_key("age"),
                Field::new("name", "Other Name"),
            ],
            Vec::new(),
        );
        assert_eq!(
            validate(&dataset),
            Err(ValidationError::DuplicateKey("name".into()))
        );
    }
}
