//! Dimension validation for documents headed into vector-indexed fields.

use bson::{Bson, Document};

use crate::document::value_at_path;
use crate::error::{EmbeddingError, Result};

/// A vector-typed field extracted from a search index definition.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorField {
    pub path: String,
    pub num_dimensions: u32,
    pub similarity: Option<String>,
    pub quantization: Option<String>,
    /// Fields declared filter-eligible alongside the vector field.
    pub filter_paths: Vec<String>,
}

/// Number of elements when `value` is an all-numeric array, `None` otherwise.
pub fn vector_dimensions(value: &Bson) -> Option<usize> {
    match value {
        Bson::Array(items) => items
            .iter()
            .all(|item| {
                matches!(item, Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_))
            })
            .then_some(items.len()),
        _ => None,
    }
}

/// Check every known vector field present in `doc` against its indexed
/// dimensionality. Absent fields pass.
pub fn validate_document_vectors(doc: &Document, fields: &[VectorField]) -> Result<()> {
    for field in fields {
        let Some(value) = value_at_path(doc, &field.path) else {
            continue;
        };
        match vector_dimensions(value) {
            Some(actual) if actual == field.num_dimensions as usize => {}
            Some(actual) => {
                return Err(EmbeddingError::DimensionMismatch(mismatch_message(
                    &field.path,
                    field.num_dimensions,
                    Some(actual),
                )));
            }
            None => {
                return Err(EmbeddingError::DimensionMismatch(mismatch_message(
                    &field.path,
                    field.num_dimensions,
                    None,
                )));
            }
        }
    }
    Ok(())
}

fn mismatch_message(path: &str, expected: u32, actual: Option<usize>) -> String {
    let (actual, kind) = match actual {
        Some(n) => (n.to_string(), "dimension-mismatch"),
        None => ("unknown".to_string(), "not-a-vector"),
    };
    format!(
        "Field {path} is an embedding with {expected} dimensions, and the provided value is not compatible. Actual dimensions: {actual}, Error: {kind}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn field(path: &str, dims: u32) -> VectorField {
        VectorField {
            path: path.to_string(),
            num_dimensions: dims,
            similarity: Some("cosine".to_string()),
            quantization: None,
            filter_paths: Vec::new(),
        }
    }

    #[test]
    fn matching_vector_passes() {
        let d = doc! { "embedding": [0.1, 0.2, 0.3] };
        validate_document_vectors(&d, &[field("embedding", 3)]).expect("valid");
    }

    #[test]
    fn absent_field_passes() {
        let d = doc! { "title": "The Matrix" };
        validate_document_vectors(&d, &[field("embedding", 256)]).expect("valid");
    }

    #[test]
    fn string_value_is_not_a_vector() {
        let d = doc! { "embedding": "oopsie" };
        let err = validate_document_vectors(&d, &[field("embedding", 256)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field embedding is an embedding with 256 dimensions, and the provided value is not compatible. Actual dimensions: unknown, Error: not-a-vector"
        );
    }

    #[test]
    fn wrong_length_reports_actual_dimensions() {
        let d = doc! { "embedding": [0.1, 0.2] };
        let err = validate_document_vectors(&d, &[field("embedding", 256)]).unwrap_err();
        assert!(err.to_string().contains("Actual dimensions: 2"), "{err}");
        assert!(err.to_string().contains("Error: dimension-mismatch"), "{err}");
    }

    #[test]
    fn mixed_type_array_is_not_a_vector() {
        let d = doc! { "embedding": [0.1, "x"] };
        let err = validate_document_vectors(&d, &[field("embedding", 2)]).unwrap_err();
        assert!(err.to_string().contains("not-a-vector"), "{err}");
    }

    #[test]
    fn integer_arrays_count_as_vectors() {
        let d = doc! { "embedding": [1, 2, 3] };
        validate_document_vectors(&d, &[field("embedding", 3)]).expect("valid");
    }
}
