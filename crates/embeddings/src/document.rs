//! Dotted-path surgery on BSON documents.
//!
//! Insert rewriting removes any pre-existing nested value at a vector field
//! path and then assigns the generated vector under the literal dotted key;
//! the storage layer interprets the literal key as a nested write.

use bson::{Bson, Document};

/// Delete the value at a dotted `path` inside `doc`, descending through
/// nested documents. Missing intermediate keys are a no-op.
pub fn delete_dotted_path(doc: &mut Document, path: &str) {
    let mut segments = path.split('.').peekable();
    let mut current = doc;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.remove(segment);
            return;
        }
        match current.get_mut(segment) {
            Some(Bson::Document(inner)) => current = inner,
            _ => return,
        }
    }
}

/// Assign `value` under `path` as a single top-level key, dots preserved.
pub fn set_literal_key(doc: &mut Document, path: &str, value: Bson) {
    doc.insert(path.to_string(), value);
}

/// Read the value at `path`: first as a literal top-level key, then by
/// descending through nested documents.
pub fn value_at_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    if let Some(value) = doc.get(path) {
        return Some(value);
    }

    let mut segments = path.split('.').peekable();
    let mut current = doc;
    while let Some(segment) = segments.next() {
        let value = current.get(segment)?;
        if segments.peek().is_none() {
            return Some(value);
        }
        match value {
            Bson::Document(inner) => current = inner,
            _ => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn deletes_nested_value() {
        let mut d = doc! { "a": { "b": { "c": 1 }, "keep": true } };
        delete_dotted_path(&mut d, "a.b.c");
        assert_eq!(d, doc! { "a": { "b": {}, "keep": true } });
    }

    #[test]
    fn delete_is_a_noop_when_intermediate_key_is_absent() {
        let mut d = doc! { "a": 1 };
        delete_dotted_path(&mut d, "x.y");
        delete_dotted_path(&mut d, "a.y");
        assert_eq!(d, doc! { "a": 1 });
    }

    #[test]
    fn literal_key_keeps_dots() {
        let mut d = doc! { "title": "The Matrix" };
        set_literal_key(&mut d, "meta.embedding", Bson::Array(vec![Bson::Double(0.5)]));
        assert!(d.contains_key("meta.embedding"));
        assert_eq!(d.get_str("title").unwrap(), "The Matrix");
    }

    #[test]
    fn value_lookup_prefers_literal_then_nested() {
        let d = doc! { "a.b": 1, "a": { "b": 2 } };
        assert_eq!(value_at_path(&d, "a.b"), Some(&Bson::Int32(1)));

        let nested = doc! { "a": { "b": 2 } };
        assert_eq!(value_at_path(&nested, "a.b"), Some(&Bson::Int32(2)));
        assert_eq!(value_at_path(&nested, "a.c"), None);
        assert_eq!(value_at_path(&nested, "z"), None);
    }
}
