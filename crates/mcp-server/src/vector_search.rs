//! Vector-search embeddings manager.
//!
//! Bridges the search-index definitions of a namespace with the embedding
//! service: detects vector-indexed fields, rewrites raw text into generated
//! vectors (one batched service call per operation) and validates vector
//! dimensions before anything is written.

use std::collections::BTreeMap;
use std::sync::Arc;

use bson::{Bson, Document};

use mongo_mcp_embeddings::{
    delete_dotted_path, set_literal_key, validate_document_vectors, EmbeddingParameters,
    EmbeddingService, InputType, VectorField,
};

use crate::error::{ErrorCode, ServerError};
use crate::provider::Provider;

/// A search index reduced to what gating and rewriting need.
#[derive(Clone, Debug)]
pub struct SearchIndexInfo {
    pub name: String,
    pub queryable: bool,
    pub vector_fields: Vec<VectorField>,
}

pub struct VectorSearchEmbeddingsManager {
    service: Arc<dyn EmbeddingService>,
}

impl VectorSearchEmbeddingsManager {
    pub fn new(service: Arc<dyn EmbeddingService>) -> Self {
        Self { service }
    }

    /// Introspect the vector-search indexes of a namespace.
    pub async fn search_indexes(
        provider: &dyn Provider,
        db: &str,
        coll: &str,
    ) -> Result<Vec<SearchIndexInfo>, ServerError> {
        let raw = provider.list_search_indexes(db, coll).await?;
        Ok(raw.iter().filter_map(parse_search_index).collect())
    }

    /// All vector-typed fields of a namespace, across its indexes.
    pub async fn embeddings_for_namespace(
        provider: &dyn Provider,
        db: &str,
        coll: &str,
    ) -> Result<Vec<VectorField>, ServerError> {
        let indexes = Self::search_indexes(provider, db, coll).await?;
        Ok(indexes
            .into_iter()
            .flat_map(|index| index.vector_fields)
            .collect())
    }

    /// Whether a named vector index exists and is queryable.
    pub async fn index_exists(
        provider: &dyn Provider,
        db: &str,
        coll: &str,
        name: &str,
    ) -> Result<bool, ServerError> {
        let indexes = Self::search_indexes(provider, db, coll).await?;
        Ok(indexes
            .iter()
            .any(|index| index.name == name && index.queryable && !index.vector_fields.is_empty()))
    }

    /// Rewrite documents for insertion: generate embeddings for every
    /// `(fieldPath, rawText)` pair of `input` and assign them under literal
    /// dotted keys. One batched service call covers the whole insert.
    pub async fn rewrite_documents_for_insert(
        &self,
        provider: &dyn Provider,
        db: &str,
        coll: &str,
        docs: &mut [Document],
        input: &[BTreeMap<String, String>],
        params: &EmbeddingParameters,
    ) -> Result<(), ServerError> {
        if input.is_empty() {
            return Ok(());
        }
        if input.len() != docs.len() {
            return Err(ServerError::invalid_arguments(format!(
                "embeddingParameters.input has {} entries for {} documents; they must align positionally",
                input.len(),
                docs.len()
            )));
        }

        let fields = Self::embeddings_for_namespace(provider, db, coll).await?;

        let mut texts = Vec::new();
        let mut targets: Vec<(usize, String)> = Vec::new();
        for (index, entry) in input.iter().enumerate() {
            for (path, raw_text) in entry {
                if !fields.iter().any(|field| &field.path == path) {
                    return Err(unknown_vector_field(path, db, coll));
                }
                texts.push(raw_text.clone());
                targets.push((index, path.clone()));
            }
        }
        if texts.is_empty() {
            return Ok(());
        }

        let vectors = self
            .service
            .generate(&texts, params, InputType::Document)
            .await
            .map_err(ServerError::from)?;

        for ((doc_index, path), vector) in targets.into_iter().zip(vectors) {
            let doc = &mut docs[doc_index];
            delete_dotted_path(doc, &path);
            set_literal_key(doc, &path, vector_to_bson(&vector));
        }
        Ok(())
    }

    /// Rewrite every `$vectorSearch` stage whose `queryVector` is a raw
    /// string. A string without `embeddingParameters` is an invalid query;
    /// a real vector with stray `embeddingParameters` has them dropped.
    pub async fn rewrite_pipeline(
        &self,
        provider: &dyn Provider,
        db: &str,
        coll: &str,
        pipeline: &mut [Document],
    ) -> Result<(), ServerError> {
        let mut fields: Option<Vec<VectorField>> = None;

        for stage in pipeline.iter_mut() {
            let Some(Bson::Document(search)) = stage.get_mut("$vectorSearch") else {
                continue;
            };

            let raw_query = match search.get("queryVector") {
                Some(Bson::String(raw)) => Some(raw.clone()),
                _ => None,
            };

            let Some(raw_query) = raw_query else {
                // Already a vector; stray parameters are dropped silently.
                search.remove("embeddingParameters");
                continue;
            };

            let params = match search.get("embeddingParameters") {
                Some(value) => bson::from_bson::<EmbeddingParameters>(value.clone()).map_err(
                    |err| {
                        ServerError::new(
                            ErrorCode::AtlasVectorSearchInvalidQuery,
                            format!("Invalid embeddingParameters in $vectorSearch: {err}"),
                        )
                    },
                )?,
                None => {
                    return Err(ServerError::new(
                        ErrorCode::AtlasVectorSearchInvalidQuery,
                        "queryVector is a raw string but $vectorSearch has no embeddingParameters",
                    ));
                }
            };

            let path = search.get_str("path").unwrap_or_default().to_string();
            if fields.is_none() {
                fields = Some(Self::embeddings_for_namespace(provider, db, coll).await?);
            }
            let known = fields.as_ref().map(|f| f.as_slice()).unwrap_or_default();
            if !known.iter().any(|field| field.path == path) {
                return Err(unknown_vector_field(&path, db, coll));
            }

            let vectors = self
                .service
                .generate(&[raw_query], &params, InputType::Query)
                .await
                .map_err(ServerError::from)?;
            let vector = vectors.into_iter().next().ok_or_else(|| {
                ServerError::new(
                    ErrorCode::EmbeddingServiceError,
                    "embedding service returned no vector for the query",
                )
            })?;

            search.insert("queryVector", vector_to_bson(&vector));
            search.remove("embeddingParameters");
        }
        Ok(())
    }
}

/// Dimension-validate a batch of documents against the namespace's vector
/// fields, honoring `disableEmbeddingsValidation`.
pub fn validate_documents(
    docs: &[Document],
    fields: &[VectorField],
    disabled: bool,
) -> Result<(), ServerError> {
    if disabled || fields.is_empty() {
        return Ok(());
    }
    for doc in docs {
        validate_document_vectors(doc, fields)?;
    }
    Ok(())
}

/// Dimension-validate documents spelled out inline in a pipeline
/// (`$documents` stages).
pub fn validate_pipeline_documents(
    pipeline: &[Document],
    fields: &[VectorField],
    disabled: bool,
) -> Result<(), ServerError> {
    if disabled || fields.is_empty() {
        return Ok(());
    }
    for stage in pipeline {
        let Some(Bson::Array(docs)) = stage.get("$documents") else {
            continue;
        };
        for value in docs {
            if let Bson::Document(doc) = value {
                validate_document_vectors(doc, fields)?;
            }
        }
    }
    Ok(())
}

/// Fields referenced by a `$vectorSearch.filter` expression.
pub fn filter_fields(filter: &Document) -> Vec<String> {
    let mut out = Vec::new();
    collect_filter_fields(filter, &mut out);
    out
}

fn collect_filter_fields(filter: &Document, out: &mut Vec<String>) {
    for (key, value) in filter {
        if key.starts_with('$') {
            if let Bson::Array(clauses) = value {
                for clause in clauses {
                    if let Bson::Document(inner) = clause {
                        collect_filter_fields(inner, out);
                    }
                }
            }
        } else if !out.contains(key) {
            out.push(key.clone());
        }
    }
}

/// Check that every field referenced by a `$vectorSearch.filter` is
/// declared filter-eligible in the index the stage targets.
pub fn validate_vector_search_filter(
    stage: &Document,
    indexes: &[SearchIndexInfo],
) -> Result<(), ServerError> {
    let Some(Bson::Document(search)) = stage.get("$vectorSearch") else {
        return Ok(());
    };
    let Some(Bson::Document(filter)) = search.get("filter") else {
        return Ok(());
    };

    let index_name = search.get_str("index").unwrap_or_default();
    let allowed: Vec<&str> = indexes
        .iter()
        .filter(|index| index_name.is_empty() || index.name == index_name)
        .flat_map(|index| &index.vector_fields)
        .flat_map(|field| &field.filter_paths)
        .map(String::as_str)
        .collect();

    for field in filter_fields(filter) {
        if !allowed.contains(&field.as_str()) {
            return Err(ServerError::new(
                ErrorCode::AtlasVectorSearchInvalidQuery,
                format!(
                    "Field '{field}' is not declared as a filter field in the vector index definition"
                ),
            ));
        }
    }
    Ok(())
}

fn unknown_vector_field(path: &str, db: &str, coll: &str) -> ServerError {
    ServerError::new(
        ErrorCode::AtlasVectorSearchInvalidQuery,
        format!("Field '{path}' does not have a vector search index in collection '{db}.{coll}'"),
    )
}

fn vector_to_bson(vector: &[f64]) -> Bson {
    Bson::Array(vector.iter().map(|v| Bson::Double(*v)).collect())
}

fn parse_search_index(doc: &Document) -> Option<SearchIndexInfo> {
    let name = doc.get_str("name").ok()?.to_string();
    let queryable = doc.get_bool("queryable").unwrap_or(false);
    let definition = doc.get_document("latestDefinition").ok();

    let mut vector_fields = Vec::new();
    if let Some(definition) = definition {
        if let Ok(fields) = definition.get_array("fields") {
            let filter_paths: Vec<String> = fields
                .iter()
                .filter_map(|f| f.as_document())
                .filter(|f| f.get_str("type") == Ok("filter"))
                .filter_map(|f| f.get_str("path").ok().map(str::to_string))
                .collect();

            for field in fields.iter().filter_map(|f| f.as_document()) {
                if field.get_str("type") != Ok("vector") {
                    continue;
                }
                let Ok(path) = field.get_str("path") else {
                    continue;
                };
                let num_dimensions = match field.get("numDimensions") {
                    Some(Bson::Int32(n)) => *n as u32,
                    Some(Bson::Int64(n)) => *n as u32,
                    Some(Bson::Double(n)) => *n as u32,
                    _ => continue,
                };
                vector_fields.push(VectorField {
                    path: path.to_string(),
                    num_dimensions,
                    similarity: field.get_str("similarity").ok().map(str::to_string),
                    quantization: field.get_str("quantization").ok().map(str::to_string),
                    filter_paths: filter_paths.clone(),
                });
            }
        }
    }

    Some(SearchIndexInfo {
        name,
        queryable,
        vector_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn vector_index(name: &str, path: &str, dims: i32, queryable: bool) -> Document {
        doc! {
            "name": name,
            "type": "vectorSearch",
            "status": "READY",
            "queryable": queryable,
            "latestDefinition": {
                "fields": [
                    { "type": "vector", "path": path, "numDimensions": dims, "similarity": "cosine" },
                    { "type": "filter", "path": "genre" },
                ]
            }
        }
    }

    #[test]
    fn parses_vector_fields_and_filters() {
        let info = parse_search_index(&vector_index("default", "plotEmbedding", 1024, true))
            .expect("parsed");
        assert_eq!(info.name, "default");
        assert!(info.queryable);
        assert_eq!(info.vector_fields.len(), 1);
        let field = &info.vector_fields[0];
        assert_eq!(field.path, "plotEmbedding");
        assert_eq!(field.num_dimensions, 1024);
        assert_eq!(field.filter_paths, vec!["genre".to_string()]);
    }

    #[test]
    fn filter_fields_recurse_into_logical_operators() {
        let filter = doc! {
            "$and": [
                { "genre": "sci-fi" },
                { "$or": [ { "year": { "$gte": 1999 } }, { "rating": 5 } ] },
            ]
        };
        let fields = filter_fields(&filter);
        assert_eq!(fields, vec!["genre", "year", "rating"]);
    }

    #[test]
    fn filter_validation_rejects_undeclared_fields() {
        let indexes = vec![SearchIndexInfo {
            name: "default".to_string(),
            queryable: true,
            vector_fields: vec![VectorField {
                path: "plotEmbedding".to_string(),
                num_dimensions: 1024,
                similarity: None,
                quantization: None,
                filter_paths: vec!["genre".to_string()],
            }],
        }];

        let ok_stage = doc! { "$vectorSearch": {
            "index": "default", "path": "plotEmbedding",
            "queryVector": [0.1], "filter": { "genre": "sci-fi" },
        }};
        validate_vector_search_filter(&ok_stage, &indexes).expect("genre is declared");

        let bad_stage = doc! { "$vectorSearch": {
            "index": "default", "path": "plotEmbedding",
            "queryVector": [0.1], "filter": { "director": "Wachowski" },
        }};
        let err = validate_vector_search_filter(&bad_stage, &indexes).unwrap_err();
        assert_eq!(err.code, ErrorCode::AtlasVectorSearchInvalidQuery);
        assert!(err.message.contains("director"), "{}", err.message);
    }

    #[test]
    fn pipeline_document_validation_checks_inline_documents() {
        let fields = vec![VectorField {
            path: "embedding".to_string(),
            num_dimensions: 2,
            similarity: None,
            quantization: None,
            filter_paths: Vec::new(),
        }];
        let pipeline = vec![doc! { "$documents": [ { "embedding": "text" } ] }];
        let err = validate_pipeline_documents(&pipeline, &fields, false).unwrap_err();
        assert_eq!(err.code, ErrorCode::EmbeddingDimensionMismatch);
        // Suppressed when validation is disabled.
        validate_pipeline_documents(&pipeline, &fields, true).expect("disabled");
    }
}
