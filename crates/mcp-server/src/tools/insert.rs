//! The `insert-many` tool.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document};
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;

use mongo_mcp_config::PreviewFeature;
use mongo_mcp_embeddings::{EmbeddingParameters, OutputDtype, VoyageModel};

use crate::error::{ErrorCode, ServerError};
use crate::provider::Provider;
use crate::tool::{
    parse_args, schema_for, OperationType, ServerTool, ToolCategory, ToolContext, ToolOutput,
};
use crate::tools::namespace;
use crate::vector_search::{validate_documents, VectorSearchEmbeddingsManager};

fn default_output_dimension() -> u32 {
    1024
}

/// Embedding parameters for insertion: the generation settings plus the
/// raw-text inputs aligned positionally with the documents array.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InsertEmbeddingParameters {
    pub model: VoyageModel,
    #[serde(default = "default_output_dimension")]
    pub output_dimension: u32,
    #[serde(default)]
    pub output_dtype: OutputDtype,
    /// One map per document: `fieldPath -> raw text` to embed.
    #[serde(default)]
    pub input: Vec<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InsertManyRequest {
    pub database: String,
    pub collection: String,
    /// Documents to insert, as extended JSON.
    #[schemars(with = "Vec<crate::tool::JsonDocument>")]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub embedding_parameters: Option<InsertEmbeddingParameters>,
}

pub struct InsertManyTool;

impl InsertManyTool {
    /// Vector fields of the namespace; deployments without search support
    /// simply have none.
    async fn vector_fields(
        provider: &dyn Provider,
        db: &str,
        coll: &str,
    ) -> Vec<mongo_mcp_embeddings::VectorField> {
        match VectorSearchEmbeddingsManager::embeddings_for_namespace(provider, db, coll).await {
            Ok(fields) => fields,
            Err(err) => {
                log::debug!("search-index introspection unavailable for {db}.{coll}: {err}");
                Vec::new()
            }
        }
    }

    fn id_display(id: &Bson) -> String {
        match id {
            Bson::ObjectId(oid) => oid.to_hex(),
            Bson::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl ServerTool for InsertManyTool {
    fn name(&self) -> &'static str {
        "insert-many"
    }

    fn description(&self) -> &'static str {
        "Insert documents into a collection, optionally generating embeddings for vector-indexed fields."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Create
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<InsertManyRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: InsertManyRequest = parse_args(args)?;
        if request.documents.is_empty() {
            return Err(ServerError::invalid_arguments(
                "documents must contain at least one document",
            ));
        }
        let provider = ctx.session.ensure_connected().await?;
        let mut documents = request.documents;

        let vector_search_on = ctx.config.feature_enabled(PreviewFeature::VectorSearch);
        if vector_search_on {
            if let Some(params) = &request.embedding_parameters {
                if !params.input.is_empty() {
                    let service = ctx.session.embedding_service().ok_or_else(|| {
                        ServerError::new(
                            ErrorCode::EmbeddingServiceError,
                            "embedding generation requested but no voyageApiKey is configured",
                        )
                    })?;
                    let manager = VectorSearchEmbeddingsManager::new(service);
                    let generation = EmbeddingParameters {
                        model: params.model,
                        output_dimension: params.output_dimension,
                        output_dtype: params.output_dtype,
                    };
                    manager
                        .rewrite_documents_for_insert(
                            provider.as_ref(),
                            &request.database,
                            &request.collection,
                            &mut documents,
                            &params.input,
                            &generation,
                        )
                        .await?;
                }
            }
        }

        let fields =
            Self::vector_fields(provider.as_ref(), &request.database, &request.collection).await;
        validate_documents(
            &documents,
            &fields,
            ctx.config.disable_embeddings_validation,
        )?;

        let count = documents.len();
        let ids = provider
            .insert_many(&request.database, &request.collection, documents)
            .await?;

        let ns = namespace(&request.database, &request.collection);
        let id_list = ids
            .iter()
            .map(Self::id_display)
            .collect::<Vec<_>>()
            .join(", ");
        Ok(ToolOutput::texts(vec![
            "Documents were inserted successfully.".to_string(),
            format!("Inserted `{count}` document(s) into {ns}."),
            format!("Inserted IDs: {id_list}"),
        ])
        .with_metadata("documents", serde_json::Value::from(count)))
    }
}
