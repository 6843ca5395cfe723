//! The `aggregate` tool.
//!
//! Aggregation carries the heaviest policy load of the catalog: write-stage
//! gating, search-support probing, vector-search filter and index checks,
//! embedding rewrites, and capped, counted cursor consumption.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::content::{documents_to_extjson, wrap_untrusted};
use crate::error::{ErrorCode, ServerError};
use crate::provider::Provider;
use crate::tool::{
    parse_args, schema_for, OperationType, ServerTool, ToolCategory, ToolContext, ToolOutput,
};
use crate::tools::{collect_capped, effective_byte_limit, namespace};
use crate::vector_search::{
    validate_pipeline_documents, validate_vector_search_filter, VectorSearchEmbeddingsManager,
};

const COUNT_MAX_TIME: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AggregateRequest {
    pub database: String,
    pub collection: String,
    /// Aggregation pipeline stages as extended JSON.
    #[schemars(with = "Vec<crate::tool::JsonDocument>")]
    pub pipeline: Vec<Document>,
    /// Per-call response size cap in bytes.
    #[serde(default)]
    pub response_bytes_limit: Option<u64>,
}

pub struct AggregateTool;

impl AggregateTool {
    fn stage_has(pipeline: &[Document], key: &str) -> bool {
        pipeline.iter().any(|stage| stage.contains_key(key))
    }

    async fn enforce_index_use(
        provider: &dyn Provider,
        db: &str,
        coll: &str,
        pipeline: &[Document],
    ) -> Result<(), ServerError> {
        let explain = provider
            .run_command(
                db,
                doc! {
                    "explain": { "aggregate": coll, "pipeline": pipeline, "cursor": {} },
                    "verbosity": "queryPlanner",
                },
            )
            .await?;
        if crate::tools::plan_is_collection_scan(&explain) {
            return Err(ServerError::new(
                ErrorCode::ForbiddenReadOperation,
                format!(
                    "The query plan for {} is a full collection scan and indexCheck is enabled; add an index or adjust the pipeline",
                    namespace(db, coll)
                ),
            ));
        }
        Ok(())
    }

    /// Total document count for the uncapped pipeline, bounded in time.
    /// `None` means the total is indeterminable.
    async fn count_total(
        provider: &dyn Provider,
        db: &str,
        coll: &str,
        pipeline: &[Document],
    ) -> Option<u64> {
        let mut count_pipeline = pipeline.to_vec();
        count_pipeline.push(doc! { "$count": "totalDocuments" });

        let run = async {
            let mut stream = provider
                .aggregate(db, coll, count_pipeline, Some(COUNT_MAX_TIME))
                .await
                .ok()?;
            use futures::StreamExt;
            match stream.next().await {
                Some(Ok(doc)) => match doc.get("totalDocuments") {
                    Some(Bson::Int32(n)) => Some(*n as u64),
                    Some(Bson::Int64(n)) => Some(*n as u64),
                    Some(Bson::Double(n)) => Some(*n as u64),
                    _ => None,
                },
                // An empty result set counts as zero.
                None => Some(0),
                Some(Err(_)) => None,
            }
        };
        tokio::time::timeout(COUNT_MAX_TIME, run).await.ok().flatten()
    }
}

#[async_trait]
impl ServerTool for AggregateTool {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn description(&self) -> &'static str {
        "Run an aggregation pipeline against a collection, including $vectorSearch with generated query embeddings."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Read
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<AggregateRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: AggregateRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;
        let db = &request.database;
        let coll = &request.collection;
        let mut pipeline = request.pipeline;

        // Stage permissions: $out/$merge are writes dressed as reads.
        let writes_disabled = ctx.config.read_only
            || ctx
                .config
                .disabled_tools
                .iter()
                .any(|entry| matches!(entry.as_str(), "create" | "update" | "delete"));
        if writes_disabled
            && (Self::stage_has(&pipeline, "$out") || Self::stage_has(&pipeline, "$merge"))
        {
            return Err(ServerError::forbidden_write(
                "The pipeline contains $out or $merge, which write to a collection, but write operations are disabled",
            ));
        }

        let uses_vector_search = Self::stage_has(&pipeline, "$vectorSearch");
        if uses_vector_search {
            if !provider.supports_search(db, coll).await? {
                return Err(ServerError::new(
                    ErrorCode::AtlasSearchNotSupported,
                    "The connected deployment does not support Atlas Search; $vectorSearch is unavailable",
                ));
            }

            let indexes = VectorSearchEmbeddingsManager::search_indexes(provider.as_ref(), db, coll)
                .await?;
            for stage in &pipeline {
                validate_vector_search_filter(stage, &indexes)?;
            }

            if ctx.config.index_check {
                for stage in &pipeline {
                    let Some(Bson::Document(search)) = stage.get("$vectorSearch") else {
                        continue;
                    };
                    let index_name = search.get_str("index").unwrap_or("default");
                    let exists = indexes.iter().any(|index| {
                        index.name == index_name
                            && index.queryable
                            && !index.vector_fields.is_empty()
                    });
                    if !exists {
                        return Err(ServerError::new(
                            ErrorCode::AtlasVectorSearchIndexNotFound,
                            format!(
                                "Vector search index '{index_name}' was not found on {}",
                                namespace(db, coll)
                            ),
                        ));
                    }
                }
            }
        } else if ctx.config.index_check {
            Self::enforce_index_use(provider.as_ref(), db, coll, &pipeline).await?;
        }

        // Rewrite raw-text query vectors, then validate inline documents.
        if uses_vector_search {
            let needs_rewrite = pipeline.iter().any(|stage| {
                matches!(
                    stage
                        .get_document("$vectorSearch")
                        .ok()
                        .and_then(|s| s.get("queryVector")),
                    Some(Bson::String(_))
                )
            });
            if needs_rewrite {
                let service = ctx.session.embedding_service().ok_or_else(|| {
                    ServerError::new(
                        ErrorCode::EmbeddingServiceError,
                        "queryVector rewriting requested but no voyageApiKey is configured",
                    )
                })?;
                VectorSearchEmbeddingsManager::new(service)
                    .rewrite_pipeline(provider.as_ref(), db, coll, &mut pipeline)
                    .await?;
            } else {
                // A vector queryVector with stray embeddingParameters still
                // gets the silent drop.
                for stage in pipeline.iter_mut() {
                    if let Some(Bson::Document(search)) = stage.get_mut("$vectorSearch") {
                        search.remove("embeddingParameters");
                    }
                }
            }

            let fields = VectorSearchEmbeddingsManager::embeddings_for_namespace(
                provider.as_ref(),
                db,
                coll,
            )
            .await?;
            validate_pipeline_documents(
                &pipeline,
                &fields,
                ctx.config.disable_embeddings_validation,
            )?;
        }

        // Cap the executed pipeline; the original one feeds the count.
        let doc_cap = ctx.config.max_documents_per_query;
        let mut capped_pipeline = pipeline.clone();
        if doc_cap > 0 {
            capped_pipeline.push(doc! { "$limit": doc_cap as i64 });
        }

        let byte_limit = effective_byte_limit(
            ctx.config.max_bytes_per_query,
            request.response_bytes_limit,
        );

        let execution = async {
            let stream = provider
                .aggregate(db, coll, capped_pipeline, None)
                .await?;
            collect_capped(stream, byte_limit, &ctx.cancellation).await
        };
        let (collected, total) =
            tokio::join!(execution, Self::count_total(provider.as_ref(), db, coll, &pipeline));
        let collected = collected?;

        let total_text = total
            .map(|n| n.to_string())
            .unwrap_or_else(|| "indeterminable".to_string());
        let mut blocks = vec![format!(
            "The aggregation resulted in {total_text} documents. Returning {} documents.",
            collected.docs.len()
        )];
        if doc_cap > 0 {
            blocks.push(format!(
                "At most {doc_cap} documents are returned per query (maxDocumentsPerQuery)."
            ));
        }
        if collected.truncated_by_bytes {
            blocks.push(
                "The result was truncated by the response byte limit; refine the pipeline or raise responseBytesLimit.".to_string(),
            );
        }
        if !collected.docs.is_empty() {
            blocks.push(wrap_untrusted(&documents_to_extjson(&collected.docs)));
        }

        let returned = collected.docs.len();
        Ok(ToolOutput::texts(blocks)
            .with_metadata("documents", serde_json::Value::from(returned)))
    }
}
