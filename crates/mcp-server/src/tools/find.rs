//! The `find` tool.

use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::content::{documents_to_extjson, wrap_untrusted};
use crate::error::{ErrorCode, ServerError};
use crate::provider::FindQuery;
use crate::tool::{
    parse_args, schema_for, OperationType, ServerTool, ToolCategory, ToolContext, ToolOutput,
};
use crate::tools::{collect_capped, effective_byte_limit, namespace, plan_is_collection_scan};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FindRequest {
    pub database: String,
    pub collection: String,
    /// Query filter as extended JSON.
    #[serde(default)]
    #[schemars(with = "Option<crate::tool::JsonDocument>")]
    pub filter: Option<Document>,
    #[serde(default)]
    #[schemars(with = "Option<crate::tool::JsonDocument>")]
    pub projection: Option<Document>,
    #[serde(default)]
    #[schemars(with = "Option<crate::tool::JsonDocument>")]
    pub sort: Option<Document>,
    /// Maximum documents to return; the server cap still applies.
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub skip: Option<u64>,
    /// Per-call response size cap in bytes.
    #[serde(default)]
    pub response_bytes_limit: Option<u64>,
}

pub struct FindTool;

#[async_trait]
impl ServerTool for FindTool {
    fn name(&self) -> &'static str {
        "find"
    }

    fn description(&self) -> &'static str {
        "Query documents from a collection with filter, projection, sort, limit and skip."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Read
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<FindRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: FindRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;

        if ctx.config.index_check {
            let explain = provider
                .run_command(
                    &request.database,
                    bson::doc! {
                        "explain": {
                            "find": &request.collection,
                            "filter": request.filter.clone().unwrap_or_default(),
                        },
                        "verbosity": "queryPlanner",
                    },
                )
                .await?;
            if plan_is_collection_scan(&explain) {
                return Err(ServerError::new(
                    ErrorCode::ForbiddenReadOperation,
                    format!(
                        "The query plan for {} is a full collection scan and indexCheck is enabled; add an index or narrow the filter",
                        namespace(&request.database, &request.collection)
                    ),
                ));
            }
        }

        let server_doc_cap = ctx.config.max_documents_per_query;
        let limit = match (request.limit, server_doc_cap) {
            (Some(requested), cap) if cap > 0 => Some(requested.min(cap) as i64),
            (Some(requested), _) => Some(requested as i64),
            (None, cap) if cap > 0 => Some(cap as i64),
            (None, _) => None,
        };

        let stream = provider
            .find(
                &request.database,
                &request.collection,
                FindQuery {
                    filter: request.filter.unwrap_or_default(),
                    projection: request.projection,
                    sort: request.sort,
                    limit,
                    skip: request.skip,
                },
            )
            .await?;

        let byte_limit = effective_byte_limit(
            ctx.config.max_bytes_per_query,
            request.response_bytes_limit,
        );
        let collected = collect_capped(stream, byte_limit, &ctx.cancellation).await?;

        let ns = namespace(&request.database, &request.collection);
        let mut blocks = vec![format!(
            "Found {} document(s) in {ns}.",
            collected.docs.len()
        )];
        if collected.truncated_by_bytes {
            blocks.push(
                "The result was truncated by the response byte limit; refine the query or raise responseBytesLimit.".to_string(),
            );
        }
        if let Some(cap) = limit {
            if server_doc_cap > 0 && cap == server_doc_cap as i64 {
                blocks.push(format!(
                    "At most {server_doc_cap} documents are returned per query (maxDocumentsPerQuery)."
                ));
            }
        }
        if !collected.docs.is_empty() {
            blocks.push(wrap_untrusted(&documents_to_extjson(&collected.docs)));
        }

        let count = collected.docs.len();
        Ok(ToolOutput::texts(blocks)
            .with_metadata("documents", serde_json::Value::from(count)))
    }
}
