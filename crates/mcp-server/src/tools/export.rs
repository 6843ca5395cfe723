//! The `export` tool: a full query result as Extended JSON.

use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::content::{document_to_canonical_extjson, document_to_extjson, wrap_untrusted};
use crate::error::ServerError;
use crate::provider::FindQuery;
use crate::tool::{
    parse_args, schema_for, OperationType, ServerTool, ToolCategory, ToolContext, ToolOutput,
};
use crate::tools::{collect_capped, effective_byte_limit, namespace};

#[derive(Clone, Copy, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Relaxed,
    Canonical,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExportRequest {
    pub database: String,
    pub collection: String,
    #[serde(default)]
    #[schemars(with = "Option<crate::tool::JsonDocument>")]
    pub filter: Option<Document>,
    #[serde(default)]
    #[schemars(with = "Option<crate::tool::JsonDocument>")]
    pub sort: Option<Document>,
    #[serde(default)]
    pub limit: Option<u64>,
    /// Extended JSON flavor of the exported documents.
    #[serde(default)]
    pub json_export_format: ExportFormat,
}

pub struct ExportTool;

#[async_trait]
impl ServerTool for ExportTool {
    fn name(&self) -> &'static str {
        "export"
    }

    fn description(&self) -> &'static str {
        "Export the documents matching a query as relaxed or canonical Extended JSON."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Read
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<ExportRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: ExportRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;

        let stream = provider
            .find(
                &request.database,
                &request.collection,
                FindQuery {
                    filter: request.filter.unwrap_or_default(),
                    sort: request.sort,
                    limit: request.limit.map(|n| n as i64),
                    ..FindQuery::default()
                },
            )
            .await?;

        // Exports are not subject to the per-query document cap, only the
        // byte ceiling.
        let byte_limit = effective_byte_limit(ctx.config.max_bytes_per_query, None);
        let collected = collect_capped(stream, byte_limit, &ctx.cancellation).await?;

        let values: Vec<serde_json::Value> = collected
            .docs
            .iter()
            .map(|doc| match request.json_export_format {
                ExportFormat::Relaxed => document_to_extjson(doc),
                ExportFormat::Canonical => document_to_canonical_extjson(doc),
            })
            .collect();
        let payload = serde_json::to_string_pretty(&values).unwrap_or_else(|_| "[]".to_string());

        let ns = namespace(&request.database, &request.collection);
        let mut blocks = vec![format!(
            "Exported {} document(s) from {ns}.",
            collected.docs.len()
        )];
        if collected.truncated_by_bytes {
            blocks.push(
                "The export hit the response byte limit; narrow the filter to export the rest."
                    .to_string(),
            );
        }
        blocks.push(wrap_untrusted(&payload));
        Ok(ToolOutput::texts(blocks))
    }
}
