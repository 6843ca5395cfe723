//! The `delete-many` tool.

use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::ServerError;
use crate::tool::{
    parse_args, schema_for, OperationType, ServerTool, ToolCategory, ToolContext, ToolOutput,
};
use crate::tools::namespace;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteManyRequest {
    pub database: String,
    pub collection: String,
    /// Documents matching this filter are deleted. An empty filter deletes
    /// every document in the collection.
    #[serde(default)]
    #[schemars(with = "Option<crate::tool::JsonDocument>")]
    pub filter: Option<Document>,
}

pub struct DeleteManyTool;

#[async_trait]
impl ServerTool for DeleteManyTool {
    fn name(&self) -> &'static str {
        "delete-many"
    }

    fn description(&self) -> &'static str {
        "Delete every document matching a filter."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Delete
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<DeleteManyRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: DeleteManyRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;
        let deleted = provider
            .delete_many(
                &request.database,
                &request.collection,
                request.filter.unwrap_or_default(),
            )
            .await?;
        let ns = namespace(&request.database, &request.collection);
        Ok(ToolOutput::text(format!(
            "Deleted {deleted} document(s) from {ns}."
        ))
        .with_metadata("deleted", serde_json::Value::from(deleted)))
    }
}
