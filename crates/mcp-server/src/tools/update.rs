//! The `update-many` tool.

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
pub struct UpdateManyRequest {
    pub database: String,
    pub collection: String,
    /// Documents matching this filter are updated. An empty filter updates
    /// every document in the collection.
    #[serde(default)]
    #[schemars(with = "Option<crate::tool::JsonDocument>")]
    pub filter: Option<Document>,
    /// Update document using update operators ($set, $unset, ...).
    #[schemars(with = "crate::tool::JsonDocument")]
    pub update: Document,
}

pub struct UpdateManyTool;

#[async_trait]
impl ServerTool for UpdateManyTool {
    fn name(&self) -> &'static str {
        "update-many"
    }

    fn description(&self) -> &'static str {
        "Update every document matching a filter."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Update
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<UpdateManyRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: UpdateManyRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;
        let (matched, modified) = provider
            .update_many(
                &request.database,
                &request.collection,
                request.filter.unwrap_or_default(),
                request.update,
            )
            .await?;
        let ns = namespace(&request.database, &request.collection);
        Ok(ToolOutput::text(format!(
            "Matched {matched} document(s) and modified {modified} document(s) in {ns}."
        ))
        .with_metadata("matched", serde_json::Value::from(matched))
        .with_metadata("modified", serde_json::Value::from(modified)))
    }
}
