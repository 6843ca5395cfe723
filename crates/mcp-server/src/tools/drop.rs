//! Destructive namespace tools. Both require elicited confirmation in the
//! default configuration.

use std::sync::Arc;

use async_trait::async_trait;
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
pub struct DropCollectionRequest {
    pub database: String,
    pub collection: String,
}

pub struct DropCollectionTool;

#[async_trait]
impl ServerTool for DropCollectionTool {
    fn name(&self) -> &'static str {
        "drop-collection"
    }

    fn description(&self) -> &'static str {
        "Drop a collection, removing all of its documents and indexes."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Delete
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<DropCollectionRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: DropCollectionRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;
        provider
            .drop_collection(&request.database, &request.collection)
            .await?;
        Ok(ToolOutput::text(format!(
            "Dropped collection {}.",
            namespace(&request.database, &request.collection)
        )))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DropDatabaseRequest {
    pub database: String,
}

pub struct DropDatabaseTool;

#[async_trait]
impl ServerTool for DropDatabaseTool {
    fn name(&self) -> &'static str {
        "drop-database"
    }

    fn description(&self) -> &'static str {
        "Drop a database, removing every collection in it."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Delete
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<DropDatabaseRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: DropDatabaseRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;
        provider.drop_database(&request.database).await?;
        Ok(ToolOutput::text(format!(
            "Dropped database {}.",
            request.database
        )))
    }
}
