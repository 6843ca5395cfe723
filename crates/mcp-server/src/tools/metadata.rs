//! Catalog introspection tools.

use std::sync::Arc;
use std::time::Duration;

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

const COUNT_MAX_TIME: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListDatabasesRequest {}

pub struct ListDatabasesTool;

#[async_trait]
impl ServerTool for ListDatabasesTool {
    fn name(&self) -> &'static str {
        "list-databases"
    }

    fn description(&self) -> &'static str {
        "List the databases of the connected deployment."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Metadata
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<ListDatabasesRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let _request: ListDatabasesRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;
        let names = provider.list_databases().await?;
        let mut blocks = vec![format!("Found {} database(s).", names.len())];
        if !names.is_empty() {
            blocks.push(crate::content::wrap_untrusted(
                &serde_json::to_string_pretty(&names).unwrap_or_default(),
            ));
        }
        Ok(ToolOutput::texts(blocks))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListCollectionsRequest {
    pub database: String,
}

pub struct ListCollectionsTool;

#[async_trait]
impl ServerTool for ListCollectionsTool {
    fn name(&self) -> &'static str {
        "list-collections"
    }

    fn description(&self) -> &'static str {
        "List the collections of a database."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Metadata
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<ListCollectionsRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: ListCollectionsRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;
        let names = provider.list_collections(&request.database).await?;
        let mut blocks = vec![format!(
            "Found {} collection(s) in database '{}'.",
            names.len(),
            request.database
        )];
        if !names.is_empty() {
            blocks.push(crate::content::wrap_untrusted(
                &serde_json::to_string_pretty(&names).unwrap_or_default(),
            ));
        }
        Ok(ToolOutput::texts(blocks))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CountRequest {
    pub database: String,
    pub collection: String,
    #[serde(default)]
    #[schemars(with = "Option<crate::tool::JsonDocument>")]
    pub filter: Option<Document>,
}

pub struct CountTool;

#[async_trait]
impl ServerTool for CountTool {
    fn name(&self) -> &'static str {
        "count"
    }

    fn description(&self) -> &'static str {
        "Count the documents in a collection matching a filter."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Read
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<CountRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: CountRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;
        let count = provider
            .count(
                &request.database,
                &request.collection,
                request.filter.unwrap_or_default(),
                Some(COUNT_MAX_TIME),
            )
            .await?;
        Ok(ToolOutput::text(format!(
            "Found {count} document(s) in {}.",
            namespace(&request.database, &request.collection)
        ))
        .with_metadata("count", serde_json::Value::from(count)))
    }
}
