//! Index management tools.

use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::content::{documents_to_extjson, wrap_untrusted};
use crate::error::ServerError;
use crate::tool::{
    parse_args, schema_for, OperationType, ServerTool, ToolCategory, ToolContext, ToolOutput,
};
use crate::tools::namespace;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectionIndexesRequest {
    pub database: String,
    pub collection: String,
}

pub struct CollectionIndexesTool;

#[async_trait]
impl ServerTool for CollectionIndexesTool {
    fn name(&self) -> &'static str {
        "collection-indexes"
    }

    fn description(&self) -> &'static str {
        "List the indexes of a collection."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Read
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<CollectionIndexesRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: CollectionIndexesRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;
        let indexes = provider
            .list_indexes(&request.database, &request.collection)
            .await?;
        let ns = namespace(&request.database, &request.collection);
        let mut blocks = vec![format!("Found {} index(es) on {ns}.", indexes.len())];
        if !indexes.is_empty() {
            blocks.push(wrap_untrusted(&documents_to_extjson(&indexes)));
        }
        Ok(ToolOutput::texts(blocks))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateIndexRequest {
    pub database: String,
    pub collection: String,
    /// Index key specification, e.g. `{ "title": 1 }`.
    #[schemars(with = "crate::tool::JsonDocument")]
    pub keys: Document,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unique: bool,
}

pub struct CreateIndexTool;

#[async_trait]
impl ServerTool for CreateIndexTool {
    fn name(&self) -> &'static str {
        "create-index"
    }

    fn description(&self) -> &'static str {
        "Create an index on a collection."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Create
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<CreateIndexRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: CreateIndexRequest = parse_args(args)?;
        if request.keys.is_empty() {
            return Err(ServerError::invalid_arguments(
                "keys must name at least one field",
            ));
        }
        let provider = ctx.session.ensure_connected().await?;
        let name = provider
            .create_index(
                &request.database,
                &request.collection,
                request.keys,
                request.name,
                request.unique,
            )
            .await?;
        Ok(ToolOutput::text(format!(
            "Created index '{name}' on {}.",
            namespace(&request.database, &request.collection)
        )))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DropIndexRequest {
    pub database: String,
    pub collection: String,
    pub name: String,
}

pub struct DropIndexTool;

#[async_trait]
impl ServerTool for DropIndexTool {
    fn name(&self) -> &'static str {
        "drop-index"
    }

    fn description(&self) -> &'static str {
        "Drop an index from a collection."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Delete
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<DropIndexRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: DropIndexRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;
        provider
            .drop_index(&request.database, &request.collection, &request.name)
            .await?;
        Ok(ToolOutput::text(format!(
            "Dropped index '{}' from {}.",
            request.name,
            namespace(&request.database, &request.collection)
        )))
    }
}
