//! Connection lifecycle tools.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::ServerError;
use crate::tool::{
    parse_args, schema_for, OperationType, ServerTool, ToolCategory, ToolContext, ToolOutput,
};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConnectRequest {
    /// MongoDB connection string. Falls back to the configured one.
    #[serde(default)]
    pub connection_string: Option<String>,
}

pub struct ConnectTool;

#[async_trait]
impl ServerTool for ConnectTool {
    fn name(&self) -> &'static str {
        "connect"
    }

    fn description(&self) -> &'static str {
        "Connect to a MongoDB deployment. Uses the configured connection string when none is given."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Connect
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<ConnectRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: ConnectRequest = parse_args(args)?;
        let uri = request
            .connection_string
            .or_else(|| ctx.config.connection_string.clone())
            .ok_or_else(ServerError::not_connected)?;

        let auth_type = ctx.session.connect_with(&uri).await?;
        Ok(
            ToolOutput::text("Successfully connected to MongoDB.").with_metadata(
                "authType",
                serde_json::Value::String(auth_type.as_str().to_string()),
            ),
        )
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DisconnectRequest {}

pub struct DisconnectTool;

#[async_trait]
impl ServerTool for DisconnectTool {
    fn name(&self) -> &'static str {
        "disconnect"
    }

    fn description(&self) -> &'static str {
        "Close the current MongoDB connection."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Connect
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<DisconnectRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let _request: DisconnectRequest = parse_args(args)?;
        ctx.session.disconnect().await;
        Ok(ToolOutput::text("Disconnected from MongoDB."))
    }
}
