//! Tool abstraction.
//!
//! Every capability the server exposes registers as a [`ServerTool`]: typed
//! metadata plus an `execute` entry point. The dispatcher owns gating,
//! error shaping and telemetry; tools only parse their arguments and do the
//! work.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use mongo_mcp_config::{Config, PreviewFeature};

use crate::error::ServerError;
use crate::session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolCategory {
    MongoDb,
    Atlas,
    AtlasLocal,
}

impl ToolCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MongoDb => "mongodb",
            Self::Atlas => "atlas",
            Self::AtlasLocal => "atlas-local",
        }
    }
}

/// Operation type alone governs read/write gating.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationType {
    Read,
    Create,
    Update,
    Delete,
    Metadata,
    Connect,
}

impl OperationType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Metadata => "metadata",
            Self::Connect => "connect",
        }
    }

    pub const fn is_write(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

/// Execution context handed to every tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    pub session: Arc<Session>,
    pub config: Arc<Config>,
    /// Fires on transport drop, client cancel or timeout. Tools must check
    /// it around every blocking operation.
    pub cancellation: CancellationToken,
}

/// What a tool returns: text blocks, an error flag and custom telemetry
/// metadata that the dispatcher attaches to the emitted event.
#[derive(Clone, Debug, Default)]
pub struct ToolOutput {
    pub content: Vec<String>,
    pub is_error: bool,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![text.into()],
            ..Self::default()
        }
    }

    pub fn texts(blocks: Vec<String>) -> Self {
        Self {
            content: blocks,
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

#[async_trait]
pub trait ServerTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn category(&self) -> ToolCategory;
    fn operation_type(&self) -> OperationType;

    /// Preview features that must be enabled for the tool to exist.
    fn required_features(&self) -> &'static [PreviewFeature] {
        &[]
    }

    /// JSON schema of the argument record.
    fn args_schema(&self) -> Arc<JsonObject>;

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError>;
}

/// Schema stand-in for BSON document arguments: schemars has no impl for
/// `bson::Document`, so argument records advertise a plain JSON object.
pub type JsonDocument = serde_json::Map<String, serde_json::Value>;

/// Generate the advertised argument schema for a request type.
pub fn schema_for<T: JsonSchema>() -> Arc<JsonObject> {
    let schema = schemars::schema_for!(T);
    match serde_json::to_value(&schema) {
        Ok(serde_json::Value::Object(map)) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

/// Parse a raw argument object against a tool's closed argument record.
/// Unknown top-level keys and type mismatches surface as `InvalidArguments`
/// naming the offending path; `execute` bodies call this before any work.
pub fn parse_args<T: DeserializeOwned>(args: JsonObject) -> Result<T, ServerError> {
    serde_json::from_value(serde_json::Value::Object(args))
        .map_err(|err| ServerError::invalid_arguments(format!("Invalid arguments: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    #[serde(deny_unknown_fields)]
    struct DemoArgs {
        database: String,
        #[serde(default)]
        limit: Option<u64>,
    }

    fn object(raw: &str) -> JsonObject {
        match serde_json::from_str(raw).expect("valid json") {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn unknown_top_level_arguments_are_rejected() {
        let err = parse_args::<DemoArgs>(object(r#"{"database":"db","bogus":1}"#)).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidArguments);
        assert!(err.message.contains("bogus"), "{}", err.message);
    }

    #[test]
    fn missing_required_argument_names_the_field() {
        let err = parse_args::<DemoArgs>(object(r#"{"limit":3}"#)).unwrap_err();
        assert!(err.message.contains("database"), "{}", err.message);
    }

    #[test]
    fn valid_arguments_parse_with_defaults() {
        let args = parse_args::<DemoArgs>(object(r#"{"database":"db"}"#)).expect("valid");
        assert_eq!(args.database, "db");
        assert_eq!(args.limit, None);
    }

    #[test]
    fn schema_generation_produces_an_object() {
        let schema = schema_for::<DemoArgs>();
        assert!(schema.contains_key("properties") || schema.contains_key("$schema"));
    }
}
