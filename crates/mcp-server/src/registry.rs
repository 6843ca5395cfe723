//! Tool registry and catalog.

use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::model::Tool;

use crate::tool::ServerTool;

/// Registered tools, keyed by unique name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn ServerTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Panics on duplicate names: the catalog is assembled
    /// once at startup and duplicate registration is a programming error.
    pub fn register(&mut self, tool: Arc<dyn ServerTool>) {
        let name = tool.name();
        assert!(
            self.tools.insert(name, tool).is_none(),
            "duplicate tool name '{name}'"
        );
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ServerTool>> {
        self.tools.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ServerTool>> {
        self.tools.values()
    }

    /// The MCP tool listing.
    pub fn mcp_tools(&self) -> Vec<Tool> {
        self.tools
            .values()
            .map(|tool| Tool {
                name: tool.name().into(),
                title: None,
                description: Some(tool.description().into()),
                input_schema: tool.args_schema(),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
            })
            .collect()
    }

    /// Tool inventory as JSON, for `--print-tools`.
    pub fn inventory_json(&self, version: &str) -> serde_json::Value {
        let tools: Vec<serde_json::Value> = self
            .tools
            .values()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "category": tool.category().as_str(),
                    "operationType": tool.operation_type().as_str(),
                    "description": tool.description(),
                })
            })
            .collect();
        serde_json::json!({
            "binary": "mongodb-mcp",
            "version": version,
            "count": tools.len(),
            "tools": tools,
        })
    }

    /// Server instructions surfaced in the MCP handshake.
    pub fn instructions(&self) -> String {
        let mut lines = vec![
            "MongoDB MCP server: run database, Atlas and map-routing operations.".to_string(),
            "Use 'connect' first when no connection string is configured.".to_string(),
            "Tools:".to_string(),
        ];
        for tool in self.tools.values() {
            lines.push(format!("- {}: {}", tool.name(), tool.description()));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use crate::tool::{schema_for, OperationType, ToolCategory, ToolContext, ToolOutput};
    use async_trait::async_trait;
    use rmcp::model::JsonObject;

    struct Dummy(&'static str);

    #[async_trait]
    impl ServerTool for Dummy {
        fn name(&self) -> &'static str {
            self.0
        }
        fn description(&self) -> &'static str {
            "dummy"
        }
        fn category(&self) -> ToolCategory {
            ToolCategory::MongoDb
        }
        fn operation_type(&self) -> OperationType {
            OperationType::Read
        }
        fn args_schema(&self) -> Arc<JsonObject> {
            schema_for::<serde_json::Map<String, serde_json::Value>>()
        }
        async fn execute(
            &self,
            _args: JsonObject,
            _ctx: &ToolContext,
        ) -> Result<ToolOutput, ServerError> {
            Ok(ToolOutput::text("ok"))
        }
    }

    #[test]
    fn registry_round_trips_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Dummy("a")));
        registry.register(Arc::new(Dummy("b")));
        assert_eq!(registry.len(), 2);
        assert!(registry.get("a").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.mcp_tools().len(), 2);
    }

    #[test]
    #[should_panic(expected = "duplicate tool name")]
    fn duplicate_names_panic() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Dummy("a")));
        registry.register(Arc::new(Dummy("a")));
    }
}
