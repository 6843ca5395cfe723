//! MCP service wiring.

use std::sync::Arc;

use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::ErrorData as McpError;

use mongo_mcp_config::{Config, TelemetryMode};

use crate::atlas::{AtlasApi, AtlasClient};
use crate::dispatch::Dispatcher;
use crate::elicitation::PeerConfirmation;
use crate::registry::ToolRegistry;
use crate::session::{Connector, MongoConnector, Session};
use crate::telemetry::{LogTelemetrySink, NoopTelemetrySink, TelemetrySink};
use crate::tools;

#[derive(Clone)]
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
    config: Arc<Config>,
    connector: Arc<dyn Connector>,
    atlas: Option<Arc<dyn AtlasApi>>,
    session: Arc<Session>,
}

impl McpServer {
    pub fn new(config: Arc<Config>) -> Self {
        let mut registry = ToolRegistry::new();
        tools::register_defaults(&mut registry);

        let telemetry: Arc<dyn TelemetrySink> = match config.telemetry {
            TelemetryMode::Enabled => Arc::new(LogTelemetrySink::default()),
            TelemetryMode::Disabled => Arc::new(NoopTelemetrySink),
        };

        let atlas: Option<Arc<dyn AtlasApi>> =
            match (&config.api_client_id, &config.api_client_secret) {
                (Some(id), Some(secret)) => {
                    Some(Arc::new(AtlasClient::new(id.clone(), secret.clone())))
                }
                _ => None,
            };

        let connector: Arc<dyn Connector> = Arc::new(MongoConnector);
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), config.clone(), telemetry));
        let session = Arc::new(Session::new(config.clone(), connector.clone(), atlas.clone()));

        Self {
            dispatcher,
            config,
            connector,
            atlas,
            session,
        }
    }

    /// Test constructor with explicit collaborators.
    pub fn with_parts(dispatcher: Arc<Dispatcher>, session: Arc<Session>) -> Self {
        let config = dispatcher.config().clone();
        Self {
            dispatcher,
            config,
            connector: Arc::new(MongoConnector),
            atlas: None,
            session,
        }
    }

    /// A handler for a fresh transport connection: shared dispatcher and
    /// catalog, but its own session (connection state is per client).
    pub fn clone_for_connection(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            config: self.config.clone(),
            connector: self.connector.clone(),
            atlas: self.atlas.clone(),
            session: Arc::new(Session::new(
                self.config.clone(),
                self.connector.clone(),
                self.atlas.clone(),
            )),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Teardown on transport close: best-effort disconnect.
    pub async fn on_connection_closed(&self) {
        self.session.disconnect().await;
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(self.dispatcher.registry().instructions()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        // Feature-gated tools are invisible until their feature is on.
        let visible: Vec<&str> = self
            .dispatcher
            .registry()
            .iter()
            .filter(|tool| {
                tool.required_features()
                    .iter()
                    .all(|feature| self.config.feature_enabled(*feature))
            })
            .map(|tool| tool.name())
            .collect();
        let mut tools = self.dispatcher.registry().mcp_tools();
        tools.retain(|tool| visible.contains(&tool.name.as_ref()));
        Ok(ListToolsResult {
            tools,
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let confirmation = PeerConfirmation::new(context.peer.clone());
        Ok(self
            .dispatcher
            .dispatch(
                request.name.as_ref(),
                request.arguments.unwrap_or_default(),
                &self.session,
                &confirmation,
                context.ct.clone(),
            )
            .await)
    }
}
