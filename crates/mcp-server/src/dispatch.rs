//! Tool dispatch pipeline.
//!
//! Every invocation runs the same ordered gauntlet: existence and feature
//! gates, the disabled set, the read-only policy, elicited confirmation,
//! then execution under the cancellation signal. Whatever happens inside a
//! tool is shaped into a `CallToolResult` here; errors never escape the
//! dispatcher, and exactly one telemetry event is emitted per call.

use std::sync::Arc;
use std::time::Instant;

use rmcp::model::{CallToolResult, Content, JsonObject};
use tokio_util::sync::CancellationToken;

use mongo_mcp_config::Config;

use crate::elicitation::Confirmation;
use crate::error::{ErrorCode, ServerError};
use crate::registry::ToolRegistry;
use crate::session::Session;
use crate::telemetry::{TelemetrySink, ToolEvent, ToolEventResult};
use crate::tool::{ServerTool, ToolContext, ToolOutput};

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    config: Arc<Config>,
    telemetry: Arc<dyn TelemetrySink>,
}

/// How a gated invocation ended. A decline is a non-error answer to the
/// client but still carries its own stable code into telemetry.
enum GateOutcome {
    Ran(ToolOutput),
    Declined(ToolOutput),
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        config: Arc<Config>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            registry,
            config,
            telemetry,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Run one tool call end to end.
    pub async fn dispatch(
        &self,
        name: &str,
        args: JsonObject,
        session: &Arc<Session>,
        confirmation: &dyn Confirmation,
        cancellation: CancellationToken,
    ) -> CallToolResult {
        let started = Instant::now();

        let Some(tool) = self.registry.get(name) else {
            let err = ServerError::new(ErrorCode::ToolNotFound, format!("Unknown tool '{name}'"));
            // No registered metadata to report against; skip telemetry.
            return error_result(name, &err);
        };

        let outcome = self
            .run_gated(&tool, name, args, session, confirmation, cancellation)
            .await;

        let (result, event_result, error_code, metadata) = match outcome {
            Ok(GateOutcome::Ran(output)) => {
                let result = output_result(&output);
                let event_result = if output.is_error {
                    ToolEventResult::Failure
                } else {
                    ToolEventResult::Success
                };
                (result, event_result, None, output.metadata)
            }
            Ok(GateOutcome::Declined(output)) => (
                output_result(&output),
                ToolEventResult::Success,
                Some(ErrorCode::ConfirmationDeclined),
                output.metadata,
            ),
            Err(err) => (
                error_result(name, &err),
                ToolEventResult::Failure,
                Some(err.code),
                serde_json::Map::new(),
            ),
        };

        self.telemetry.emit(ToolEvent {
            tool: name.to_string(),
            category: tool.category(),
            operation_type: tool.operation_type(),
            result: event_result,
            error_code,
            duration: started.elapsed(),
            auth_type: session.auth_type().await,
            metadata,
        });

        result
    }

    async fn run_gated(
        &self,
        tool: &Arc<dyn ServerTool>,
        name: &str,
        args: JsonObject,
        session: &Arc<Session>,
        confirmation: &dyn Confirmation,
        cancellation: CancellationToken,
    ) -> Result<GateOutcome, ServerError> {
        for feature in tool.required_features() {
            if !self.config.feature_enabled(*feature) {
                return Err(ServerError::new(
                    ErrorCode::FeatureDisabled,
                    format!("Tool '{name}' requires a preview feature that is not enabled"),
                ));
            }
        }

        let disabled = &self.config.disabled_tools;
        if disabled.iter().any(|entry| {
            entry == name
                || entry == tool.category().as_str()
                || entry == tool.operation_type().as_str()
        }) {
            return Err(ServerError::new(
                ErrorCode::ToolDisabled,
                format!("Tool '{name}' is disabled by configuration"),
            ));
        }

        if self.config.read_only && tool.operation_type().is_write() {
            return Err(ServerError::forbidden_write(format!(
                "Tool '{name}' performs a {} operation, but the server is read-only",
                tool.operation_type().as_str()
            )));
        }

        if self
            .config
            .confirmation_required_tools
            .iter()
            .any(|entry| entry == name)
        {
            let message = format!(
                "The model wants to run '{name}', which may be irreversible. Allow it?"
            );
            if !confirmation.confirm(name, &message).await? {
                // A decline is an answered question, not a failure.
                return Ok(GateOutcome::Declined(
                    ToolOutput::text(format!(
                        "The user did not confirm running '{name}'. The operation was not performed."
                    ))
                    .with_metadata("confirmed", serde_json::Value::Bool(false)),
                ));
            }
        }

        let ctx = ToolContext {
            session: session.clone(),
            config: self.config.clone(),
            cancellation: cancellation.clone(),
        };

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(ServerError::cancelled()),
            output = tool.execute(args, &ctx) => output.map(GateOutcome::Ran),
        }
    }
}

fn output_result(output: &ToolOutput) -> CallToolResult {
    let content: Vec<Content> = output
        .content
        .iter()
        .map(|text| Content::text(text.clone()))
        .collect();
    if output.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

fn error_result(name: &str, err: &ServerError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!(
        "Error running {name}: {} [{}]",
        err.message,
        err.code.as_str()
    ))])
}
