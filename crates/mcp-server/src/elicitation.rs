//! User confirmation through MCP elicitation.
//!
//! Destructive tools listed in `confirmationRequiredTools` are gated on an
//! explicit yes from the end user, asked through the client. When the
//! client cannot elicit, the gate fails closed.

use async_trait::async_trait;
use rmcp::model::{CreateElicitationRequestParam, ElicitationAction};
use rmcp::service::{Peer, RoleServer};

use crate::error::ServerError;

#[async_trait]
pub trait Confirmation: Send + Sync {
    /// Ask the user to confirm running `tool_name`. `Ok(false)` means the
    /// user declined or the question could not be asked.
    async fn confirm(&self, tool_name: &str, message: &str) -> Result<bool, ServerError>;
}

/// Elicits a boolean confirmation from the connected client.
pub struct PeerConfirmation {
    peer: Peer<RoleServer>,
}

impl PeerConfirmation {
    pub fn new(peer: Peer<RoleServer>) -> Self {
        Self { peer }
    }
}

#[async_trait]
impl Confirmation for PeerConfirmation {
    async fn confirm(&self, tool_name: &str, message: &str) -> Result<bool, ServerError> {
        let param: CreateElicitationRequestParam = serde_json::from_value(serde_json::json!({
            "message": message,
            "requestedSchema": {
                "type": "object",
                "properties": {
                    "confirm": {
                        "type": "boolean",
                        "description": format!("Set to true to run '{tool_name}'"),
                    }
                },
                "required": ["confirm"]
            }
        }))
        .map_err(|err| ServerError::unexpected(format!("elicitation request: {err}")))?;

        let result = match self.peer.create_elicitation(param).await {
            Ok(result) => result,
            Err(err) => {
                // Clients without elicitation support answer with an error;
                // treat that as "not confirmed" rather than failing the call.
                log::debug!("elicitation unavailable for '{tool_name}': {err}");
                return Ok(false);
            }
        };

        if !matches!(result.action, ElicitationAction::Accept) {
            return Ok(false);
        }
        let confirmed = result
            .content
            .as_ref()
            .and_then(|content| content.get("confirm"))
            .and_then(|value| value.as_bool())
            .unwrap_or(true);
        Ok(confirmed)
    }
}

/// Fixed-answer gate for tests and headless runs.
pub struct StaticConfirmation(pub bool);

#[async_trait]
impl Confirmation for StaticConfirmation {
    async fn confirm(&self, _tool_name: &str, _message: &str) -> Result<bool, ServerError> {
        Ok(self.0)
    }
}
