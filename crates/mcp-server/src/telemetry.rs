//! Tool-call telemetry.
//!
//! One event is emitted per dispatched tool call, after the result is
//! formed and before it is returned to the transport. Upload is a separate
//! collaborator; the sinks here log and count.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use mongo_mcp_config::AuthType;

use crate::error::ErrorCode;
use crate::tool::{OperationType, ToolCategory};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolEventResult {
    Success,
    Failure,
}

impl ToolEventResult {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ToolEvent {
    pub tool: String,
    pub category: ToolCategory,
    pub operation_type: OperationType,
    pub result: ToolEventResult,
    pub error_code: Option<ErrorCode>,
    pub duration: Duration,
    /// Auth mechanism of the active connection, when one exists.
    pub auth_type: Option<AuthType>,
    /// Tool-provided extras (document counts, path lengths, ...).
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: ToolEvent);
}

/// Default sink: counts events and logs them at debug level.
#[derive(Default)]
pub struct LogTelemetrySink {
    emitted: AtomicU64,
}

impl LogTelemetrySink {
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl TelemetrySink for LogTelemetrySink {
    fn emit(&self, event: ToolEvent) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "tool event: name={} category={} op={} result={} code={} duration_ms={} auth={}",
            event.tool,
            event.category.as_str(),
            event.operation_type.as_str(),
            event.result.as_str(),
            event.error_code.map(|c| c.as_str()).unwrap_or("-"),
            event.duration.as_millis(),
            event.auth_type.map(|a| a.as_str()).unwrap_or("-"),
        );
    }
}

/// Sink used when telemetry is disabled.
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn emit(&self, _event: ToolEvent) {}
}
