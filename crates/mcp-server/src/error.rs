//! Server error taxonomy.
//!
//! Every failure a tool can produce carries one of these stable codes; the
//! code reaches telemetry and the human-readable message reaches the model
//! client inside an `isError` tool result. Errors never cross the
//! dispatcher boundary as protocol errors.

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    ToolNotFound,
    ToolDisabled,
    FeatureDisabled,
    InvalidArguments,
    ConfirmationDeclined,
    NotConnected,
    ConnectionFailed,
    ForbiddenWriteOperation,
    ForbiddenReadOperation,
    AtlasSearchNotSupported,
    AtlasVectorSearchIndexNotFound,
    AtlasVectorSearchInvalidQuery,
    EmbeddingServiceError,
    EmbeddingDimensionMismatch,
    Cancelled,
    Unexpected,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToolNotFound => "ToolNotFound",
            Self::ToolDisabled => "ToolDisabled",
            Self::FeatureDisabled => "FeatureDisabled",
            Self::InvalidArguments => "InvalidArguments",
            Self::ConfirmationDeclined => "ConfirmationDeclined",
            Self::NotConnected => "NotConnected",
            Self::ConnectionFailed => "ConnectionFailed",
            Self::ForbiddenWriteOperation => "ForbiddenWriteOperation",
            Self::ForbiddenReadOperation => "ForbiddenReadOperation",
            Self::AtlasSearchNotSupported => "AtlasSearchNotSupported",
            Self::AtlasVectorSearchIndexNotFound => "AtlasVectorSearchIndexNotFound",
            Self::AtlasVectorSearchInvalidQuery => "AtlasVectorSearchInvalidQuery",
            Self::EmbeddingServiceError => "EmbeddingServiceError",
            Self::EmbeddingDimensionMismatch => "EmbeddingDimensionMismatch",
            Self::Cancelled => "Cancelled",
            Self::Unexpected => "Unexpected",
        }
    }
}

#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ServerError {
    pub code: ErrorCode,
    pub message: String,
}

impl ServerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArguments, message)
    }

    pub fn not_connected() -> Self {
        Self::new(
            ErrorCode::NotConnected,
            "Not connected to MongoDB. No connection string is configured; call the 'connect' tool first.",
        )
    }

    pub fn forbidden_write(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ForbiddenWriteOperation, message)
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unexpected, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "The tool call was cancelled")
    }
}

impl From<mongodb::error::Error> for ServerError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::unexpected(err.to_string())
    }
}

impl From<mongo_mcp_embeddings::EmbeddingError> for ServerError {
    fn from(err: mongo_mcp_embeddings::EmbeddingError) -> Self {
        use mongo_mcp_embeddings::EmbeddingError;
        match err {
            EmbeddingError::DimensionMismatch(message) => {
                Self::new(ErrorCode::EmbeddingDimensionMismatch, message)
            }
            other => Self::new(ErrorCode::EmbeddingServiceError, other.to_string()),
        }
    }
}

impl From<mongo_mcp_routing::RoutingError> for ServerError {
    fn from(err: mongo_mcp_routing::RoutingError) -> Self {
        use mongo_mcp_routing::RoutingError;
        match &err {
            RoutingError::JunctionNotFound(_)
            | RoutingError::RoadNotFound(_)
            | RoutingError::GateNotFound { .. } => Self::invalid_arguments(err.to_string()),
            _ => Self::unexpected(err.to_string()),
        }
    }
}
